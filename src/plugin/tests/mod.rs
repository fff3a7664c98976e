//! Plugin System Tests
//!
//! Registry, discovery and loader tests with mock implementations.

//! Plugin System Module
//!
//! Capability-based tool integrations. Each [`ToolPlugin`] describes how to
//! discover, configure and invoke one external tool; the [`PluginRegistry`]
//! catalogs them, the [`PluginManager`] finds installed binaries and the
//! [`PluginLoader`] adds or reloads descriptor-defined capabilities at run time.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::collections::HashMap;
//! use gamewrap::plugin::{builtin, build_plugin_config, PluginRegistry};
//!
//! let mut registry = PluginRegistry::new();
//! for plugin in builtin::all_builtin_plugins() {
//!     registry.register(plugin);
//! }
//!
//! let mapper = registry.resolve("antimicrox").unwrap();
//! let attributes: HashMap<String, String> = HashMap::new();
//! let config = build_plugin_config(mapper.as_ref(), &attributes, None).unwrap();
//! assert!(mapper.build_launch_command(&config).is_none());
//! ```

pub mod traits;
pub mod error;
pub mod command;
pub mod config;
pub mod registry;
pub mod manager;
pub mod descriptor;
pub mod template;
pub mod loader;
pub mod builtin;

#[cfg(test)]
pub mod tests;

// Re-export core types for easier access
pub use traits::{ConfigField, FieldType, FieldValue, PluginCategory, PluginConfig, ToolPlugin};
pub use error::{PluginError, PluginResult};
pub use command::CommandLine;
pub use config::{build_plugin_config, resolve_tool_path, AttributeSource};

// Registry and management
pub use registry::PluginRegistry;
pub use manager::PluginManager;
pub use descriptor::{PluginDescriptor, DESCRIPTOR_API_VERSION};
pub use loader::{LoadReport, PluginLoader};

//! Process Module
//!
//! Spawning commands, inspecting the OS process table and tearing down
//! process trees with graceful-then-forced escalation.

pub mod error;
pub mod table;
pub mod runner;
pub mod lifecycle;

#[cfg(test)]
pub mod tests;

pub use error::{ProcessError, ProcessResult};
pub use table::{ProcessInfo, ProcessTable, SystemProcessTable};
pub use runner::{CommandRunner, ProcessHandle, SystemCommandRunner};
pub use lifecycle::{ProcessLifecycleManager, TerminationReport, TrackedProcess};

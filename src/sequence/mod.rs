//! Sequence Module
//!
//! The launch/exit orchestration engine: action tables, the step-by-step
//! executor, OS toggles and startup configuration checks.
//!
//! A host drives one run as:
//!
//! ```no_run
//! use std::sync::Arc;
//! use gamewrap::config::ConfigManager;
//! use gamewrap::process::{SystemCommandRunner, SystemProcessTable};
//! use gamewrap::sequence::{LauncherContext, SequenceExecutor};
//! use gamewrap::status::ConsoleStatus;
//!
//! # fn main() -> anyhow::Result<()> {
//! let context = LauncherContext::new(ConfigManager::load(None)?);
//! let mut executor = SequenceExecutor::new(
//!     &context,
//!     Arc::new(ConsoleStatus::new()),
//!     Box::new(SystemCommandRunner::new()),
//!     Arc::new(SystemProcessTable::new()),
//! )?;
//! executor.execute("launch_sequence");
//! let _ = executor.run_game();
//! executor.execute("exit_sequence");
//! executor.ensure_cleanup();
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod context;
pub mod error;
pub mod executor;
pub mod preflight;
pub mod system;

#[cfg(test)]
mod tests;

pub use actions::{Action, ActionTable, Direction, SystemAction};
pub use context::LauncherContext;
pub use error::{StepError, StepResult};
pub use executor::{SequenceExecutor, SequenceReport, StepRecord, StepStatus};
pub use preflight::ConfigWarning;
pub use system::{DiscMount, TaskbarControl};

//! Step Error Types
//!
//! Everything a single sequence step can fail with. These never leave the
//! sequence loop: the executor reports them on the status stream and moves
//! on to the next step.

use std::any::Any;
use thiserror::Error;
use crate::plugin::error::PluginError;
use crate::process::error::ProcessError;

/// Result type for one step
pub type StepResult<T> = Result<T, StepError>;

#[derive(Error, Debug, Clone)]
pub enum StepError {
    /// Capability lookup or configuration failed
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Launching or terminating a process failed
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A generic step attribute could not be parsed
    #[error("Invalid value for {key}: '{value}'")]
    InvalidAttribute { key: String, value: String },

    /// A built-in system action failed
    #[error("{action} failed: {message}")]
    System { action: String, message: String },

    /// A capability panicked while building its command
    #[error("step '{step}' panicked: {message}")]
    Panicked { step: String, message: String },
}

impl StepError {
    pub fn invalid_attribute<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self::InvalidAttribute { key: key.into(), value: value.into() }
    }

    pub fn system<A: Into<String>, M: Into<String>>(action: A, message: M) -> Self {
        Self::System { action: action.into(), message: message.into() }
    }

    /// Build from a `catch_unwind` payload
    pub fn panicked(step: &str, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            text.to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked { step: step.to_string(), message }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    /// Errors caused by the configuration rather than the environment
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::Plugin(e) => e.is_configuration_error(),
            Self::InvalidAttribute { .. } => true,
            _ => false,
        }
    }
}

//! Process Error Types

use std::io;
use thiserror::Error;

/// Result type for process operations
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors raised while spawning, inspecting or signalling processes
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    /// The process exited before it could be signalled
    #[error("No such process: {pid}")]
    NoSuchProcess { pid: u32 },

    /// The caller may not signal the process
    #[error("Access denied to process {pid}")]
    AccessDenied { pid: u32 },

    /// Spawning a command failed
    #[error("Failed to launch {program}: {message} ({hint})")]
    LaunchFailed { program: String, message: String, hint: String },

    /// A waited command exited unsuccessfully
    #[error("{program} exited with {status}{}", stderr_suffix(.stderr))]
    NonZeroExit { program: String, status: String, stderr: String },

    /// Sending a signal failed for another reason
    #[error("Failed to signal process {pid}: {message}")]
    SignalFailed { pid: u32, message: String },

    /// Process table could not be read
    #[error("Process table error: {message}")]
    Io { message: String },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl ProcessError {
    /// Create a launch error from the spawn failure, with a remediation hint
    pub fn launch_failed<S: Into<String>>(program: S, err: &io::Error) -> Self {
        let hint = match err.kind() {
            io::ErrorKind::NotFound => "check the path",
            io::ErrorKind::PermissionDenied => "try running with elevated permissions",
            _ => "check the command and its arguments",
        };
        Self::LaunchFailed {
            program: program.into(),
            message: err.to_string(),
            hint: hint.to_string(),
        }
    }

    pub fn non_zero_exit<P: Into<String>, S: Into<String>>(program: P, status: S, stderr: &[u8]) -> Self {
        Self::NonZeroExit {
            program: program.into(),
            status: status.into(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// Map an OS error from signalling `pid`
    pub fn from_signal_error(pid: u32, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NoSuchProcess { pid },
            io::ErrorKind::PermissionDenied => Self::AccessDenied { pid },
            _ => Self::SignalFailed { pid, message: err.to_string() },
        }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    /// The process was already gone; not a real failure during cleanup
    pub fn is_already_gone(&self) -> bool {
        matches!(self, ProcessError::NoSuchProcess { .. })
    }

    pub fn is_permission_error(&self) -> bool {
        matches!(self, ProcessError::AccessDenied { .. })
    }
}

impl From<io::Error> for ProcessError {
    fn from(err: io::Error) -> Self {
        ProcessError::Io { message: err.to_string() }
    }
}

//! Command spawning

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use log::{debug, warn};
use crate::plugin::command::CommandLine;
use super::error::{ProcessError, ProcessResult};

/// A spawned, non-waited process
#[derive(Debug)]
pub struct ProcessHandle {
    pub pid: u32,
    /// Displayable command line that started the process
    pub command: String,
    /// Present when this process spawned the child and must reap it
    pub child: Option<Child>,
}

impl ProcessHandle {
    /// Handle for a process this launcher did not spawn itself
    pub fn detached(pid: u32, command: impl Into<String>) -> Self {
        Self { pid, command: command.into(), child: None }
    }

    /// Collect the exit status if the child already finished
    pub fn try_reap(&mut self) -> bool {
        match self.child.as_mut().map(|child| child.try_wait()) {
            Some(Ok(Some(status))) => {
                debug!("Reaped {} ({})", self.pid, status);
                self.child = None;
                true
            }
            Some(Ok(None)) => false,
            Some(Err(e)) => {
                debug!("Failed to poll {}: {}", self.pid, e);
                false
            }
            None => true,
        }
    }

    /// Block until the process exits. Detached handles return `None` at once.
    pub fn wait(&mut self) -> ProcessResult<Option<ExitStatus>> {
        match self.child.take() {
            Some(mut child) => Ok(Some(child.wait()?)),
            None => Ok(None),
        }
    }

    /// Block until the child is reaped; only call once it was killed
    pub fn reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.wait() {
                debug!("Failed to reap {}: {}", self.pid, e);
            }
        }
    }
}

/// Starts commands on behalf of sequence steps
pub trait CommandRunner: Send + Sync {
    /// Run `command`.
    ///
    /// With `wait` the call blocks until the process exits and its output
    /// streams are drained; a non-zero exit is an error carrying stderr, and
    /// no handle is returned. Without `wait` the process keeps running and
    /// its handle is returned for tracking.
    fn run(&self, command: &CommandLine, wait: bool, cwd: Option<&Path>) -> ProcessResult<Option<ProcessHandle>>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    fn run(&self, command: &CommandLine, wait: bool, cwd: Option<&Path>) -> ProcessResult<Option<ProcessHandle>> {
        (**self).run(command, wait, cwd)
    }
}

/// Runner that spawns real OS processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &CommandLine, wait: bool, cwd: Option<&Path>) -> ProcessResult<Option<ProcessHandle>> {
        let program = command.program().display().to_string();
        let mut process = Command::new(command.program());
        process.args(command.arguments());
        if let Some(dir) = cwd.filter(|dir| dir.is_dir()) {
            process.current_dir(dir);
        }

        debug!("Running {} (wait={})", command, wait);

        if wait {
            let output = process
                .stdin(Stdio::null())
                .output()
                .map_err(|e| ProcessError::launch_failed(&program, &e))?;

            if !output.status.success() {
                let err = ProcessError::non_zero_exit(&program, output.status.to_string(), &output.stderr);
                warn!("{}", err);
                return Err(err);
            }
            return Ok(None);
        }

        let child = process
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| ProcessError::launch_failed(&program, &e))?;

        Ok(Some(ProcessHandle {
            pid: child.id(),
            command: command.to_string(),
            child: Some(child),
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_waited_command_success() {
        let runner = SystemCommandRunner::new();
        let cmd = CommandLine::new("/bin/sh").args(["-c", "exit 0"]);
        assert!(runner.run(&cmd, true, None).unwrap().is_none());
    }

    #[test]
    fn test_waited_command_failure_carries_stderr() {
        let runner = SystemCommandRunner::new();
        let cmd = CommandLine::new("/bin/sh").args(["-c", "echo broken >&2; exit 3"]);
        let err = runner.run(&cmd, true, None).unwrap_err();
        assert!(matches!(err, ProcessError::NonZeroExit { ref stderr, .. } if stderr.trim() == "broken"));
    }

    #[test]
    fn test_missing_binary_hint() {
        let runner = SystemCommandRunner::new();
        let err = runner.run(&CommandLine::new("/no/such/tool"), false, None).unwrap_err();
        assert!(err.to_string().contains("check the path"));
    }

    #[test]
    fn test_background_command_returns_handle() {
        let runner = SystemCommandRunner::new();
        let cmd = CommandLine::new("/bin/sh").args(["-c", "exit 0"]);
        let mut handle = runner.run(&cmd, false, Some(Path::new("/"))).unwrap().unwrap();
        assert!(handle.pid > 0);
        handle.reap();
        assert!(handle.child.is_none());
    }

    #[test]
    fn test_wait_returns_exit_status() {
        let runner = SystemCommandRunner::new();
        let cmd = CommandLine::new("/bin/sh").args(["-c", "exit 4"]);
        let mut handle = runner.run(&cmd, false, None).unwrap().unwrap();
        let status = handle.wait().unwrap().unwrap();
        assert_eq!(status.code(), Some(4));
        assert!(handle.wait().unwrap().is_none());
    }
}

//! Scripted process table and recording command runner for tests

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::Mutex;
use crate::plugin::command::CommandLine;
use crate::process::error::{ProcessError, ProcessResult};
use crate::process::runner::{CommandRunner, ProcessHandle};
use crate::process::table::{ProcessInfo, ProcessTable};

/// How a scripted process reacts to a graceful terminate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    ExitsOnTerminate,
    /// Still alive for this many liveness checks after terminate
    ExitsAfterPolls(u32),
    IgnoresTerminate,
    /// Graceful terminate fails outright; only a forced kill works
    RefusesGraceful,
    /// Every signal is refused
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate(u32),
    Kill(u32),
}

#[derive(Debug)]
struct MockProcess {
    parent_pid: u32,
    name: String,
    alive: bool,
    behaviour: Behaviour,
    polls_left: Option<u32>,
}

#[derive(Debug, Default)]
struct TableState {
    processes: BTreeMap<u32, MockProcess>,
    signals: Vec<Signal>,
}

/// In-memory process table
#[derive(Debug, Default)]
pub struct MockProcessTable {
    state: Mutex<TableState>,
}

impl MockProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, pid: u32, parent_pid: u32, name: &str, behaviour: Behaviour) {
        self.state.lock().processes.insert(pid, MockProcess {
            parent_pid,
            name: name.to_string(),
            alive: true,
            behaviour,
            polls_left: None,
        });
    }

    /// Mark a process as exited without any signal
    pub fn exit(&self, pid: u32) {
        if let Some(process) = self.state.lock().processes.get_mut(&pid) {
            process.alive = false;
        }
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.state.lock().signals.clone()
    }

    pub fn terminate_calls(&self) -> Vec<u32> {
        self.signals().into_iter()
            .filter_map(|s| match s { Signal::Terminate(pid) => Some(pid), _ => None })
            .collect()
    }

    pub fn kill_calls(&self) -> Vec<u32> {
        self.signals().into_iter()
            .filter_map(|s| match s { Signal::Kill(pid) => Some(pid), _ => None })
            .collect()
    }

    pub fn running(&self, pid: u32) -> bool {
        self.state.lock().processes.get(&pid).map(|p| p.alive).unwrap_or(false)
    }
}

impl ProcessTable for MockProcessTable {
    fn snapshot(&self) -> ProcessResult<Vec<ProcessInfo>> {
        Ok(self.state.lock().processes
            .iter()
            .filter(|(_, p)| p.alive)
            .map(|(&pid, p)| ProcessInfo { pid, parent_pid: p.parent_pid, name: p.name.clone() })
            .collect())
    }

    fn is_alive(&self, pid: u32) -> bool {
        let mut state = self.state.lock();
        let Some(process) = state.processes.get_mut(&pid) else {
            return false;
        };
        if let Some(left) = process.polls_left {
            if left == 0 {
                process.alive = false;
            } else {
                process.polls_left = Some(left - 1);
            }
        }
        process.alive
    }

    fn terminate(&self, pid: u32) -> ProcessResult<()> {
        let mut state = self.state.lock();
        state.signals.push(Signal::Terminate(pid));
        let process = match state.processes.get_mut(&pid) {
            Some(p) if p.alive => p,
            _ => return Err(ProcessError::NoSuchProcess { pid }),
        };
        match process.behaviour {
            Behaviour::ExitsOnTerminate => process.alive = false,
            Behaviour::ExitsAfterPolls(n) => process.polls_left = Some(n),
            Behaviour::IgnoresTerminate => {}
            Behaviour::RefusesGraceful => {
                return Err(ProcessError::SignalFailed {
                    pid,
                    message: "can only be terminated forcefully".to_string(),
                });
            }
            Behaviour::Protected => return Err(ProcessError::AccessDenied { pid }),
        }
        Ok(())
    }

    fn kill(&self, pid: u32) -> ProcessResult<()> {
        let mut state = self.state.lock();
        state.signals.push(Signal::Kill(pid));
        let process = match state.processes.get_mut(&pid) {
            Some(p) if p.alive => p,
            _ => return Err(ProcessError::NoSuchProcess { pid }),
        };
        if process.behaviour == Behaviour::Protected {
            return Err(ProcessError::AccessDenied { pid });
        }
        process.alive = false;
        Ok(())
    }
}

/// One recorded `run` call
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub command: CommandLine,
    pub wait: bool,
    pub cwd: Option<PathBuf>,
    pub pid: Option<u32>,
}

/// Runner that records commands and registers spawned processes in a
/// [`MockProcessTable`]
pub struct MockRunner {
    table: Arc<MockProcessTable>,
    runs: Mutex<Vec<RunRecord>>,
    next_pid: Mutex<u32>,
    failing: Mutex<Vec<String>>,
    behaviour: Behaviour,
}

impl MockRunner {
    pub fn new(table: Arc<MockProcessTable>) -> Self {
        Self {
            table,
            runs: Mutex::new(Vec::new()),
            next_pid: Mutex::new(1000),
            failing: Mutex::new(Vec::new()),
            behaviour: Behaviour::ExitsOnTerminate,
        }
    }

    pub fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    /// Make launches of this program file name fail
    pub fn fail_program(&self, name: &str) {
        self.failing.lock().push(name.to_string());
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().clone()
    }

    /// Displayed command lines, in run order
    pub fn commands(&self) -> Vec<String> {
        self.runs.lock().iter().map(|r| r.command.to_string()).collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &CommandLine, wait: bool, cwd: Option<&Path>) -> ProcessResult<Option<ProcessHandle>> {
        let name = command.executable_name().unwrap_or_default();
        if self.failing.lock().contains(&name) {
            return Err(ProcessError::launch_failed(
                command.program().display().to_string(),
                &std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        let pid = if wait {
            None
        } else {
            let mut next = self.next_pid.lock();
            *next += 1;
            self.table.spawn(*next, 1, &name, self.behaviour);
            Some(*next)
        };

        self.runs.lock().push(RunRecord {
            command: command.clone(),
            wait,
            cwd: cwd.map(Path::to_path_buf),
            pid,
        });

        Ok(pid.map(|pid| ProcessHandle::detached(pid, command.to_string())))
    }
}

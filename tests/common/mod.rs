//! Process doubles for end-to-end tests against the public API

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tempfile::TempDir;
use gamewrap::config::ConfigManager;
use gamewrap::plugin::CommandLine;
use gamewrap::process::{CommandRunner, ProcessError, ProcessHandle, ProcessInfo, ProcessResult, ProcessTable};
use gamewrap::sequence::{LauncherContext, SequenceExecutor};
use gamewrap::status::MemoryStatus;

/// Processes that exit on the first terminate request
#[derive(Debug, Default)]
pub struct FakeTable {
    processes: Mutex<BTreeMap<u32, (u32, String)>>,
    terminated: Mutex<Vec<u32>>,
}

impl FakeTable {
    pub fn add(&self, pid: u32, name: &str) {
        self.processes.lock().insert(pid, (1, name.to_string()));
    }

    pub fn alive(&self, pid: u32) -> bool {
        self.processes.lock().contains_key(&pid)
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().clone()
    }
}

impl ProcessTable for FakeTable {
    fn snapshot(&self) -> ProcessResult<Vec<ProcessInfo>> {
        Ok(self.processes.lock()
            .iter()
            .map(|(&pid, (parent_pid, name))| ProcessInfo { pid, parent_pid: *parent_pid, name: name.clone() })
            .collect())
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.alive(pid)
    }

    fn terminate(&self, pid: u32) -> ProcessResult<()> {
        self.terminated.lock().push(pid);
        match self.processes.lock().remove(&pid) {
            Some(_) => Ok(()),
            None => Err(ProcessError::NoSuchProcess { pid }),
        }
    }

    fn kill(&self, pid: u32) -> ProcessResult<()> {
        self.terminate(pid)
    }
}

/// Records command lines; non-waited commands become live entries in the table
pub struct RecordingRunner {
    table: Arc<FakeTable>,
    commands: Mutex<Vec<(String, bool)>>,
    next_pid: Mutex<u32>,
}

impl RecordingRunner {
    pub fn new(table: Arc<FakeTable>) -> Self {
        Self { table, commands: Mutex::new(Vec::new()), next_pid: Mutex::new(5000) }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().iter().map(|(command, _)| command.clone()).collect()
    }

    pub fn waited(&self) -> Vec<bool> {
        self.commands.lock().iter().map(|(_, wait)| *wait).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &CommandLine, wait: bool, _cwd: Option<&Path>) -> ProcessResult<Option<ProcessHandle>> {
        self.commands.lock().push((command.to_string(), wait));
        if wait {
            return Ok(None);
        }
        let mut next = self.next_pid.lock();
        *next += 1;
        self.table.add(*next, &command.executable_name().unwrap_or_default());
        Ok(Some(ProcessHandle::detached(*next, command.to_string())))
    }
}

/// Temporary game directory with a `Game.toml`
pub struct GameDir {
    pub dir: TempDir,
}

impl GameDir {
    pub fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create an empty stand-in executable and return its path
    pub fn tool(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"").unwrap();
        path
    }

    /// Write `Game.toml`; `{dir}` is replaced by the game directory
    pub fn write_config(&self, template: &str) -> PathBuf {
        let path = self.dir.path().join("Game.toml");
        fs::write(&path, template.replace("{dir}", &self.dir.path().to_string_lossy())).unwrap();
        path
    }

    pub fn load(&self) -> ConfigManager {
        ConfigManager::load(Some(&self.dir.path().join("Game.toml"))).unwrap()
    }
}

pub struct Doubles {
    pub table: Arc<FakeTable>,
    pub runner: Arc<RecordingRunner>,
    pub status: Arc<MemoryStatus>,
}

impl Doubles {
    pub fn new() -> Self {
        let table = Arc::new(FakeTable::default());
        let runner = Arc::new(RecordingRunner::new(Arc::clone(&table)));
        Self { table, runner, status: Arc::new(MemoryStatus::new()) }
    }

    pub fn executor<'a>(&self, context: &'a LauncherContext) -> SequenceExecutor<'a> {
        SequenceExecutor::new(
            context,
            self.status.clone(),
            Box::new(Arc::clone(&self.runner)),
            self.table.clone(),
        )
        .unwrap()
        .with_poll_interval(Duration::from_millis(2))
    }
}

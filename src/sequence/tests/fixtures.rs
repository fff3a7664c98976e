//! Shared set-up for executor tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use crate::config::ConfigManager;
use crate::plugin::traits::ToolPlugin;
use crate::process::tests::mock_process::{MockProcessTable, MockRunner};
use crate::sequence::context::LauncherContext;
use crate::sequence::executor::SequenceExecutor;
use crate::status::MemoryStatus;

/// A scratch directory holding fake tool binaries
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    /// Create an empty file standing in for an executable
    pub fn tool(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// TOML literal string for a path
pub fn lit(path: &Path) -> String {
    format!("'{}'", path.display())
}

pub fn context(toml: &str) -> LauncherContext {
    LauncherContext::new(ConfigManager::from_toml_str(toml).unwrap())
}

pub fn context_with(toml: &str, plugins: Vec<Arc<dyn ToolPlugin>>) -> LauncherContext {
    let mut context = LauncherContext::empty(ConfigManager::from_toml_str(toml).unwrap());
    for plugin in plugins {
        context.registry.register(plugin);
    }
    context
}

/// Recording collaborators for one executor
pub struct Harness {
    pub table: Arc<MockProcessTable>,
    pub runner: Arc<MockRunner>,
    pub status: Arc<MemoryStatus>,
}

impl Harness {
    pub fn new() -> Self {
        let table = Arc::new(MockProcessTable::new());
        let runner = Arc::new(MockRunner::new(Arc::clone(&table)));
        Self {
            table,
            runner,
            status: Arc::new(MemoryStatus::new()),
        }
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

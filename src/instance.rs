//! Single-instance PID marker
//!
//! A small TOML file recording the pid of the running launcher. A second
//! launcher refuses to start while the recorded process is alive, unless the
//! running one declared itself multi-instance.

use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::process::ProcessTable;

const MARKER_FILE: &str = "instance.toml";

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("Another launcher instance is running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("Cannot access instance marker {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl InstanceError {
    fn io(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::Io { path: path.to_path_buf(), message: error.to_string() }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct MarkerFile {
    instance: MarkerEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct MarkerEntry {
    pid: u32,
    #[serde(default)]
    multi_instance: bool,
}

/// Default marker location under the user's local data directory
pub fn default_marker_path() -> Option<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("gamewrap"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".gamewrap")))
        .map(|dir| dir.join(MARKER_FILE))
}

/// Held for the lifetime of a launcher run; removes the marker on drop
#[derive(Debug)]
pub struct InstanceGuard {
    path: PathBuf,
    pid: u32,
}

impl InstanceGuard {
    /// Record this process in the marker at `path`.
    ///
    /// Fails with `AlreadyRunning` when the marker names another live process
    /// that did not declare itself multi-instance. Stale or unreadable markers
    /// are overwritten.
    pub fn acquire(path: &Path, multi_instance: bool, table: &dyn ProcessTable) -> Result<Self, InstanceError> {
        Self::acquire_as(path, std::process::id(), multi_instance, table)
    }

    pub(crate) fn acquire_as(
        path: &Path,
        pid: u32,
        multi_instance: bool,
        table: &dyn ProcessTable,
    ) -> Result<Self, InstanceError> {
        if let Some(existing) = read_marker(path) {
            let other = existing.instance;
            if other.multi_instance {
                debug!("Running instance {} allows others", other.pid);
            } else if other.pid != 0 && other.pid != pid && table.is_alive(other.pid) {
                return Err(InstanceError::AlreadyRunning { pid: other.pid });
            } else {
                debug!("Replacing stale instance marker for pid {}", other.pid);
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| InstanceError::io(parent, e))?;
        }
        let marker = MarkerFile { instance: MarkerEntry { pid, multi_instance } };
        let content = toml::to_string(&marker).map_err(|e| InstanceError::io(path, e))?;
        fs::write(path, content).map_err(|e| InstanceError::io(path, e))?;

        debug!("Instance marker written to {}", path.display());
        Ok(Self { path: path.to_path_buf(), pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        // Another instance may have taken over the marker in the meantime
        let ours = read_marker(&self.path)
            .map(|marker| marker.instance.pid == self.pid)
            .unwrap_or(false);
        if ours {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Failed to remove instance marker {}: {}", self.path.display(), e);
            }
        }
    }
}

fn read_marker(path: &Path) -> Option<MarkerFile> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(marker) => Some(marker),
        Err(e) => {
            warn!("Ignoring unreadable instance marker {}: {}", path.display(), e);
            None
        }
    }
}

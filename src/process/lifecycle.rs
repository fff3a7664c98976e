//! Process lifecycle management
//!
//! Tracks non-waited processes by step key and tears process trees down with
//! a graceful-then-forced escalation: terminate the whole tree, wait out the
//! grace period while collecting exits, then kill whatever is still alive.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, info, warn};
use super::error::ProcessError;
use super::runner::ProcessHandle;
use super::table::{descendants, ProcessTable};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A spawned process retained for later termination
#[derive(Debug)]
pub struct TrackedProcess {
    pub key: String,
    pub handle: ProcessHandle,
    pub started: Instant,
}

/// Outcome of tearing down one or more process trees
#[derive(Debug, Default)]
pub struct TerminationReport {
    /// Exited after the graceful request (or were already gone)
    pub graceful: Vec<u32>,
    /// Force-killed after the grace period
    pub killed: Vec<u32>,
    pub failed: Vec<(u32, ProcessError)>,
}

impl TerminationReport {
    pub fn merge(&mut self, other: TerminationReport) {
        self.graceful.extend(other.graceful);
        self.killed.extend(other.killed);
        self.failed.extend(other.failed);
    }

    pub fn is_empty(&self) -> bool {
        self.graceful.is_empty() && self.killed.is_empty() && self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.graceful.len() + self.killed.len() + self.failed.len()
    }
}

pub struct ProcessLifecycleManager {
    table: Arc<dyn ProcessTable>,
    tracked: HashMap<String, TrackedProcess>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ProcessLifecycleManager {
    pub fn new(table: Arc<dyn ProcessTable>, timeout: Duration) -> Self {
        Self {
            table,
            tracked: HashMap::new(),
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.set_poll_interval(interval);
        self
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn table(&self) -> &Arc<dyn ProcessTable> {
        &self.table
    }

    /// Track a process under `key`, replacing any previous entry
    pub fn track(&mut self, key: &str, handle: ProcessHandle) {
        debug!("Tracking '{}' as pid {}", key, handle.pid);
        let entry = TrackedProcess {
            key: key.to_string(),
            handle,
            started: Instant::now(),
        };
        if let Some(previous) = self.tracked.insert(key.to_string(), entry) {
            debug!("'{}' replaced tracked pid {}", key, previous.handle.pid);
        }
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.tracked.contains_key(key)
    }

    pub fn tracked_pid(&self, key: &str) -> Option<u32> {
        self.tracked.get(key).map(|entry| entry.handle.pid)
    }

    pub fn tracked_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tracked.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Terminate the tree of one tracked process and forget it.
    /// Returns `None` when nothing is tracked under `key`.
    pub fn terminate_tracked(&mut self, key: &str, on_exit: &mut dyn FnMut(u32)) -> Option<TerminationReport> {
        let mut entry = self.tracked.remove(key)?;
        info!("Terminating '{}' (pid {})", key, entry.handle.pid);
        Some(self.terminate_handle(&mut entry.handle, on_exit))
    }

    /// Terminate `root` and every current descendant
    pub fn terminate_tree(&self, root: u32, on_exit: &mut dyn FnMut(u32)) -> TerminationReport {
        self.terminate_tree_inner(root, None, on_exit)
    }

    fn terminate_handle(&self, handle: &mut ProcessHandle, on_exit: &mut dyn FnMut(u32)) -> TerminationReport {
        let report = self.terminate_tree_inner(handle.pid, Some(&mut *handle), on_exit);
        if report.killed.contains(&handle.pid) || report.graceful.contains(&handle.pid) {
            handle.reap();
        }
        report
    }

    fn terminate_tree_inner(
        &self,
        root: u32,
        mut handle: Option<&mut ProcessHandle>,
        on_exit: &mut dyn FnMut(u32),
    ) -> TerminationReport {
        let mut report = TerminationReport::default();

        // Fresh snapshot every call; trees are never cached
        let mut members = vec![root];
        match self.table.snapshot() {
            Ok(processes) => members.extend(descendants(&processes, root)),
            Err(e) => warn!("Cannot enumerate children of {}: {}", root, e),
        }
        let own_pid = std::process::id();
        members.retain(|pid| *pid != own_pid && *pid != 0);

        let mut alive = |table: &dyn ProcessTable, pid: u32| -> bool {
            if pid == root {
                if let Some(handle) = handle.as_deref_mut() {
                    if handle.child.is_some() && handle.try_reap() {
                        return false;
                    }
                }
            }
            table.is_alive(pid)
        };

        let mut pending = Vec::new();
        for pid in members {
            match self.table.terminate(pid) {
                Ok(()) => pending.push(pid),
                Err(e) if e.is_already_gone() => {
                    debug!("Process {} already exited", pid);
                    report.graceful.push(pid);
                }
                Err(e) if e.is_permission_error() => {
                    warn!("Failed to terminate {}: {}", pid, e);
                    report.failed.push((pid, e));
                }
                Err(e) => {
                    // Still escalates to a forced kill after the grace period
                    warn!("Graceful terminate of {} refused: {}", pid, e);
                    pending.push(pid);
                }
            }
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            pending.retain(|&pid| {
                if alive(self.table.as_ref(), pid) {
                    true
                } else {
                    on_exit(pid);
                    report.graceful.push(pid);
                    false
                }
            });

            let now = Instant::now();
            if pending.is_empty() || now >= deadline {
                break;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }

        for pid in pending {
            // Last look so an exit at the very end of the grace period is not killed
            if !alive(self.table.as_ref(), pid) {
                on_exit(pid);
                report.graceful.push(pid);
                continue;
            }
            match self.table.kill(pid) {
                Ok(()) => {
                    info!("Force-killed process {}", pid);
                    on_exit(pid);
                    report.killed.push(pid);
                }
                Err(e) if e.is_already_gone() => {
                    on_exit(pid);
                    report.graceful.push(pid);
                }
                Err(e) => {
                    warn!("Failed to kill {}: {}", pid, e);
                    report.failed.push((pid, e));
                }
            }
        }

        report
    }

    /// Terminate every process whose name matches exactly, ignoring case
    pub fn kill_by_name(&self, name: &str, on_exit: &mut dyn FnMut(u32)) -> TerminationReport {
        let mut report = TerminationReport::default();
        let processes = match self.table.snapshot() {
            Ok(processes) => processes,
            Err(e) => {
                warn!("Cannot search for '{}': {}", name, e);
                return report;
            }
        };

        let own_pid = std::process::id();
        let mut matches: Vec<u32> = processes
            .iter()
            .filter(|p| p.pid != own_pid && p.name.eq_ignore_ascii_case(name))
            .map(|p| p.pid)
            .collect();
        matches.sort_unstable();

        if matches.is_empty() {
            debug!("No running process named '{}'", name);
        }

        for pid in matches {
            // May already have gone as a descendant of an earlier match
            if report.graceful.contains(&pid) || report.killed.contains(&pid) {
                continue;
            }
            info!("Terminating '{}' (pid {})", name, pid);
            report.merge(self.terminate_tree(pid, on_exit));
        }
        report
    }

    /// Terminate everything still tracked and empty the map
    pub fn final_cleanup(&mut self, on_exit: &mut dyn FnMut(u32)) -> TerminationReport {
        let mut report = TerminationReport::default();
        let mut entries: Vec<TrackedProcess> = self.tracked.drain().map(|(_, entry)| entry).collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        for mut entry in entries {
            info!("Cleaning up '{}' (pid {})", entry.key, entry.handle.pid);
            report.merge(self.terminate_handle(&mut entry.handle, on_exit));
        }
        report
    }
}

impl std::fmt::Debug for ProcessLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessLifecycleManager")
            .field("tracked", &self.tracked_keys())
            .field("timeout", &self.timeout)
            .finish()
    }
}

//! OS process table access
//!
//! The [`ProcessTable`] trait is the only place the lifecycle manager touches
//! the operating system: enumerate processes, check liveness and deliver a
//! graceful or forced termination.

use std::collections::{HashMap, VecDeque};
use super::error::{ProcessError, ProcessResult};

/// One row of a process table snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent_pid: u32,
    pub name: String,
}

/// Operating system process table
pub trait ProcessTable: Send + Sync {
    /// All processes visible to the caller
    fn snapshot(&self) -> ProcessResult<Vec<ProcessInfo>>;

    /// Whether `pid` is still running (exited or zombie processes are not)
    fn is_alive(&self, pid: u32) -> bool;

    /// Ask the process to exit (SIGTERM / close request)
    fn terminate(&self, pid: u32) -> ProcessResult<()>;

    /// Force the process to exit (SIGKILL / forced taskkill)
    fn kill(&self, pid: u32) -> ProcessResult<()>;
}

/// All descendants of `root` in breadth-first order, excluding `root`
pub fn descendants(processes: &[ProcessInfo], root: u32) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for info in processes {
        if info.pid != info.parent_pid {
            children.entry(info.parent_pid).or_default().push(info.pid);
        }
    }

    let mut found = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(pid) = queue.pop_front() {
        if let Some(kids) = children.get(&pid) {
            for &kid in kids {
                if kid != root && !found.contains(&kid) {
                    found.push(kid);
                    queue.push_back(kid);
                }
            }
        }
    }
    found
}

/// Process table backed by the running operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::fs;
    use std::path::Path;
    use super::*;

    /// Parse `/proc/<pid>/stat`: `pid (comm) state ppid ...`
    fn read_stat(pid: u32) -> Option<(String, char, u32)> {
        let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        let open = stat.find('(')?;
        let close = stat.rfind(')')?;
        let comm = stat[open + 1..close].to_string();
        let mut fields = stat[close + 1..].split_whitespace();
        let state = fields.next()?.chars().next()?;
        let ppid = fields.next()?.parse().ok()?;
        Some((comm, state, ppid))
    }

    /// `comm` is truncated to 15 bytes, so prefer argv[0] when readable
    fn full_name(pid: u32, comm: String) -> String {
        fs::read(format!("/proc/{}/cmdline", pid))
            .ok()
            .and_then(|raw| {
                let first = raw.split(|b| *b == 0).next()?.to_vec();
                let argv0 = String::from_utf8(first).ok()?;
                let name = Path::new(&argv0).file_name()?.to_string_lossy().into_owned();
                name.starts_with(&comm).then_some(name)
            })
            .unwrap_or(comm)
    }

    pub fn snapshot() -> ProcessResult<Vec<ProcessInfo>> {
        let entries = fs::read_dir("/proc")
            .map_err(|e| ProcessError::io(format!("Failed to read /proc: {}", e)))?;

        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter_map(|pid| {
                let (comm, _, parent_pid) = read_stat(pid)?;
                Some(ProcessInfo { pid, parent_pid, name: full_name(pid, comm) })
            })
            .collect())
    }

    pub fn is_alive(pid: u32) -> bool {
        matches!(read_stat(pid), Some((_, state, _)) if state != 'Z' && state != 'X')
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
mod platform {
    use std::process::Command;
    use super::*;

    /// Parse `ps -axo pid=,ppid=,comm=`
    pub fn snapshot() -> ProcessResult<Vec<ProcessInfo>> {
        let output = Command::new("ps")
            .args(["-axo", "pid=,ppid=,comm="])
            .output()
            .map_err(|e| ProcessError::io(format!("Failed to run ps: {}", e)))?;

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text
            .lines()
            .filter_map(|line| {
                let mut parts = line.trim().splitn(3, char::is_whitespace);
                let pid = parts.next()?.trim().parse().ok()?;
                let parent_pid = parts.next()?.trim().parse().ok()?;
                let comm = parts.next()?.trim();
                let name = std::path::Path::new(comm)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| comm.to_string());
                Some(ProcessInfo { pid, parent_pid, name })
            })
            .collect())
    }

    pub fn is_alive(pid: u32) -> bool {
        // Signal 0 checks existence without delivering anything
        let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
        rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> ProcessResult<()> {
    if pid == 0 || pid > i32::MAX as u32 {
        return Err(ProcessError::NoSuchProcess { pid });
    }
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Err(ProcessError::NoSuchProcess { pid }),
        Some(libc::EPERM) => Err(ProcessError::AccessDenied { pid }),
        _ => Err(ProcessError::from_signal_error(pid, err)),
    }
}

#[cfg(windows)]
mod platform {
    use std::process::Command;
    use super::*;

    pub fn snapshot() -> ProcessResult<Vec<ProcessInfo>> {
        let output = Command::new("powershell")
            .args([
                "-NoProfile",
                "-Command",
                "Get-CimInstance Win32_Process | ForEach-Object { \"$($_.ProcessId),$($_.ParentProcessId),$($_.Name)\" }",
            ])
            .output()
            .map_err(|e| ProcessError::io(format!("Failed to query processes: {}", e)))?;

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text
            .lines()
            .filter_map(|line| {
                let mut parts = line.trim().splitn(3, ',');
                let pid = parts.next()?.parse().ok()?;
                let parent_pid = parts.next()?.parse().ok()?;
                let name = parts.next()?.to_string();
                Some(ProcessInfo { pid, parent_pid, name })
            })
            .collect())
    }

    pub fn is_alive(pid: u32) -> bool {
        let filter = format!("PID eq {}", pid);
        Command::new("tasklist")
            .args(["/FI", filter.as_str(), "/NH", "/FO", "CSV"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&format!("\"{}\"", pid)))
            .unwrap_or(false)
    }

    pub fn taskkill(pid: u32, force: bool) -> ProcessResult<()> {
        let pid_arg = pid.to_string();
        let mut args = vec!["/PID", pid_arg.as_str()];
        if force {
            args.insert(0, "/F");
        }
        let output = Command::new("taskkill")
            .args(&args)
            .output()
            .map_err(|e| ProcessError::from_signal_error(pid, e))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if stderr.contains("not found") {
            Err(ProcessError::NoSuchProcess { pid })
        } else if stderr.contains("access is denied") {
            Err(ProcessError::AccessDenied { pid })
        } else {
            Err(ProcessError::SignalFailed { pid, message: stderr.trim().to_string() })
        }
    }
}

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> ProcessResult<Vec<ProcessInfo>> {
        platform::snapshot()
    }

    fn is_alive(&self, pid: u32) -> bool {
        platform::is_alive(pid)
    }

    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> ProcessResult<()> {
        send_signal(pid, libc::SIGTERM)
    }

    #[cfg(unix)]
    fn kill(&self, pid: u32) -> ProcessResult<()> {
        send_signal(pid, libc::SIGKILL)
    }

    #[cfg(windows)]
    fn terminate(&self, pid: u32) -> ProcessResult<()> {
        platform::taskkill(pid, false)
    }

    #[cfg(windows)]
    fn kill(&self, pid: u32) -> ProcessResult<()> {
        platform::taskkill(pid, true)
    }
}

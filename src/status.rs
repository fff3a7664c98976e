//! Status Stream
//!
//! The player-facing progress messages a launcher shows while it works
//! ("Executing launch_sequence...", "  - Running: Pre1"). The engine only
//! emits text; sinks decide how to present it. Every sink mirrors messages
//! into the log.

use std::io::{self, Write};
use colored::Colorize;
use log::{error, info, warn};
use parking_lot::Mutex;

/// Severity of one status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Receiver for status messages
pub trait StatusSink: Send + Sync {
    fn emit(&self, level: StatusLevel, message: &str);

    fn show_message(&self, message: &str) {
        self.emit(StatusLevel::Info, message);
    }

    fn show_warning(&self, message: &str) {
        self.emit(StatusLevel::Warning, message);
    }

    fn show_error(&self, message: &str) {
        self.emit(StatusLevel::Error, message);
    }
}

fn mirror_to_log(level: StatusLevel, message: &str) {
    let message = message.trim_start();
    match level {
        StatusLevel::Info => info!("{}", message),
        StatusLevel::Warning => warn!("{}", message),
        StatusLevel::Error => error!("{}", message),
    }
}

/// Prints to stdout, coloured by severity unless disabled or `NO_COLOR` is set
#[derive(Debug, Clone)]
pub struct ConsoleStatus {
    colours: bool,
}

impl ConsoleStatus {
    pub fn new() -> Self {
        Self::with_colours(std::env::var_os("NO_COLOR").is_none())
    }

    pub fn with_colours(enabled: bool) -> Self {
        Self { colours: enabled }
    }
}

impl Default for ConsoleStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for ConsoleStatus {
    fn emit(&self, level: StatusLevel, message: &str) {
        mirror_to_log(level, message);

        let line = match (level, self.colours) {
            (_, false) | (StatusLevel::Info, true) => message.to_string(),
            (StatusLevel::Warning, true) => message.yellow().to_string(),
            (StatusLevel::Error, true) => message.red().bold().to_string(),
        };
        let _ = writeln!(io::stdout(), "{}", line);
    }
}

/// Sends status messages to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn emit(&self, level: StatusLevel, message: &str) {
        mirror_to_log(level, message);
    }
}

/// Collects messages for inspection
#[derive(Debug, Default)]
pub struct MemoryStatus {
    messages: Mutex<Vec<(StatusLevel, String)>>,
}

impl MemoryStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message texts in emission order
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn entries(&self) -> Vec<(StatusLevel, String)> {
        self.messages.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|(_, text)| text.contains(needle))
    }

    /// Index of the first message containing `needle`
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.messages.lock().iter().position(|(_, text)| text.contains(needle))
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl StatusSink for MemoryStatus {
    fn emit(&self, level: StatusLevel, message: &str) {
        mirror_to_log(level, message);
        self.messages.lock().push((level, message.to_string()));
    }
}

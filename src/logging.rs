// Logging module for gamewrap
// Structured logging behind the `log` facade, kept apart from the status
// stream the launcher shows to the player.
//
// - Output formats: Text and JSON
// - Destinations: Console (stderr), File (append), or Both
// - Independent log levels for console and file output
// - Timestamps as YYYY-MM-DD HH:mm:ss in local time
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Info,
//     file_level: Some(LevelFilter::Debug),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("gamewrap.log")),
// };
// init_logger(config)?;
// log::info!("Launcher started");
// ```

use log::{Level, LevelFilter};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file_path(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }

    fn uses_console(&self) -> bool {
        matches!(self, LogDestination::Console | LogDestination::Both(_))
    }
}

/// JSON log entry structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Highest level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        match self.file_level {
            Some(file_level) if file_level > self.console_level => file_level,
            _ => self.console_level,
        }
    }
}

/// Logger writing to stderr and/or an append-only file
pub struct GamewrapLogger {
    config: LogConfig,
    file: Mutex<Option<File>>,
}

impl GamewrapLogger {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_text_message(&self, level: Level, message: &str) -> String {
        let timestamp = Self::format_timestamp();
        format!("{} [{}] {}", timestamp, level.to_string().to_uppercase(), message)
    }

    fn format_json_message(&self, level: Level, message: &str, target: &str) -> Result<String> {
        // Only debug output carries the emitting module
        let detail = if level >= Level::Debug {
            Some(serde_json::json!({ "target": target }))
        } else {
            None
        };
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.to_string().to_uppercase(),
            message: message.to_string(),
            detail,
        };

        serde_json::to_string(&entry)
            .context("Failed to serialize log entry to JSON")
    }

    fn should_log_to_console(&self, level: Level) -> bool {
        self.config.destination.uses_console() && level <= self.config.console_level
    }

    fn should_log_to_file(&self, level: Level) -> bool {
        match (self.config.destination.file_path(), self.config.file_level) {
            (Some(_), Some(file_level)) => level <= file_level,
            _ => false,
        }
    }

    fn write_to_console(&self, formatted_message: &str) -> Result<()> {
        writeln!(io::stderr(), "{}", formatted_message)
            .context("Failed to write to console")
    }

    fn write_to_file(&self, formatted_message: &str, file_path: &Path) -> Result<()> {
        let mut guard = self.file.lock();
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .with_context(|| format!("Failed to open log file: {}", file_path.display()))?;
            *guard = Some(file);
        }

        match guard.as_mut() {
            Some(file) => writeln!(file, "{}", formatted_message)
                .context("Failed to write to log file"),
            None => Ok(()),
        }
    }
}

impl log::Log for GamewrapLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.should_log_to_console(metadata.level()) ||
        self.should_log_to_file(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = record.args().to_string();
        let level = record.level();

        let formatted_message = match self.config.format {
            LogFormat::Text => self.format_text_message(level, &message),
            LogFormat::Json => {
                match self.format_json_message(level, &message, record.target()) {
                    Ok(json) => json,
                    Err(e) => {
                        eprintln!("JSON formatting error: {}. Falling back to text format.", e);
                        self.format_text_message(level, &message)
                    }
                }
            }
        };

        let mut console_done = false;
        if self.should_log_to_console(level) {
            if let Err(e) = self.write_to_console(&formatted_message) {
                eprintln!("Console logging error: {}", e);
            }
            console_done = true;
        }

        if self.should_log_to_file(level) {
            if let Some(path) = self.config.destination.file_path() {
                if let Err(e) = self.write_to_file(&formatted_message, path) {
                    eprintln!("File logging error: {}. Falling back to console.", e);
                    if !console_done {
                        if let Err(console_err) = self.write_to_console(&formatted_message) {
                            eprintln!("Console fallback error: {}", console_err);
                        }
                    }
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    let logger = GamewrapLogger::new(config);

    log::set_boxed_logger(Box::new(logger))
        .context("Failed to set global logger")?;

    log::set_max_level(max_level);

    Ok(())
}

/// Convert string to LevelFilter
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.trim().to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off", level_str)),
    }
}

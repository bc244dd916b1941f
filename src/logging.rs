//! Logging backend for garchive.
//!
//! Text or JSON line output, to the console, a file, or both, with
//! independent level filters per destination.

use log::{Level, LevelFilter};
use serde::Serialize;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use anyhow::{Context, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
            _ => Err(format!("Invalid log format: {s}. Valid options: text, json")),
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    /// Level for the file destination; `None` disables file output.
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

#[derive(Serialize)]
struct JsonLogEntry<'a> {
    timestamp: String,
    level: String,
    message: &'a str,
}

struct GarchiveLogger {
    config: LogConfig,
}

impl GarchiveLogger {
    fn format_line(&self, level: Level, message: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        match self.config.format {
            LogFormat::Text => {
                format!("{} [{}] {}", timestamp, level.to_string().to_uppercase(), message)
            }
            LogFormat::Json => {
                let entry = JsonLogEntry {
                    timestamp,
                    level: level.to_string().to_uppercase(),
                    message,
                };
                serde_json::to_string(&entry).unwrap_or_else(|_| message.to_string())
            }
        }
    }

    fn console_enabled(&self, level: Level) -> bool {
        matches!(
            self.config.destination,
            LogDestination::Console | LogDestination::Both(_)
        ) && level <= self.config.console_level
    }

    fn file_enabled(&self, level: Level) -> bool {
        matches!(
            self.config.destination,
            LogDestination::File(_) | LogDestination::Both(_)
        ) && self.config.file_level.is_some_and(|filter| level <= filter)
    }

    fn file_path(&self) -> Option<&PathBuf> {
        match &self.config.destination {
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
            LogDestination::Console => None,
        }
    }
}

impl log::Log for GarchiveLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.console_enabled(metadata.level()) || self.file_enabled(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        let level = record.level();
        if !self.console_enabled(level) && !self.file_enabled(level) {
            return;
        }
        let line = self.format_line(level, &record.args().to_string());

        if self.console_enabled(level) {
            let _ = writeln!(io::stderr(), "{line}");
        }
        if self.file_enabled(level) {
            if let Some(path) = self.file_path() {
                let opened = OpenOptions::new().create(true).append(true).open(path);
                match opened {
                    Ok(mut file) => {
                        if let Err(err) = writeln!(file, "{line}") {
                            eprintln!("File logging error: {err}");
                        }
                    }
                    Err(err) => eprintln!("Failed to open log file {}: {err}", path.display()),
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Install the logger. May only be called once per process.
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config
        .file_level
        .map_or(config.console_level, |file| file.max(config.console_level));
    log::set_boxed_logger(Box::new(GarchiveLogger { config }))
        .context("Failed to set global logger")?;
    log::set_max_level(max_level);
    Ok(())
}

/// Convert a level name to a `LevelFilter`.
pub fn parse_log_level(level: &str) -> Result<LevelFilter> {
    match level.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!(
            "Invalid log level: {level}. Valid levels: error, warn, info, debug, trace, off"
        )),
    }
}

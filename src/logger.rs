use chrono::{DateTime, Local};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::error::RelayError;

static RELAY_LOGGER: Lazy<RelayLogger> = Lazy::new(RelayLogger::default);

/// Installs the relay logger as the `log` backend. Fails if another
/// logger was installed first.
pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let filter = config.min_level.filter();
    RELAY_LOGGER.reconfigure(config);

    log::set_logger(&*RELAY_LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    log::set_max_level(filter);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn badge(&self) -> (&'static str, Color) {
        match self {
            LogLevel::Trace => ("🔍", Color::Cyan),
            LogLevel::Debug => ("🐛", Color::Blue),
            LogLevel::Info => ("💡", Color::Green),
            LogLevel::Warn => ("⚠️", Color::Yellow),
            LogLevel::Error => ("❌", Color::Red),
        }
    }

    pub fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = RelayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(RelayError::Config(format!("unknown log level '{}'", other))),
        }
    }
}

/// One rendered log record. Serialized as-is for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LogEntry {
    fn from_record(record: &Record, with_location: bool) -> Self {
        let location = match (with_location, record.file(), record.line()) {
            (true, Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            timestamp: Local::now(),
            level: record.level().into(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            location,
        }
    }

    fn render(&self, config: &LoggerConfig) -> String {
        let timestamp = self.timestamp.format(&config.timestamp_format).to_string();
        let (emoji, color) = self.level.badge();
        let badge = format!("{} {}", emoji, self.level.as_str());

        let mut line = if config.show_colors {
            format!(
                "{} [{}] {}: {}",
                timestamp.bright_black(),
                badge.color(color).bold(),
                self.target.bright_blue(),
                self.message
            )
        } else {
            format!("{} [{}] {}: {}", timestamp, badge, self.target, self.message)
        };

        if let Some(location) = &self.location {
            line.push_str(&format!(" ({})", location));
        }
        line
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_file_location: bool,
    pub timestamp_format: String,
    pub output_json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_file_location: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    /// JSON lines without colors, for log collectors.
    pub fn production() -> Self {
        Self {
            show_colors: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn from_relay_config(config: &RelayConfig) -> Self {
        let base = if config.log_json {
            Self::production()
        } else {
            Self::default()
        };
        // Source locations are only worth the noise when debugging.
        let base = Self {
            show_file_location: config.log_level <= LogLevel::Debug,
            ..base
        };
        base.with_level(config.log_level)
    }
}

#[derive(Default)]
pub struct RelayLogger {
    config: Mutex<LoggerConfig>,
}

impl RelayLogger {
    fn reconfigure(&self, config: LoggerConfig) {
        if let Ok(mut current) = self.config.lock() {
            *current = config;
        }
    }
}

impl log::Log for RelayLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.config
            .lock()
            .map(|config| metadata.level() <= config.min_level.filter())
            .unwrap_or(true)
    }

    fn log(&self, record: &Record) {
        let Ok(config) = self.config.lock() else {
            return;
        };
        if record.level() > config.min_level.filter() {
            return;
        }

        let entry = LogEntry::from_record(record, config.show_file_location);
        let line = if config.output_json {
            serde_json::to_string(&entry).unwrap_or_default()
        } else {
            entry.render(&config)
        };
        println!("{}", line);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

/// Logs how long a pipeline stage took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  {} started", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!("⏱️  {} took {}ms", self.name, self.elapsed().as_millis());
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str, host: &str, port: u16) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🌐 Listening on http://{}:{}", host, port);
}

/// Never logs the credential itself, only whether one is configured.
pub fn log_config_info(config: &RelayConfig) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Strategy: {}", config.strategy);
    log::info!("   Provider: {}", config.provider.base_url);
    log::info!(
        "   Server API key: {}",
        if config.provider.api_key.is_some() { "✅" } else { "❌" }
    );
    match &config.temp_dir {
        Some(dir) => log::info!("   Temp dir: {}", dir.display()),
        None => log::info!("   Temp dir: system default"),
    }
}

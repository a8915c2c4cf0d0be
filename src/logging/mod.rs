// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Logging on the `tracing` ecosystem.
//!
//! ```text
//! init_logging(&LogConfig)
//!        |
//!        v
//!    registry + Vec<Box<dyn Layer>>
//!    |                         |
//!    v                         v
//! stderr (text)            file (optional)
//! EnvFilter(console_level) EnvFilter(file_level)
//!                          non_blocking, text | json
//!        |
//!        v
//!    LogGuard (flush on drop)
//!
//! LogLevel:  0=off  1=error  2=warn  3=info
//!            4=debug  5=trace  6=dump(+dependencies)
//! ```
//!
//! Console output goes to stderr; stdout carries command results.

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self as tfmt, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LogSettings;
use crate::error::{ConfigError, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

const LEVEL_NAMES: [&str; 7] = ["off", "error", "warn", "info", "debug", "trace", "dump"];

/// Verbosity on a 0-6 scale.
///
/// Levels up to `TRACE` only raise this crate's verbosity; `DUMP` also lets
/// dependencies such as reqwest and hyper log at trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogLevel(u8);

impl Default for LogLevel {
    fn default() -> Self {
        Self::WARN
    }
}

impl LogLevel {
    pub const SILENT: Self = Self(0);
    pub const ERROR: Self = Self(1);
    pub const WARN: Self = Self(2);
    pub const INFO: Self = Self(3);
    pub const DEBUG: Self = Self(4);
    pub const TRACE: Self = Self(5);
    pub const DUMP: Self = Self(6);

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `level` is greater than 6.
    pub fn new(level: u8) -> std::result::Result<Self, ConfigError> {
        Self::from_u8(level).ok_or_else(|| ConfigError::InvalidValue {
            section: "log".to_string(),
            key: "level".to_string(),
            message: format!("log level must be 0-6, got {level}"),
        })
    }

    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Saturates at `DUMP`; negative values are `SILENT`.
    #[must_use]
    pub const fn from_int(level: i32) -> Self {
        match level {
            i32::MIN..=0 => Self::SILENT,
            1 => Self::ERROR,
            2 => Self::WARN,
            3 => Self::INFO,
            4 => Self::DEBUG,
            5 => Self::TRACE,
            _ => Self::DUMP,
        }
    }

    #[must_use]
    pub const fn from_u8(level: u8) -> Option<Self> {
        if level <= 6 { Some(Self(level)) } else { None }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        LEVEL_NAMES[self.0 as usize]
    }

    #[must_use]
    pub const fn to_tracing_level(self) -> Option<Level> {
        match self.0 {
            0 => None,
            1 => Some(Level::ERROR),
            2 => Some(Level::WARN),
            3 => Some(Level::INFO),
            4 => Some(Level::DEBUG),
            _ => Some(Level::TRACE),
        }
    }

    /// `EnvFilter` directives for this level.
    #[must_use]
    pub const fn to_filter_string(self) -> &'static str {
        match self.0 {
            0 => "off",
            1 => "error",
            2 => "warn,stack_cache=warn",
            3 => "warn,stack_cache=info",
            4 => "warn,stack_cache=debug",
            5 => "warn,stack_cache=trace",
            _ => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts `0`-`6` or a level name such as `debug`.
impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<u8>() {
            return Self::new(level);
        }
        LEVEL_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(s))
            .and_then(|i| u8::try_from(i).ok())
            .map(Self)
            .ok_or_else(|| ConfigError::InvalidValue {
                section: "log".to_string(),
                key: "level".to_string(),
                message: format!("unknown log level '{s}'"),
            })
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(level) => Self::new(level),
            Raw::Name(name) => name.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// Output format of the log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Builder)]
pub struct LogConfig {
    #[builder(setters(name = with_console_level), default = LogLevel::WARN)]
    console_level: LogLevel,
    #[builder(setters(name = with_file_level), default = LogLevel::DEBUG)]
    file_level: LogLevel,
    #[builder(setters(name = with_log_file))]
    log_file: Option<PathBuf>,
    #[builder(setters(name = with_file_format), default)]
    file_format: LogFormat,
    #[builder(setters(name = with_show_timestamps), default = true)]
    show_timestamps: bool,
    #[builder(setters(name = with_show_target), default = false)]
    show_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&LogSettings> for LogConfig {
    fn from(settings: &LogSettings) -> Self {
        Self::builder()
            .with_console_level(settings.level)
            .with_file_level(settings.file_level)
            .maybe_with_log_file(settings.file.clone())
            .with_file_format(settings.format)
            .build()
    }
}

impl LogConfig {
    #[must_use]
    pub const fn console_level(&self) -> LogLevel {
        self.console_level
    }

    #[must_use]
    pub const fn file_level(&self) -> LogLevel {
        self.file_level
    }

    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    #[must_use]
    pub const fn file_format(&self) -> LogFormat {
        self.file_format
    }

    #[must_use]
    pub const fn show_timestamps(&self) -> bool {
        self.show_timestamps
    }

    #[must_use]
    pub const fn show_target(&self) -> bool {
        self.show_target
    }
}

/// Keeps the file writer alive; pending lines are flushed on drop.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive until the program exits.
///
/// # Errors
///
/// Returns an error if the log file cannot be created or a global subscriber
/// is already installed.
///
/// # Example
///
/// ```no_run
/// use stack_cache::logging::{init_logging, LogConfig, LogLevel};
///
/// let config = LogConfig::builder()
///     .with_console_level(LogLevel::INFO)
///     .with_log_file("stack-cache.log".into())
///     .build();
///
/// let _guard = init_logging(&config)?;
/// tracing::info!("Logging initialized");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logging(config: &LogConfig) -> Result<LogGuard> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)];

    let file_guard = match config.log_file() {
        Some(path) => {
            let (layer, guard) = file_layer(config, path)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("failed to install the global log subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

fn console_layer(config: &LogConfig) -> BoxedLayer {
    let filter = EnvFilter::new(config.console_level().to_filter_string());
    let layer = tfmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.show_target())
        .with_level(true)
        .with_ansi(true);

    if config.show_timestamps() {
        Box::new(layer.with_filter(filter))
    } else {
        Box::new(layer.without_time().with_filter(filter))
    }
}

fn file_layer(config: &LogConfig, path: &Path) -> Result<(BoxedLayer, WorkerGuard)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::new(config.file_level().to_filter_string());

    let layer: BoxedLayer = match config.file_format() {
        LogFormat::Text => Box::new(
            tfmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(filter),
        ),
        LogFormat::Json => Box::new(
            tfmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true)
                .with_filter(filter),
        ),
    };
    Ok((layer, guard))
}

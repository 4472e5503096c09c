//! Logging configuration

use serde::Deserialize;

/// Log section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level emitted.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - very verbose.
    Trace,
    /// Debug level - debugging information.
    Debug,
    /// Info level - normal operation (default).
    #[default]
    Info,
    /// Warn level - warnings only.
    Warn,
    /// Error level - errors only.
    Error,
}

impl LogLevel {
    /// The tracing filter string for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default).
    #[default]
    Console,
    /// JSON structured logging.
    Json,
}

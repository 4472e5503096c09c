//! Weir - Service configuration
//!
//! TOML-based configuration for the service binary with sensible
//! defaults; a minimal config should just work. Stream definitions are
//! not part of this file — they arrive over the control plane, or from
//! the YAML files under `streams_dir` at boot.
//!
//! # Example
//!
//! ```toml
//! [http]
//! listen_addr = "0.0.0.0:4195"
//! api_timeout = "5s"
//!
//! [log]
//! level = "info"
//!
//! streams_dir = "streams/"
//! ```

mod error;
mod logging;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Main configuration structure. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Control-plane HTTP server settings.
    pub http: HttpConfig,

    /// Logging configuration.
    pub log: LogConfig,

    /// Directory of stream config files (`*.yaml` / `*.yml`) loaded at
    /// boot, each registered under its file stem.
    pub streams_dir: Option<String>,

    /// Names of in-memory cache resources created at boot, available to
    /// processors such as `dedupe`.
    pub caches: Vec<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address for the control plane.
    pub listen_addr: String,

    /// Deadline for stream shutdown work triggered over the API.
    #[serde(with = "humantime_serde")]
    pub api_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4195".to_owned(),
            api_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid
    /// TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&contents)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

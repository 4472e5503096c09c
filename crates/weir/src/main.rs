//! Weir - transactional stream-processing service
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (control plane on 0.0.0.0:4195)
//! weir
//!
//! # Run with a config file and boot streams
//! weir --config configs/weir.toml
//! ```

mod serve;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weir_config::{Config, LogFormat};

/// Weir - transactional stream-processing service
#[derive(Parser, Debug)]
#[command(name = "weir")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/weir.toml")]
    config: std::path::PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::from_file(&cli.config)?
    } else {
        Config::default()
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log.level.as_str().to_owned());
    init_logging(&level, config.log.format)?;

    serve::run(config).await
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
    }
    Ok(())
}

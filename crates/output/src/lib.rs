//! Weir - Output drivers
//!
//! Outputs are the tail of a stream: they consume transactions, attempt
//! delivery and answer each transaction exactly once. Outputs never retry
//! internally — a failed write is nacked and the upstream stage (broker,
//! buffer or input) owns the retry policy.
//!
//! Built-in drivers: `stdout`, `drop` (ack and discard), `file` (append
//! one line per part) and `tcp` (reconnecting line writer with an
//! optional authentication preamble). The `fan_out` and `round_robin`
//! composites wrap a list of child outputs behind the same face.

mod config;
mod drop;
mod file;
mod stdout;
mod tcp;

pub use config::{FileOutputConfig, OutputConfig, TcpOutputConfig};
pub use drop::DropOutput;
pub use file::FileOutput;
pub use stdout::StdoutOutput;
pub use tcp::TcpOutput;

use weir_broker::{FanOut, RoundRobin};
use weir_core::{Error, Output};
use weir_metrics::SharedMetrics;

/// Build an output driver (possibly a broker over children) from
/// configuration.
pub fn build(conf: &OutputConfig, metrics: &SharedMetrics) -> Result<Box<dyn Output>, Error> {
    match conf {
        OutputConfig::Stdout => Ok(Box::new(StdoutOutput::new(metrics))),
        OutputConfig::Drop => Ok(Box::new(DropOutput::new(metrics))),
        OutputConfig::File(file) => Ok(Box::new(FileOutput::new(file, metrics)?)),
        OutputConfig::Tcp(tcp) => Ok(Box::new(TcpOutput::new(tcp, metrics))),
        OutputConfig::FanOut { outputs } => {
            let children = outputs
                .iter()
                .map(|child| build(child, metrics))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(FanOut::new(children, metrics)?))
        }
        OutputConfig::RoundRobin { outputs } => {
            let children = outputs
                .iter()
                .map(|child| build(child, metrics))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(RoundRobin::new(children, metrics)?))
        }
    }
}

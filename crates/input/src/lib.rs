//! Weir - Input drivers
//!
//! Inputs are the head of a stream: they turn an external feed into
//! transactions and own the at-least-once edge with the outside world.
//! Every driver delivers through the same retrying helper — send the
//! message, await its response, re-send the same message behind the
//! backoff throttle on rejection — so a message is only dropped by
//! operator-initiated shutdown.
//!
//! Built-in drivers: `tcp` (line-delimited frames per connection), `file`
//! (one message per line, end-of-stream at EOF) and `stdin`.

mod common;
mod config;
mod file;
mod stdin;
mod tcp;

pub use config::{FileInputConfig, InputConfig, TcpInputConfig};
pub use file::FileInput;
pub use stdin::StdinInput;
pub use tcp::TcpInput;

use weir_core::{Error, Input};
use weir_metrics::SharedMetrics;

/// Build an input driver from configuration.
pub fn build(conf: &InputConfig, metrics: &SharedMetrics) -> Result<Box<dyn Input>, Error> {
    match conf {
        InputConfig::Tcp(tcp) => Ok(Box::new(TcpInput::new(tcp, metrics)?)),
        InputConfig::File(file) => Ok(Box::new(FileInput::new(file, metrics))),
        InputConfig::Stdin => Ok(Box::new(StdinInput::new(metrics))),
    }
}

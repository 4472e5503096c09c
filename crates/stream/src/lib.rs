//! Weir - Streams
//!
//! A stream is one end-to-end dataflow: input → input pipelines → buffer →
//! processors → output pipelines → output, wired over capacity-1
//! transaction channels in that order. This crate assembles streams from
//! their configuration plus constructor hooks, and owns the graceful-stop
//! protocol: close the input, wait for each stage's close in wiring order
//! under a shared timeout budget, escalate to forced shutdown on overrun.

mod config;
mod stream;

pub use config::{PipelineConfig, StreamConfig, SCRUBBED_PLACEHOLDER};
pub use stream::{Hooks, PipelineConstructor, ProcessorConstructor, Stream};

//! Weir - Processors
//!
//! The built-in message transforms a pipeline chain is assembled from,
//! their serde-tagged configuration, and the conditions the filter
//! processor evaluates. Processors implement [`weir_core::Processor`]:
//! pure transforms returning zero or more messages plus an optional
//! short-circuit response.

pub mod condition;

mod compress;
mod config;
mod dedupe;
mod filter;
mod noop;

pub use compress::{Compress, CompressAlgorithm, CompressConfig};
pub use config::ProcessorConfig;
pub use dedupe::{Dedupe, DedupeConfig};
pub use filter::{Filter, FilterConfig};
pub use noop::Noop;

use std::sync::Arc;

use weir_core::{Error, Processor, Resources};
use weir_metrics::SharedMetrics;

/// Build a processor from configuration, resolving any named resources
/// it depends on.
pub fn build(
    conf: &ProcessorConfig,
    resources: &Resources,
    metrics: &SharedMetrics,
) -> Result<Arc<dyn Processor>, Error> {
    match conf {
        ProcessorConfig::Noop => Ok(Arc::new(Noop)),
        ProcessorConfig::Filter(filter) => Ok(Arc::new(Filter::new(filter, metrics)?)),
        ProcessorConfig::Compress(compress) => Ok(Arc::new(Compress::new(compress, metrics)?)),
        ProcessorConfig::Dedupe(dedupe) => Ok(Arc::new(Dedupe::new(dedupe, resources, metrics)?)),
    }
}

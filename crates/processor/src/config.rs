//! Processor configuration

use serde::{Deserialize, Serialize};

use crate::{CompressConfig, DedupeConfig, FilterConfig};

/// Processor selection within a pipeline chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorConfig {
    /// Pass messages through unchanged.
    Noop,

    /// Drop messages failing a condition.
    Filter(FilterConfig),

    /// Compress selected message parts.
    Compress(CompressConfig),

    /// Drop messages already seen by a cache resource.
    Dedupe(DedupeConfig),
}

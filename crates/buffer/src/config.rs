//! Buffer configuration

use serde::{Deserialize, Serialize};

use crate::memory::DEFAULT_LIMIT_BYTES;

/// Buffer selection for a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BufferConfig {
    /// Byte-limited in-memory FIFO.
    Memory(MemoryBufferConfig),
}

/// Memory buffer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryBufferConfig {
    /// Maximum payload bytes held before pushes wait.
    pub limit: usize,
}

impl Default for MemoryBufferConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT_BYTES,
        }
    }
}

//! Weir - Buffer stage
//!
//! Decouples a producer's rate from a consumer's by parking messages in a
//! pluggable [`MessageStore`]. The [`StackBuffer`] stage runs two
//! cooperating loops:
//!
//! - the **input loop** pushes each incoming payload into the store and
//!   acknowledges the producer with the push result (push failures are not
//!   fatal; the producer decides whether to retry)
//! - the **output loop** re-reads the oldest unacknowledged message and
//!   forwards it downstream until it is acknowledged, only then shifting
//!   it out of the store
//!
//! Corrupt records are the one place a message can silently leave the
//! stream: the output loop shifts past them, deduplicates the error by
//! value and offers a summary on a bounded error channel without blocking.
//!
//! # Shutdown ordering
//!
//! Closing the upstream channel ends the input loop, which closes the
//! store; the store drains remaining reads and then reports
//! [`StoreError::Closed`], ending the output loop, which drops the
//! downstream channel. The buffer reports closed only after both loops
//! have returned.

mod config;
mod memory;
mod stack;
mod store;

pub use config::{BufferConfig, MemoryBufferConfig};
pub use memory::MemoryStore;
pub use stack::StackBuffer;
pub use store::{MessageStore, StoreError};

use weir_metrics::SharedMetrics;

/// Build a buffer stage from configuration.
pub fn build(conf: &BufferConfig, metrics: &SharedMetrics) -> StackBuffer {
    match conf {
        BufferConfig::Memory(mem) => {
            StackBuffer::new(std::sync::Arc::new(MemoryStore::new(mem.limit)), metrics)
        }
    }
}

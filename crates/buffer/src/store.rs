//! The message store contract

use async_trait::async_trait;
use thiserror::Error;

use weir_message::{DataflowError, Message};

/// Message store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store no longer accepts operations; terminal for readers once
    /// drained.
    #[error("message store closed")]
    Closed,

    /// A single record failed to read back; the store itself is assumed
    /// intact and the caller may shift past the record.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for DataflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Closed => DataflowError::Store("store closed".to_owned()),
            StoreError::Corrupt(reason) => DataflowError::Corrupt(reason),
        }
    }
}

/// FIFO message storage backing a buffer stage.
///
/// Implementations must be safe for one concurrent producer and one
/// concurrent consumer. Pushes are acknowledged in FIFO order with respect
/// to a single producer; reads are FIFO until [`MessageStore::shift`]
/// advances the head.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message, waiting for room, and return the new backlog.
    async fn push(&self, msg: Message) -> Result<usize, StoreError>;

    /// Peek the oldest unacknowledged message, waiting while the store is
    /// empty and open. Returns [`StoreError::Closed`] once the store is
    /// closed and drained, or [`StoreError::Corrupt`] for an item-local
    /// read failure.
    async fn next(&self) -> Result<Message, StoreError>;

    /// Drop the oldest message (after its delivery was acknowledged) and
    /// return the new backlog.
    fn shift(&self) -> Result<usize, StoreError>;

    /// Stop accepting writes. Reads may drain what is already stored.
    fn close(&self);

    /// Current number of unacknowledged messages.
    fn backlog(&self) -> usize;
}

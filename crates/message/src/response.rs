//! Transaction responses and dataflow errors
//!
//! A response is the one-shot acknowledgement answered for every
//! transaction: `Ack` when the message reached (or was intentionally
//! dropped by) the downstream stage, `Nack` when it must be retried.
//! Dataflow errors travel as values inside responses, never as panics.

use thiserror::Error;

/// A transient message-plane failure carried inside a [`Response`].
///
/// These errors are retryable by the upstream stage: the fan-out broker
/// retries the failing branch, the buffer re-sends the unshifted message.
/// `Clone + Eq + Hash` so the buffer can dedupe repeated failures by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum DataflowError {
    /// The message store rejected a push.
    #[error("message store rejected push: {0}")]
    Store(String),

    /// A stored record failed to read back.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// An output failed to deliver the message.
    #[error("output failed: {0}")]
    Output(String),

    /// A processor failed while transforming the message.
    #[error("processor failed: {0}")]
    Processor(String),

    /// The downstream stage is shutting down.
    #[error("stage closing")]
    Closing,
}

impl DataflowError {
    /// An output delivery failure.
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// A processor failure.
    pub fn processor(msg: impl Into<String>) -> Self {
        Self::Processor(msg.into())
    }
}

/// One-shot acknowledgement for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The message was accepted, or intentionally dropped.
    Ack,
    /// The message was rejected; upstream should retry.
    Nack(DataflowError),
}

impl Response {
    /// Build a response from an optional error, the common constructor at
    /// the end of a stage's handling path.
    pub fn from_error(err: Option<DataflowError>) -> Self {
        match err {
            None => Self::Ack,
            Some(e) => Self::Nack(e),
        }
    }

    /// Build a response from a result.
    pub fn from_result(res: Result<(), DataflowError>) -> Self {
        Self::from_error(res.err())
    }

    /// True when this response acknowledges delivery.
    #[inline]
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    /// The carried error, if any.
    pub fn error(&self) -> Option<&DataflowError> {
        match self {
            Self::Ack => None,
            Self::Nack(e) => Some(e),
        }
    }
}

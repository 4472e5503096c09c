//! Lifecycle and wiring error sentinels

use thiserror::Error;

/// Errors shared across stage lifecycles and component construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An input channel was bound after the stage already started.
    #[error("type already started")]
    AlreadyStarted,

    /// The operation targeted a component that was previously closed.
    #[error("type was previously closed")]
    Closed,

    /// A close or shutdown deadline elapsed; the component may still be
    /// running.
    #[error("action timed out")]
    Timeout,

    /// A component could not be built from its configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// A configuration/wiring failure.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

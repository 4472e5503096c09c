//! Manager error sentinels

use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// `create` targeted an id that is already registered.
    #[error("stream already exists")]
    StreamExists,

    /// The operation targeted an id that is not registered.
    #[error("stream does not exist")]
    StreamDoesNotExist,

    /// The manager was stopped; no further mutations are accepted.
    #[error("manager was stopped")]
    Closed,

    /// A component-level failure: wiring errors on create, timeouts on
    /// shutdown.
    #[error(transparent)]
    Component(#[from] weir_core::Error),
}

impl ManagerError {
    /// True when this is a shutdown-deadline overrun.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Component(weir_core::Error::Timeout))
    }
}

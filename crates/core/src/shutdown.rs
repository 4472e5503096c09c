//! Cooperative shutdown signalling
//!
//! Each stateful component owns one [`ShutdownSignal`]: a broadcast cancel
//! token its loops multiplex every suspension against, and a done token the
//! supervisor task fires once all loops have returned. Cancellation is
//! idempotent; waiting is bounded.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::Error;

/// Paired cancel/done tokens for one component.
///
/// Clones share the same underlying tokens, so a loop task can carry the
/// signal while the component handle keeps another clone for `close_async`
/// / `wait_for_close`.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    cancel: CancellationToken,
    done: CancellationToken,
}

impl ShutdownSignal {
    /// A fresh signal in the initializing state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent and non-blocking.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when shutdown is requested. Loops multiplex this against
    /// every channel send and receive.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Mark the component closed: all loops have returned and outgoing
    /// channels are dropped. Fired by the supervisor task, exactly once.
    pub fn mark_done(&self) {
        self.done.cancel();
    }

    /// True once the component has fully closed.
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Wait up to `timeout` for the component to close.
    pub async fn wait_done(&self, timeout: Duration) -> Result<(), Error> {
        tokio::time::timeout(timeout, self.done.cancelled())
            .await
            .map_err(|_| Error::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel();
        signal.cancel();
        assert!(signal.is_cancelled());
        signal.cancelled().await;
    }

    #[tokio::test]
    async fn test_wait_done_times_out() {
        let signal = ShutdownSignal::new();
        let res = signal.wait_done(Duration::from_millis(20)).await;
        assert_eq!(res, Err(Error::Timeout));
    }

    #[tokio::test]
    async fn test_wait_done_returns_after_mark() {
        let signal = ShutdownSignal::new();
        let task_signal = signal.clone();
        tokio::spawn(async move {
            task_signal.cancelled().await;
            task_signal.mark_done();
        });

        signal.cancel();
        signal.wait_done(Duration::from_secs(1)).await.unwrap();
        assert!(signal.is_done());
    }
}

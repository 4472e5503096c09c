//! Cancellable exponential-backoff gate
//!
//! Retry loops call [`Throttle::retry`] between attempts instead of
//! busy-spinning on a persistently failing branch. The wait doubles on each
//! consecutive call since the last [`Throttle::reset`], up to a cap, and is
//! multiplexed with the owning component's cancel signal so shutdown is
//! never delayed by a sleeping retry.

use std::time::Duration;

use crate::ShutdownSignal;

/// Default first backoff interval.
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(50);

/// Default backoff ceiling.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(1);

/// Exponential-backoff gate bound to a cancel signal.
#[derive(Debug)]
pub struct Throttle {
    base: Duration,
    cap: Duration,
    current: Duration,
    shutdown: ShutdownSignal,
}

impl Throttle {
    /// A throttle with default base and cap, watching `shutdown`.
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self::with_intervals(shutdown, DEFAULT_BASE_INTERVAL, DEFAULT_MAX_INTERVAL)
    }

    /// A throttle with explicit base and cap intervals.
    pub fn with_intervals(shutdown: ShutdownSignal, base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            current: base,
            shutdown,
        }
    }

    /// Sleep the current backoff interval, doubling it for next time.
    ///
    /// Returns `false` when cancellation fired during the sleep; callers
    /// must treat that as shutdown, never as permanent failure of the
    /// retried operation.
    pub async fn retry(&mut self) -> bool {
        let interval = self.current;
        self.current = (self.current * 2).min(self.cap);

        tokio::select! {
            _ = tokio::time::sleep(interval) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }

    /// Return the interval to base after a success.
    pub fn reset(&mut self) {
        self.current = self.base;
    }

    /// The interval the next `retry` call will sleep.
    pub fn current_interval(&self) -> Duration {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_doubles_to_cap() {
        let mut throttle = Throttle::with_intervals(
            ShutdownSignal::new(),
            Duration::from_millis(10),
            Duration::from_millis(40),
        );

        assert_eq!(throttle.current_interval(), Duration::from_millis(10));
        assert!(throttle.retry().await);
        assert_eq!(throttle.current_interval(), Duration::from_millis(20));
        assert!(throttle.retry().await);
        assert_eq!(throttle.current_interval(), Duration::from_millis(40));
        assert!(throttle.retry().await);
        // Capped.
        assert_eq!(throttle.current_interval(), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_base() {
        let mut throttle = Throttle::with_intervals(
            ShutdownSignal::new(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );

        assert!(throttle.retry().await);
        assert!(throttle.retry().await);
        throttle.reset();
        assert_eq!(throttle.current_interval(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_cancel_unblocks_retry() {
        let shutdown = ShutdownSignal::new();
        let mut throttle =
            Throttle::with_intervals(shutdown.clone(), Duration::from_secs(60), Duration::from_secs(60));

        let handle = tokio::spawn(async move { throttle.retry().await });
        shutdown.cancel();

        let retried = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("retry did not unblock on cancel")
            .unwrap();
        assert!(!retried);
    }
}

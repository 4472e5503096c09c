//! Metric handles
//!
//! All handles are `Arc`-backed atomics: cloning shares the underlying
//! cell, updates are lock-free with relaxed ordering (counts, not
//! synchronisation).

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing counter.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    /// A fresh counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` to the counter.
    #[inline]
    pub fn incr(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Current count.
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Last-value gauge.
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    value: Arc<AtomicI64>,
}

impl Gauge {
    /// A fresh gauge at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gauge to `v`.
    #[inline]
    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Duration aggregator: count, total and max in nanoseconds.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    count: Arc<AtomicU64>,
    total_ns: Arc<AtomicU64>,
    max_ns: Arc<AtomicU64>,
}

impl Timer {
    /// A fresh timer with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample of `ns` nanoseconds.
    pub fn timing(&self, ns: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    /// Aggregate view of recorded samples.
    pub fn summary(&self) -> TimerSummary {
        TimerSummary {
            count: self.count.load(Ordering::Relaxed),
            total_ns: self.total_ns.load(Ordering::Relaxed),
            max_ns: self.max_ns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time timer aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TimerSummary {
    pub count: u64,
    pub total_ns: u64,
    pub max_ns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_clones_share_state() {
        let counter = Counter::new();
        let clone = counter.clone();
        counter.incr(2);
        clone.incr(3);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_gauge_keeps_last_value() {
        let gauge = Gauge::new();
        gauge.set(10);
        gauge.set(-3);
        assert_eq!(gauge.get(), -3);
    }

    #[test]
    fn test_timer_aggregates() {
        let timer = Timer::new();
        timer.timing(100);
        timer.timing(400);
        timer.timing(200);

        let summary = timer.summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total_ns, 700);
        assert_eq!(summary.max_ns, 400);
    }
}

//! Weir - Metrics
//!
//! Components observe themselves through opaque [`Counter`], [`Gauge`] and
//! [`Timer`] handles obtained by dotted-path name from a [`Metrics`]
//! provider. Handles are cheap atomic clones, resolved once at component
//! construction and updated lock-free on the hot path.
//!
//! # Implementations
//!
//! - [`Registry`] — in-memory aggregation with a serialisable
//!   [`Snapshot`], served by the service's `/metrics` endpoint
//! - [`Noop`] — disconnected handles for tests and benchmarks
//!
//! # Example
//!
//! ```
//! use weir_metrics::{Metrics, Registry};
//!
//! let registry = Registry::new();
//! let received = registry.counter("broker.fan_out.messages.received");
//! received.incr(1);
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.counters["broker.fan_out.messages.received"], 1);
//! ```

mod handles;
mod registry;

pub use handles::{Counter, Gauge, Timer, TimerSummary};
pub use registry::{Noop, Registry, Snapshot};

use std::sync::Arc;

/// Provider of named metric handles.
pub trait Metrics: Send + Sync {
    /// A monotonically increasing counter at `path`.
    fn counter(&self, path: &str) -> Counter;

    /// A last-value gauge at `path`.
    fn gauge(&self, path: &str) -> Gauge;

    /// A duration aggregator at `path`.
    fn timer(&self, path: &str) -> Timer;
}

/// Shared handle to a metrics provider, passed down to every component.
pub type SharedMetrics = Arc<dyn Metrics>;

/// A provider whose handles go nowhere, for tests.
pub fn noop() -> SharedMetrics {
    Arc::new(Noop)
}

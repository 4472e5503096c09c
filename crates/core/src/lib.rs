//! Weir - Core contracts
//!
//! The traits and utilities every dataflow stage builds on:
//!
//! - [`Closable`], [`Input`], [`Output`] and [`Pipeline`] — the stage
//!   contracts transactions flow across
//! - [`Processor`], [`Condition`] and [`Cache`] — collaborator contracts
//!   consumed by the pipeline layer
//! - [`Resources`] — named shared resources (caches) components resolve
//!   at construction
//! - [`ShutdownSignal`] — broadcast cancel plus close-done signalling
//! - [`Throttle`] — cancellable exponential-backoff gate for retry loops
//!
//! # Lifecycle
//!
//! Stateful stages move one-way through initializing (channels wired),
//! running (loop active) and closed (loop returned, outgoing channels
//! dropped, done signal fired). `close_async` is idempotent and
//! non-blocking; `wait_for_close` bounds the wait and reports
//! [`Error::Timeout`] on overrun.

mod cache;
mod component;
mod condition;
mod error;
mod processor;
mod resources;
mod shutdown;
mod throttle;

pub use cache::{Cache, CacheError, MemoryCache};
pub use component::{Closable, Input, Output, Pipeline};
pub use condition::Condition;
pub use error::Error;
pub use processor::Processor;
pub use resources::Resources;
pub use shutdown::ShutdownSignal;
pub use throttle::Throttle;

/// Capacity of inter-stage transaction channels. One slot gives
/// rendezvous hand-off: a producer blocks until the consumer takes the
/// transaction.
pub const TRANSACTION_CHANNEL_CAPACITY: usize = 1;

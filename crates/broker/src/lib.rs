//! Weir - Output brokers
//!
//! Brokers compose a list of child outputs behind the single [`Output`]
//! face a stream expects:
//!
//! - [`FanOut`] broadcasts every transaction to all children, retrying
//!   failed branches individually and acknowledging upstream only once
//!   every branch has accepted
//! - [`RoundRobin`] rotates transactions across children, forwarding each
//!   branch's response upstream unchanged
//!
//! Each child gets a private capacity-1 transaction channel; dropping the
//! channels on loop exit is the end-of-stream signal children shut down
//! on.
//!
//! [`Output`]: weir_core::Output

mod fan_out;
mod round_robin;

pub use fan_out::FanOut;
pub use round_robin::RoundRobin;

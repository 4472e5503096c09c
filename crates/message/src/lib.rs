//! Weir - Message plane primitives
//!
//! The envelope types passed between dataflow stages: [`Message`] (ordered
//! parts of bytes plus metadata), [`Response`] (one-shot ack/nack) and
//! [`Transaction`] (a message paired with the one-shot sink its response
//! must be delivered on).
//!
//! # Delivery contract
//!
//! Every stage that accepts a transaction must answer it exactly once. The
//! response sink is a `tokio::sync::oneshot` sender: single writer, single
//! reader, capacity one, never closed by the writer. The consuming APIs on
//! [`Transaction`] and [`ResponseSender`] make a double response
//! unrepresentable; a dropped sink is observed upstream as a receive error
//! and must be treated as delivery failure.
//!
//! # Shallow copies
//!
//! Messages are semantically immutable once handed downstream. A stage that
//! publishes to more than one downstream path takes a shallow copy first:
//! the parts vector is copied while the underlying byte buffers are shared
//! (`bytes::Bytes`), and metadata maps are copy-on-write behind an `Arc`.

mod message;
mod response;
mod transaction;

pub use message::{Message, Part};
pub use response::{DataflowError, Response};
pub use transaction::{ResponseReceiver, ResponseSender, Transaction};

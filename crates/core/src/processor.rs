//! The processor contract

use weir_message::{Message, Response};

/// A message transform applied between stages.
///
/// Processors are pure with respect to the dataflow: they must not retain
/// messages across calls. The return value drives the pipeline stage:
///
/// - a non-empty vector forwards each message downstream as its own
///   transaction; upstream is acknowledged only once all of them are
/// - an empty vector drops the message and short-circuits with the
///   returned response (`Response::Ack` marks an intentional drop)
pub trait Processor: Send + Sync {
    /// Transform one message into zero or more messages.
    fn process(&self, msg: Message) -> (Vec<Message>, Option<Response>);
}

//! Pass-through processor

use weir_core::Processor;
use weir_message::{Message, Response};

/// Forwards every message unchanged. The identity of a pipeline chain.
pub struct Noop;

impl Processor for Noop {
    fn process(&self, msg: Message) -> (Vec<Message>, Option<Response>) {
        (vec![msg], None)
    }
}

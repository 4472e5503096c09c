//! The condition contract

use weir_message::Message;

/// A side-effect-free predicate over a message, used by filtering
/// processors.
pub trait Condition: Send + Sync {
    /// Test the message against the configured condition.
    fn check(&self, msg: &Message) -> bool;
}

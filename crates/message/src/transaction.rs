//! The transaction envelope
//!
//! A transaction pairs a message with the one-shot sink its response must
//! be delivered on. Producers build one with [`Transaction::channel`], send
//! it downstream and await exactly one [`Response`] on the returned
//! receiver. Consumers either answer in place with [`Transaction::respond`]
//! or split the envelope to forward the payload while keeping the
//! [`ResponseSender`] for later.

use tokio::sync::oneshot;

use crate::{Message, Response};

/// Receiver half of a transaction's response sink.
///
/// Resolves to `Err` when the consuming stage terminated without
/// answering; upstream must treat that as delivery failure.
pub type ResponseReceiver = oneshot::Receiver<Response>;

/// A message travelling between stages together with its response sink.
#[derive(Debug)]
pub struct Transaction {
    payload: Message,
    response: oneshot::Sender<Response>,
}

impl Transaction {
    /// Wrap a message and an existing response sink.
    pub fn new(payload: Message, response: oneshot::Sender<Response>) -> Self {
        Self { payload, response }
    }

    /// Build a transaction and the receiver its response will arrive on.
    pub fn channel(payload: Message) -> (Self, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        (Self::new(payload, tx), rx)
    }

    /// The carried message.
    #[inline]
    pub fn payload(&self) -> &Message {
        &self.payload
    }

    /// Split into the payload and the sender used to answer later.
    pub fn split(self) -> (Message, ResponseSender) {
        (self.payload, ResponseSender(self.response))
    }

    /// Answer the transaction, consuming it.
    pub fn respond(self, response: Response) {
        ResponseSender(self.response).send(response);
    }

    /// Acknowledge the transaction, consuming it.
    pub fn ack(self) {
        self.respond(Response::Ack);
    }
}

/// Write-once handle for answering a transaction after its payload has
/// been forwarded.
#[derive(Debug)]
pub struct ResponseSender(oneshot::Sender<Response>);

impl ResponseSender {
    /// Deliver the response. A reader that has gone away simply discards
    /// it; the sink is never closed from this side.
    pub fn send(self, response: Response) {
        let _ = self.0.send(response);
    }

    /// Shorthand for [`Response::Ack`].
    pub fn ack(self) {
        self.send(Response::Ack);
    }

    /// Shorthand for a nack carrying `err`.
    pub fn nack(self, err: crate::DataflowError) {
        self.send(Response::Nack(err));
    }
}

//! Stage traits
//!
//! Transactions flow from an [`Input`] through zero or more [`Pipeline`]
//! stages into an [`Output`]. Channels are `tokio::sync::mpsc` with
//! capacity one, so hand-off is a rendezvous: the sender parks until the
//! receiver accepts the transaction. A stage signals end-of-stream by
//! dropping its outgoing sender.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use weir_message::Transaction;

use crate::Error;

/// A component that can be shut down and waited on.
#[async_trait]
pub trait Closable: Send + Sync {
    /// Trigger closure without blocking. Idempotent.
    fn close_async(&self);

    /// Block up to `timeout` for the component to finish closing.
    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error>;
}

/// A transaction producer: the head of a stream.
///
/// The receiver is handed over exactly once; asking again returns
/// [`Error::AlreadyStarted`].
pub trait Input: Closable {
    /// Take the channel transactions are consumed from.
    fn transactions(&mut self) -> Result<mpsc::Receiver<Transaction>, Error>;
}

/// A transaction consumer: the tail of a stream.
pub trait Output: Closable {
    /// Bind the channel this output reads transactions from and start its
    /// loop. Rebinding returns [`Error::AlreadyStarted`].
    fn start_receiving(&mut self, transactions: mpsc::Receiver<Transaction>) -> Result<(), Error>;
}

/// An intermediate stage: consumes transactions upstream, produces derived
/// transactions downstream.
pub trait Pipeline: Closable {
    /// Bind the upstream channel and start the stage loop.
    fn start_receiving(&mut self, transactions: mpsc::Receiver<Transaction>) -> Result<(), Error>;

    /// Take the downstream channel. Handed over exactly once.
    fn transactions(&mut self) -> Result<mpsc::Receiver<Transaction>, Error>;
}

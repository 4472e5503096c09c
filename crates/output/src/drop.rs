//! Drop output

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use weir_core::{Closable, Error, Output, ShutdownSignal};
use weir_message::Transaction;
use weir_metrics::{Counter, SharedMetrics};

/// Acknowledges and discards every transaction. Useful for measuring a
/// pipeline without delivery overhead and for wiring tests.
pub struct DropOutput {
    shutdown: ShutdownSignal,
    started: bool,
    received: Counter,
}

impl DropOutput {
    /// A fresh drop output.
    pub fn new(metrics: &SharedMetrics) -> Self {
        Self {
            shutdown: ShutdownSignal::new(),
            started: false,
            received: metrics.counter("output.drop.messages.received"),
        }
    }
}

impl Output for DropOutput {
    fn start_receiving(&mut self, mut transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.started = true;

        let shutdown = self.shutdown.clone();
        let received = self.received.clone();
        tokio::spawn(async move {
            loop {
                let transaction = tokio::select! {
                    t = transactions.recv() => match t {
                        Some(t) => t,
                        None => break,
                    },
                    _ = shutdown.cancelled() => break,
                };
                received.incr(1);
                transaction.ack();
            }
            debug!("drop output finished");
            shutdown.mark_done();
        });
        Ok(())
    }
}

#[async_trait]
impl Closable for DropOutput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;
    use weir_message::{Message, Response};
    use weir_metrics::Registry;

    #[tokio::test]
    async fn test_acks_everything_then_closes_on_eos() {
        let registry = Arc::new(Registry::new());
        let metrics: weir_metrics::SharedMetrics = registry.clone();
        let mut output = DropOutput::new(&metrics);

        let (tx, rx) = mpsc::channel(1);
        output.start_receiving(rx).unwrap();
        assert!(matches!(
            output.start_receiving(mpsc::channel(1).1),
            Err(Error::AlreadyStarted)
        ));

        for _ in 0..3 {
            let (transaction, response) =
                Transaction::channel(Message::from_payloads([Bytes::from_static(b"x")]));
            tx.send(transaction).await.unwrap();
            assert_eq!(response.await.unwrap(), Response::Ack);
        }

        drop(tx);
        output.wait_for_close(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            registry.snapshot().counters["output.drop.messages.received"],
            3
        );
    }
}

//! Round-robin broker
//!
//! Rotates incoming transactions across child outputs, one branch per
//! transaction. The branch response is forwarded upstream unchanged: the
//! producer, not the broker, decides whether to retry a rejected message.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use weir_core::{Closable, Error, Output, ShutdownSignal, TRANSACTION_CHANNEL_CAPACITY};
use weir_message::{DataflowError, Response, Transaction};
use weir_metrics::{Counter, SharedMetrics};

/// Broker rotating transactions across child outputs.
pub struct RoundRobin {
    outputs: Vec<Box<dyn Output>>,
    out_txs: Option<Vec<mpsc::Sender<Transaction>>>,
    shutdown: ShutdownSignal,

    received: Counter,
    sent: Counter,
}

impl RoundRobin {
    /// Wire a broker over `outputs`, starting each child on its private
    /// channel.
    pub fn new(mut outputs: Vec<Box<dyn Output>>, metrics: &SharedMetrics) -> Result<Self, Error> {
        if outputs.is_empty() {
            return Err(Error::config("round_robin requires at least one output"));
        }

        let mut out_txs = Vec::with_capacity(outputs.len());
        for output in outputs.iter_mut() {
            let (tx, rx) = mpsc::channel(TRANSACTION_CHANNEL_CAPACITY);
            output.start_receiving(rx)?;
            out_txs.push(tx);
        }

        Ok(Self {
            outputs,
            out_txs: Some(out_txs),
            shutdown: ShutdownSignal::new(),
            received: metrics.counter("broker.round_robin.messages.received"),
            sent: metrics.counter("broker.round_robin.messages.sent"),
        })
    }

    async fn run(
        mut transactions: mpsc::Receiver<Transaction>,
        out_txs: Vec<mpsc::Sender<Transaction>>,
        shutdown: ShutdownSignal,
        received: Counter,
        sent: Counter,
    ) {
        let mut cursor = 0usize;

        'main: loop {
            let transaction = tokio::select! {
                t = transactions.recv() => match t {
                    Some(t) => t,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            };
            received.incr(1);
            let (payload, responder) = transaction.split();

            let index = cursor;
            cursor = (cursor + 1) % out_txs.len();

            let (branch, branch_rx) = Transaction::channel(payload);
            tokio::select! {
                delivered = out_txs[index].send(branch) => {
                    if delivered.is_err() {
                        break 'main;
                    }
                }
                _ = shutdown.cancelled() => break 'main,
            }

            let response = tokio::select! {
                r = branch_rx => r,
                _ = shutdown.cancelled() => break 'main,
            };
            match response {
                Ok(response) => {
                    if response.is_ack() {
                        sent.incr(1);
                    }
                    responder.send(response);
                }
                Err(_) => responder.nack(DataflowError::Closing),
            }
        }
        debug!("round robin broker finished");
    }
}

impl Output for RoundRobin {
    fn start_receiving(&mut self, transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let out_txs = self.out_txs.take().ok_or(Error::AlreadyStarted)?;

        let loop_fut = Self::run(
            transactions,
            out_txs,
            self.shutdown.clone(),
            self.received.clone(),
            self.sent.clone(),
        );
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop_fut.await;
            shutdown.mark_done();
        });
        Ok(())
    }
}

#[async_trait]
impl Closable for RoundRobin {
    fn close_async(&self) {
        self.shutdown.cancel();
        for output in &self.outputs {
            output.close_async();
        }
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + timeout;
        self.shutdown.wait_done(timeout).await?;
        for output in &self.outputs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            output.wait_for_close(remaining).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "round_robin_test.rs"]
mod round_robin_test;

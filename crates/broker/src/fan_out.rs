//! Fan-out broker
//!
//! Broadcasts each incoming transaction to every child output. Branches
//! fail and retry independently: a branch that acknowledged is never sent
//! the same message again, a failing branch is retried behind the backoff
//! throttle. Upstream is acknowledged exactly once, after all branches
//! accepted, which gives at-least-once fan-out with idempotence left to
//! the receiving sinks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error};

use weir_core::{
    Closable, Error, Output, ShutdownSignal, Throttle, TRANSACTION_CHANNEL_CAPACITY,
};
use weir_message::{Response, ResponseReceiver, Transaction};
use weir_metrics::{Counter, SharedMetrics};

/// Broker broadcasting transactions to every child output.
pub struct FanOut {
    outputs: Vec<Box<dyn Output>>,
    out_txs: Option<Vec<mpsc::Sender<Transaction>>>,
    shutdown: ShutdownSignal,

    received: Counter,
    sent: Counter,
    output_error: Counter,
}

impl FanOut {
    /// Wire a broker over `outputs`, starting each child on its private
    /// channel.
    pub fn new(mut outputs: Vec<Box<dyn Output>>, metrics: &SharedMetrics) -> Result<Self, Error> {
        if outputs.is_empty() {
            return Err(Error::config("fan_out requires at least one output"));
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
            received: metrics.counter("broker.fan_out.messages.received"),
            sent: metrics.counter("broker.fan_out.messages.sent"),
            output_error: metrics.counter("broker.fan_out.output.error"),
        })
    }

    async fn run(
        mut transactions: mpsc::Receiver<Transaction>,
        out_txs: Vec<mpsc::Sender<Transaction>>,
        shutdown: ShutdownSignal,
        received: Counter,
        sent: Counter,
        output_error: Counter,
    ) {
        let mut throttle = Throttle::new(shutdown.clone());

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

            let mut targets: Vec<usize> = (0..out_txs.len()).collect();
            while !targets.is_empty() {
                // Dispatch: every remaining target gets its own shallow
                // copy, branches run in parallel and must not share parts.
                let mut pending: Vec<(usize, ResponseReceiver)> = Vec::with_capacity(targets.len());
                for &index in &targets {
                    let (branch, branch_rx) = Transaction::channel(payload.shallow_copy());
                    tokio::select! {
                        delivered = out_txs[index].send(branch) => {
                            if delivered.is_err() {
                                break 'main;
                            }
                        }
                        _ = shutdown.cancelled() => break 'main,
                    }
                    pending.push((index, branch_rx));
                }

                // Collect: drop targets that acknowledged, keep the rest
                // for the next round.
                let mut failed = Vec::new();
                for (index, branch_rx) in pending {
                    let response = tokio::select! {
                        r = branch_rx => r,
                        _ = shutdown.cancelled() => break 'main,
                    };
                    match response {
                        Ok(Response::Ack) => {
                            throttle.reset();
                            sent.incr(1);
                        }
                        Ok(Response::Nack(err)) => {
                            error!(output = index, error = %err, "failed to dispatch fan out message");
                            output_error.incr(1);
                            failed.push(index);
                            if !throttle.retry().await {
                                break 'main;
                            }
                        }
                        Err(_) => {
                            error!(output = index, "output terminated without responding");
                            output_error.incr(1);
                            failed.push(index);
                            if !throttle.retry().await {
                                break 'main;
                            }
                        }
                    }
                }
                targets = failed;
            }

            responder.ack();
        }
        // Exiting without an upstream ack leaves the response sink
        // dropped; the producer observes that as failure.
        debug!("fan out broker finished");
    }
}

impl Output for FanOut {
    fn start_receiving(&mut self, transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let out_txs = self.out_txs.take().ok_or(Error::AlreadyStarted)?;

        let loop_fut = Self::run(
            transactions,
            out_txs,
            self.shutdown.clone(),
            self.received.clone(),
            self.sent.clone(),
            self.output_error.clone(),
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
impl Closable for FanOut {
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
#[path = "fan_out_test.rs"]
mod fan_out_test;

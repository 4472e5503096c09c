//! The buffering stage
//!
//! See the crate docs for the loop design and shutdown ordering.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use weir_core::{Closable, Error, Pipeline, ShutdownSignal, TRANSACTION_CHANNEL_CAPACITY};
use weir_message::{DataflowError, Message, Response, Transaction};
use weir_metrics::{Counter, Gauge, SharedMetrics};

use crate::{MessageStore, StoreError};

/// Capacity of the best-effort error summary channel.
const ERROR_CHANNEL_CAPACITY: usize = 1;

/// Buffer stage wrapping a [`MessageStore`].
pub struct StackBuffer {
    store: Arc<dyn MessageStore>,
    shutdown: ShutdownSignal,

    out_tx: Option<mpsc::Sender<Transaction>>,
    out_rx: Option<mpsc::Receiver<Transaction>>,
    errors_tx: Option<mpsc::Sender<Vec<DataflowError>>>,
    errors_rx: Option<mpsc::Receiver<Vec<DataflowError>>>,

    backlog: Gauge,
    corrupt_dropped: Counter,
}

impl StackBuffer {
    /// Wrap `store` in a buffering stage.
    pub fn new(store: Arc<dyn MessageStore>, metrics: &SharedMetrics) -> Self {
        let (out_tx, out_rx) = mpsc::channel(TRANSACTION_CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        Self {
            store,
            shutdown: ShutdownSignal::new(),
            out_tx: Some(out_tx),
            out_rx: Some(out_rx),
            errors_tx: Some(errors_tx),
            errors_rx: Some(errors_rx),
            backlog: metrics.gauge("buffer.backlog"),
            corrupt_dropped: metrics.counter("buffer.corrupt.dropped"),
        }
    }

    /// Take the channel corrupt-record and delivery-error summaries are
    /// offered on. Sends never block; summaries are dropped when the
    /// reader is not keeping up.
    pub fn errors(&mut self) -> Result<mpsc::Receiver<Vec<DataflowError>>, Error> {
        self.errors_rx.take().ok_or(Error::AlreadyStarted)
    }

    async fn input_loop(
        store: Arc<dyn MessageStore>,
        shutdown: ShutdownSignal,
        mut transactions: mpsc::Receiver<Transaction>,
        backlog: Gauge,
    ) {
        loop {
            let transaction = tokio::select! {
                t = transactions.recv() => match t {
                    Some(t) => t,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            };
            let (msg, responder) = transaction.split();

            let pushed = tokio::select! {
                res = store.push(msg) => res,
                _ = shutdown.cancelled() => {
                    responder.nack(DataflowError::Closing);
                    break;
                }
            };
            match pushed {
                Ok(size) => {
                    backlog.set(size as i64);
                    responder.ack();
                }
                // Not fatal: the producer decides whether to retry.
                Err(err) => responder.nack(err.into()),
            }
        }
        store.close();
    }

    async fn output_loop(
        store: Arc<dyn MessageStore>,
        shutdown: ShutdownSignal,
        out_tx: mpsc::Sender<Transaction>,
        errors_tx: mpsc::Sender<Vec<DataflowError>>,
        backlog: Gauge,
        corrupt_dropped: Counter,
    ) {
        let mut slot: Option<Message> = None;
        let mut errs: Vec<DataflowError> = Vec::new();
        let mut seen: HashSet<DataflowError> = HashSet::new();

        loop {
            if slot.is_none() {
                let next = tokio::select! {
                    n = store.next() => n,
                    _ = shutdown.cancelled() => break,
                };
                match next {
                    Ok(msg) => slot = Some(msg),
                    Err(StoreError::Closed) => break,
                    Err(err @ StoreError::Corrupt(_)) => {
                        // Item-local corruption: shift past the record and
                        // read again. This is the only path through which
                        // a message leaves the stream unacknowledged.
                        let _ = store.shift();
                        corrupt_dropped.incr(1);
                        warn!(error = %err, "dropped corrupt record from buffer");
                        let err = DataflowError::from(err);
                        if seen.insert(err.clone()) {
                            errs.push(err);
                        }
                    }
                }
            }

            if let Some(msg) = &slot {
                let (transaction, response_rx) = Transaction::channel(msg.shallow_copy());
                tokio::select! {
                    sent = out_tx.send(transaction) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.cancelled() => break,
                }

                let response = tokio::select! {
                    r = response_rx => r,
                    _ = shutdown.cancelled() => break,
                };
                match response {
                    Ok(Response::Ack) => {
                        slot = None;
                        if let Ok(size) = store.shift() {
                            backlog.set(size as i64);
                        }
                    }
                    Ok(Response::Nack(err)) => {
                        // Keep the slot; the same message is re-sent on
                        // the next iteration.
                        if seen.insert(err.clone()) {
                            errs.push(err);
                        }
                    }
                    // Consumer terminated without answering: failure,
                    // keep the slot.
                    Err(_) => break,
                }
            }

            if !errs.is_empty() && errors_tx.try_send(errs.clone()).is_ok() {
                errs.clear();
                seen.clear();
            }
        }
        debug!("buffer output loop finished");
    }
}

impl Pipeline for StackBuffer {
    fn start_receiving(&mut self, transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let (Some(out_tx), Some(errors_tx)) = (self.out_tx.take(), self.errors_tx.take()) else {
            return Err(Error::AlreadyStarted);
        };

        let input = Self::input_loop(
            Arc::clone(&self.store),
            self.shutdown.clone(),
            transactions,
            self.backlog.clone(),
        );
        let output = Self::output_loop(
            Arc::clone(&self.store),
            self.shutdown.clone(),
            out_tx,
            errors_tx,
            self.backlog.clone(),
            self.corrupt_dropped.clone(),
        );

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::join!(input, output);
            shutdown.mark_done();
        });
        Ok(())
    }

    fn transactions(&mut self) -> Result<mpsc::Receiver<Transaction>, Error> {
        self.out_rx.take().ok_or(Error::AlreadyStarted)
    }
}

#[async_trait]
impl Closable for StackBuffer {
    fn close_async(&self) {
        self.shutdown.cancel();
        self.store.close();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

#[cfg(test)]
#[path = "stack_test.rs"]
mod stack_test;

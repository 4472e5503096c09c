//! The pipeline stage loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use weir_core::{
    Closable, Error, Pipeline, Processor, ShutdownSignal, TRANSACTION_CHANNEL_CAPACITY,
};
use weir_message::{DataflowError, Response, ResponseReceiver, Transaction};
use weir_metrics::{Counter, SharedMetrics, Timer};

/// One chain position: a processor between an upstream and a downstream
/// transaction channel.
pub struct ProcessorStage {
    processor: Arc<dyn Processor>,
    out_tx: Option<mpsc::Sender<Transaction>>,
    out_rx: Option<mpsc::Receiver<Transaction>>,
    shutdown: ShutdownSignal,

    count: Counter,
    sent: Counter,
    dropped: Counter,
    timing: Timer,
}

impl ProcessorStage {
    /// Wrap `processor` in a stage.
    pub fn new(processor: Arc<dyn Processor>, metrics: &SharedMetrics) -> Self {
        let (out_tx, out_rx) = mpsc::channel(TRANSACTION_CHANNEL_CAPACITY);
        Self {
            processor,
            out_tx: Some(out_tx),
            out_rx: Some(out_rx),
            shutdown: ShutdownSignal::new(),
            count: metrics.counter("pipeline.processor.count"),
            sent: metrics.counter("pipeline.processor.sent"),
            dropped: metrics.counter("pipeline.processor.dropped"),
            timing: metrics.timer("pipeline.processor.timing"),
        }
    }

    async fn run(
        processor: Arc<dyn Processor>,
        mut transactions: mpsc::Receiver<Transaction>,
        out_tx: mpsc::Sender<Transaction>,
        shutdown: ShutdownSignal,
        count: Counter,
        sent: Counter,
        dropped: Counter,
        timing: Timer,
    ) {
        'main: loop {
            let transaction = tokio::select! {
                t = transactions.recv() => match t {
                    Some(t) => t,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            };
            count.incr(1);
            let (msg, responder) = transaction.split();

            let started = Instant::now();
            let (msgs, drop_response) = processor.process(msg);
            timing.timing(started.elapsed().as_nanos() as u64);

            if msgs.is_empty() {
                dropped.incr(1);
                responder.send(drop_response.unwrap_or(Response::Ack));
                continue;
            }

            // Forward every derived message as its own transaction, in
            // return order, then aggregate the acknowledgements.
            let mut pending: Vec<ResponseReceiver> = Vec::with_capacity(msgs.len());
            for msg in msgs {
                let (derived, response_rx) = Transaction::channel(msg);
                tokio::select! {
                    delivered = out_tx.send(derived) => {
                        if delivered.is_err() {
                            break 'main;
                        }
                    }
                    _ = shutdown.cancelled() => break 'main,
                }
                pending.push(response_rx);
            }

            let mut first_failure: Option<DataflowError> = None;
            for response_rx in pending {
                let response = tokio::select! {
                    r = response_rx => r,
                    _ = shutdown.cancelled() => break 'main,
                };
                match response {
                    Ok(Response::Ack) => sent.incr(1),
                    Ok(Response::Nack(err)) => {
                        if first_failure.is_none() {
                            first_failure = Some(err);
                        }
                    }
                    Err(_) => {
                        if first_failure.is_none() {
                            first_failure = Some(DataflowError::Closing);
                        }
                    }
                }
            }
            responder.send(Response::from_error(first_failure));
        }
        debug!("processor stage finished");
    }
}

impl Pipeline for ProcessorStage {
    fn start_receiving(&mut self, transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let out_tx = self.out_tx.take().ok_or(Error::AlreadyStarted)?;

        let loop_fut = Self::run(
            Arc::clone(&self.processor),
            transactions,
            out_tx,
            self.shutdown.clone(),
            self.count.clone(),
            self.sent.clone(),
            self.dropped.clone(),
            self.timing.clone(),
        );
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop_fut.await;
            shutdown.mark_done();
        });
        Ok(())
    }

    fn transactions(&mut self) -> Result<mpsc::Receiver<Transaction>, Error> {
        self.out_rx.take().ok_or(Error::AlreadyStarted)
    }
}

#[async_trait]
impl Closable for ProcessorStage {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

#[cfg(test)]
#[path = "stage_test.rs"]
mod stage_test;

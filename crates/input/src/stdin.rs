//! Stdin input

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use weir_core::{
    Closable, Error, Input, ShutdownSignal, Throttle, TRANSACTION_CHANNEL_CAPACITY,
};
use weir_message::{Message, Transaction};
use weir_metrics::{Counter, SharedMetrics};

use crate::common::deliver;

/// Reads lines from standard input, one message per line, and closes the
/// stream at EOF.
pub struct StdinInput {
    shutdown: ShutdownSignal,
    out_rx: Option<mpsc::Receiver<Transaction>>,
}

impl StdinInput {
    /// Start reading stdin.
    pub fn new(metrics: &SharedMetrics) -> Self {
        let (out_tx, out_rx) = mpsc::channel(TRANSACTION_CHANNEL_CAPACITY);
        let shutdown = ShutdownSignal::new();

        let loop_fut = Self::run(
            out_tx,
            shutdown.clone(),
            metrics.counter("input.stdin.messages.received"),
        );
        let task_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop_fut.await;
            task_shutdown.mark_done();
        });

        Self {
            shutdown,
            out_rx: Some(out_rx),
        }
    }

    async fn run(
        out_tx: mpsc::Sender<Transaction>,
        shutdown: ShutdownSignal,
        received: Counter,
    ) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut throttle = Throttle::new(shutdown.clone());
        loop {
            let line = tokio::select! {
                l = lines.next_line() => match l {
                    Ok(Some(line)) => line,
                    _ => break,
                },
                _ = shutdown.cancelled() => break,
            };
            received.incr(1);

            let msg = Message::from_payloads([line.into_bytes()]);
            if !deliver(&out_tx, &shutdown, &mut throttle, msg).await {
                break;
            }
        }
        info!("stdin input finished");
    }
}

impl Input for StdinInput {
    fn transactions(&mut self) -> Result<mpsc::Receiver<Transaction>, Error> {
        self.out_rx.take().ok_or(Error::AlreadyStarted)
    }
}

#[async_trait]
impl Closable for StdinInput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

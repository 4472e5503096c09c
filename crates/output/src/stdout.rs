//! Stdout output

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::debug;

use weir_core::{Closable, Error, Output, ShutdownSignal};
use weir_message::{DataflowError, Transaction};
use weir_metrics::{Counter, SharedMetrics};

/// Writes each message part as one line to standard output.
pub struct StdoutOutput {
    shutdown: ShutdownSignal,
    started: bool,
    written: Counter,
}

impl StdoutOutput {
    /// A fresh stdout output.
    pub fn new(metrics: &SharedMetrics) -> Self {
        Self {
            shutdown: ShutdownSignal::new(),
            started: false,
            written: metrics.counter("output.stdout.messages.written"),
        }
    }
}

impl Output for StdoutOutput {
    fn start_receiving(&mut self, mut transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.started = true;

        let shutdown = self.shutdown.clone();
        let written = self.written.clone();
        tokio::spawn(async move {
            let mut stdout = BufWriter::new(tokio::io::stdout());
            loop {
                let transaction = tokio::select! {
                    t = transactions.recv() => match t {
                        Some(t) => t,
                        None => break,
                    },
                    _ = shutdown.cancelled() => break,
                };
                let (msg, responder) = transaction.split();

                let mut failed = None;
                for part in msg.parts() {
                    if let Err(err) = stdout.write_all(part.data()).await {
                        failed = Some(err);
                        break;
                    }
                    if let Err(err) = stdout.write_all(b"\n").await {
                        failed = Some(err);
                        break;
                    }
                }
                if failed.is_none() {
                    if let Err(err) = stdout.flush().await {
                        failed = Some(err);
                    }
                }

                match failed {
                    None => {
                        written.incr(1);
                        responder.ack();
                    }
                    Some(err) => responder.nack(DataflowError::output(err.to_string())),
                }
            }
            debug!("stdout output finished");
            shutdown.mark_done();
        });
        Ok(())
    }
}

#[async_trait]
impl Closable for StdoutOutput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

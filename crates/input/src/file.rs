//! File input

use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

use weir_core::{
    Closable, Error, Input, ShutdownSignal, Throttle, TRANSACTION_CHANNEL_CAPACITY,
};
use weir_message::{Message, Part, Transaction};
use weir_metrics::{Counter, SharedMetrics};

use crate::common::deliver;
use crate::FileInputConfig;

/// Reads a file line by line, one message per line, and closes the stream
/// at EOF.
pub struct FileInput {
    shutdown: ShutdownSignal,
    out_rx: Option<mpsc::Receiver<Transaction>>,
}

impl FileInput {
    /// Start reading `conf.path`.
    pub fn new(conf: &FileInputConfig, metrics: &SharedMetrics) -> Self {
        let (out_tx, out_rx) = mpsc::channel(TRANSACTION_CHANNEL_CAPACITY);
        let shutdown = ShutdownSignal::new();

        let loop_fut = Self::run(
            conf.path.clone(),
            out_tx,
            shutdown.clone(),
            metrics.counter("input.file.messages.received"),
            metrics.counter("input.file.messages.sent"),
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
        path: String,
        out_tx: mpsc::Sender<Transaction>,
        shutdown: ShutdownSignal,
        received: Counter,
        sent: Counter,
    ) {
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) => {
                error!(path, error = %err, "failed to open input file");
                return;
            }
        };
        info!(path, "file input reading");

        let mut lines = BufReader::new(file).lines();
        let mut throttle = Throttle::new(shutdown.clone());
        loop {
            let line = tokio::select! {
                l = lines.next_line() => match l {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        error!(path, error = %err, "failed to read input file");
                        break;
                    }
                },
                _ = shutdown.cancelled() => break,
            };
            received.incr(1);

            let mut part = Part::from(line.into_bytes());
            part.set_metadata("path", path.clone());
            let msg = Message::from_parts(vec![part]);
            if !deliver(&out_tx, &shutdown, &mut throttle, msg).await {
                break;
            }
            sent.incr(1);
        }
        info!(path, "file input finished");
    }
}

impl Input for FileInput {
    fn transactions(&mut self) -> Result<mpsc::Receiver<Transaction>, Error> {
        self.out_rx.take().ok_or(Error::AlreadyStarted)
    }
}

#[async_trait]
impl Closable for FileInput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;

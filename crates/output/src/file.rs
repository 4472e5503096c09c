//! File output

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info};

use weir_core::{Closable, Error, Output, ShutdownSignal};
use weir_message::{DataflowError, Transaction};
use weir_metrics::{Counter, SharedMetrics};

use crate::FileOutputConfig;

/// Appends each message part as one line to a file.
pub struct FileOutput {
    shutdown: ShutdownSignal,
    file: Option<std::fs::File>,
    path: String,
    written: Counter,
}

impl FileOutput {
    /// Open (or create) `conf.path` for appending.
    pub fn new(conf: &FileOutputConfig, metrics: &SharedMetrics) -> Result<Self, Error> {
        // Open synchronously so path errors surface at stream creation.
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&conf.path)
            .map_err(|err| Error::config(format!("file output open {}: {err}", conf.path)))?;

        Ok(Self {
            shutdown: ShutdownSignal::new(),
            file: Some(file),
            path: conf.path.clone(),
            written: metrics.counter("output.file.messages.written"),
        })
    }
}

impl Output for FileOutput {
    fn start_receiving(&mut self, mut transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let file = self.file.take().ok_or(Error::AlreadyStarted)?;

        let shutdown = self.shutdown.clone();
        let written = self.written.clone();
        let path = self.path.clone();
        tokio::spawn(async move {
            info!(path, "file output writing");
            let mut file = BufWriter::new(tokio::fs::File::from_std(file));
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
                    if let Err(err) = file.write_all(part.data()).await {
                        failed = Some(err);
                        break;
                    }
                    if let Err(err) = file.write_all(b"\n").await {
                        failed = Some(err);
                        break;
                    }
                }
                if failed.is_none() {
                    if let Err(err) = file.flush().await {
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
            debug!(path, "file output finished");
            shutdown.mark_done();
        });
        Ok(())
    }
}

#[async_trait]
impl Closable for FileOutput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

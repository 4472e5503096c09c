//! TCP output

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use weir_core::{Closable, Error, Output, ShutdownSignal};
use weir_message::{DataflowError, Message, Transaction};
use weir_metrics::{Counter, SharedMetrics};

use crate::TcpOutputConfig;

/// Writes line-delimited frames over a TCP connection, reconnecting on
/// failure. Failed writes are nacked; the upstream stage owns the retry.
pub struct TcpOutput {
    conf: TcpOutputConfig,
    shutdown: ShutdownSignal,
    started: bool,
    written: Counter,
    connects: Counter,
}

impl TcpOutput {
    /// A fresh TCP output; connections are made lazily per delivery.
    pub fn new(conf: &TcpOutputConfig, metrics: &SharedMetrics) -> Self {
        Self {
            conf: conf.clone(),
            shutdown: ShutdownSignal::new(),
            started: false,
            written: metrics.counter("output.tcp.messages.written"),
            connects: metrics.counter("output.tcp.connections"),
        }
    }

    async fn connect(conf: &TcpOutputConfig, connects: &Counter) -> std::io::Result<TcpStream> {
        let mut socket = TcpStream::connect(&conf.addr).await?;
        if let Some(token) = &conf.auth_token {
            socket.write_all(token.as_bytes()).await?;
            socket.write_all(b"\n").await?;
        }
        connects.incr(1);
        info!(addr = conf.addr, "tcp output connected");
        Ok(socket)
    }

    async fn write_message(socket: &mut TcpStream, msg: &Message) -> std::io::Result<()> {
        for part in msg.parts() {
            socket.write_all(part.data()).await?;
            socket.write_all(b"\n").await?;
        }
        socket.flush().await
    }
}

impl Output for TcpOutput {
    fn start_receiving(&mut self, mut transactions: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.started = true;

        let conf = self.conf.clone();
        let shutdown = self.shutdown.clone();
        let written = self.written.clone();
        let connects = self.connects.clone();
        tokio::spawn(async move {
            let mut connection: Option<TcpStream> = None;
            loop {
                let transaction = tokio::select! {
                    t = transactions.recv() => match t {
                        Some(t) => t,
                        None => break,
                    },
                    _ = shutdown.cancelled() => break,
                };
                let (msg, responder) = transaction.split();

                let mut socket = match connection.take() {
                    Some(socket) => socket,
                    None => {
                        let connected = tokio::select! {
                            c = Self::connect(&conf, &connects) => c,
                            _ = shutdown.cancelled() => {
                                responder.nack(DataflowError::Closing);
                                break;
                            }
                        };
                        match connected {
                            Ok(socket) => socket,
                            Err(err) => {
                                warn!(addr = conf.addr, error = %err, "tcp output connect failed");
                                responder.nack(DataflowError::output(err.to_string()));
                                continue;
                            }
                        }
                    }
                };

                match Self::write_message(&mut socket, &msg).await {
                    Ok(()) => {
                        connection = Some(socket);
                        written.incr(1);
                        responder.ack();
                    }
                    Err(err) => {
                        warn!(addr = conf.addr, error = %err, "tcp output write failed");
                        responder.nack(DataflowError::output(err.to_string()));
                    }
                }
            }
            debug!(addr = conf.addr, "tcp output finished");
            shutdown.mark_done();
        });
        Ok(())
    }
}

#[async_trait]
impl Closable for TcpOutput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;

//! TCP input

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use weir_core::{
    Closable, Error, Input, ShutdownSignal, Throttle, TRANSACTION_CHANNEL_CAPACITY,
};
use weir_message::{Message, Part, Transaction};
use weir_metrics::{Counter, SharedMetrics};

use crate::common::deliver;
use crate::TcpInputConfig;

/// Accepts TCP connections and produces one message per line-delimited
/// frame, with the remote address recorded in part metadata.
pub struct TcpInput {
    shutdown: ShutdownSignal,
    out_rx: Option<mpsc::Receiver<Transaction>>,
    local_addr: SocketAddr,
}

struct ConnMetrics {
    connections: Counter,
    received: Counter,
    sent: Counter,
}

impl TcpInput {
    /// Bind `conf.addr` and start accepting.
    pub fn new(conf: &TcpInputConfig, metrics: &SharedMetrics) -> Result<Self, Error> {
        // Bind synchronously so configuration errors surface at stream
        // creation rather than inside the accept task.
        let listener = std::net::TcpListener::bind(&conf.addr)
            .map_err(|err| Error::config(format!("tcp input bind {}: {err}", conf.addr)))?;
        listener
            .set_nonblocking(true)
            .map_err(|err| Error::config(format!("tcp input bind {}: {err}", conf.addr)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| Error::config(format!("tcp input bind {}: {err}", conf.addr)))?;

        let (out_tx, out_rx) = mpsc::channel(TRANSACTION_CHANNEL_CAPACITY);
        let shutdown = ShutdownSignal::new();

        let conn_metrics = ConnMetrics {
            connections: metrics.counter("input.tcp.connections"),
            received: metrics.counter("input.tcp.messages.received"),
            sent: metrics.counter("input.tcp.messages.sent"),
        };
        let loop_fut = Self::run(listener, out_tx, shutdown.clone(), conn_metrics);
        let task_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop_fut.await;
            task_shutdown.mark_done();
        });

        Ok(Self {
            shutdown,
            out_rx: Some(out_rx),
            local_addr,
        })
    }

    /// The address the listener actually bound, useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn run(
        listener: std::net::TcpListener,
        out_tx: mpsc::Sender<Transaction>,
        shutdown: ShutdownSignal,
        metrics: ConnMetrics,
    ) {
        let listener = match TcpListener::from_std(listener) {
            Ok(listener) => listener,
            Err(err) => {
                error!(error = %err, "failed to register tcp listener");
                return;
            }
        };
        info!(addr = %self_addr(&listener), "tcp input listening");

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, remote)) => {
                        metrics.connections.incr(1);
                        debug!(%remote, "tcp input connection opened");
                        connections.spawn(Self::handle_connection(
                            socket,
                            remote,
                            out_tx.clone(),
                            shutdown.clone(),
                            metrics.received.clone(),
                            metrics.sent.clone(),
                        ));
                    }
                    Err(err) => warn!(error = %err, "tcp accept failed"),
                },
                _ = shutdown.cancelled() => break,
            }
        }
        connections.shutdown().await;
    }

    async fn handle_connection(
        socket: TcpStream,
        remote: SocketAddr,
        out_tx: mpsc::Sender<Transaction>,
        shutdown: ShutdownSignal,
        received: Counter,
        sent: Counter,
    ) {
        let mut lines = BufReader::new(socket).lines();
        let mut throttle = Throttle::new(shutdown.clone());
        loop {
            let line = tokio::select! {
                l = lines.next_line() => match l {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(%remote, error = %err, "tcp read failed");
                        break;
                    }
                },
                _ = shutdown.cancelled() => break,
            };
            received.incr(1);

            let mut part = Part::from(line.into_bytes());
            part.set_metadata("remote_addr", remote.to_string());
            let msg = Message::from_parts(vec![part]);
            if !deliver(&out_tx, &shutdown, &mut throttle, msg).await {
                break;
            }
            sent.incr(1);
        }
        debug!(%remote, "tcp input connection closed");
    }
}

fn self_addr(listener: &TcpListener) -> String {
    listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_owned())
}

impl Input for TcpInput {
    fn transactions(&mut self) -> Result<mpsc::Receiver<Transaction>, Error> {
        self.out_rx.take().ok_or(Error::AlreadyStarted)
    }
}

#[async_trait]
impl Closable for TcpInput {
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

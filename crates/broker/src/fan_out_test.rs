use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use weir_core::{Closable, Error, Output, ShutdownSignal};
use weir_message::{DataflowError, Message, Response, Transaction};

use super::FanOut;

fn msg(payload: &str) -> Message {
    Message::from_payloads([Bytes::copy_from_slice(payload.as_bytes())])
}

fn payload_str(msg: &Message) -> String {
    String::from_utf8(msg.parts()[0].data().to_vec()).unwrap()
}

/// Output that records acknowledged payloads, nacking the first
/// `failures` transactions it sees.
struct MockOutput {
    shutdown: ShutdownSignal,
    received: Arc<Mutex<Vec<String>>>,
    failures: Arc<AtomicUsize>,
}

impl MockOutput {
    fn new(failures: usize) -> (Self, Arc<Mutex<Vec<String>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                shutdown: ShutdownSignal::new(),
                received: Arc::clone(&received),
                failures: Arc::new(AtomicUsize::new(failures)),
            },
            received,
        )
    }
}

impl Output for MockOutput {
    fn start_receiving(&mut self, mut rx: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let shutdown = self.shutdown.clone();
        let received = Arc::clone(&self.received);
        let failures = Arc::clone(&self.failures);
        tokio::spawn(async move {
            loop {
                let transaction = tokio::select! {
                    t = rx.recv() => match t {
                        Some(t) => t,
                        None => break,
                    },
                    _ = shutdown.cancelled() => break,
                };
                let remaining = failures.load(Ordering::Relaxed);
                if remaining > 0 {
                    failures.store(remaining - 1, Ordering::Relaxed);
                    transaction.respond(Response::Nack(DataflowError::output("injected")));
                } else {
                    received.lock().push(payload_str(transaction.payload()));
                    transaction.ack();
                }
            }
            shutdown.mark_done();
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl Closable for MockOutput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

/// Output that accepts transactions but never answers them.
struct BlackholeOutput {
    shutdown: ShutdownSignal,
    held: Arc<Mutex<Vec<Transaction>>>,
}

impl BlackholeOutput {
    fn new() -> Self {
        Self {
            shutdown: ShutdownSignal::new(),
            held: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Output for BlackholeOutput {
    fn start_receiving(&mut self, mut rx: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let shutdown = self.shutdown.clone();
        let held = Arc::clone(&self.held);
        tokio::spawn(async move {
            loop {
                let transaction = tokio::select! {
                    t = rx.recv() => match t {
                        Some(t) => t,
                        None => break,
                    },
                    _ = shutdown.cancelled() => break,
                };
                held.lock().push(transaction);
            }
            shutdown.mark_done();
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl Closable for BlackholeOutput {
    fn close_async(&self) {
        self.shutdown.cancel();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_done(timeout).await
    }
}

fn start_broker(broker: &mut FanOut) -> mpsc::Sender<Transaction> {
    let (tx, rx) = mpsc::channel(1);
    broker.start_receiving(rx).unwrap();
    tx
}

#[tokio::test]
async fn test_happy_path_broadcasts_in_order() {
    let mut outputs = Vec::new();
    let mut logs = Vec::new();
    for _ in 0..3 {
        let (output, log) = MockOutput::new(0);
        outputs.push(Box::new(output) as Box<dyn Output>);
        logs.push(log);
    }

    let mut broker = FanOut::new(outputs, &weir_metrics::noop()).unwrap();
    let upstream = start_broker(&mut broker);

    for i in 0..5 {
        let (transaction, response) = Transaction::channel(msg(&format!("m{i}")));
        upstream.send(transaction).await.unwrap();
        assert_eq!(response.await.unwrap(), Response::Ack);
    }

    drop(upstream);
    broker.wait_for_close(Duration::from_secs(1)).await.unwrap();

    let expected: Vec<String> = (0..5).map(|i| format!("m{i}")).collect();
    for log in logs {
        assert_eq!(*log.lock(), expected);
    }
}

#[tokio::test]
async fn test_failing_branch_retries_without_resending_healthy() {
    let (healthy_a, log_a) = MockOutput::new(0);
    let (flaky, log_flaky) = MockOutput::new(2);
    let (healthy_b, log_b) = MockOutput::new(0);

    let mut broker = FanOut::new(
        vec![Box::new(healthy_a), Box::new(flaky), Box::new(healthy_b)],
        &weir_metrics::noop(),
    )
    .unwrap();
    let upstream = start_broker(&mut broker);

    let (transaction, response) = Transaction::channel(msg("retried"));
    upstream.send(transaction).await.unwrap();

    // Upstream is acknowledged only after the flaky branch finally
    // accepted on its third dispatch.
    assert_eq!(response.await.unwrap(), Response::Ack);
    assert_eq!(*log_flaky.lock(), vec!["retried"]);
    assert_eq!(*log_a.lock(), vec!["retried"]);
    assert_eq!(*log_b.lock(), vec!["retried"]);

    drop(upstream);
    broker.wait_for_close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_cancellation_drops_upstream_ack() {
    let mut broker = FanOut::new(
        vec![Box::new(BlackholeOutput::new())],
        &weir_metrics::noop(),
    )
    .unwrap();
    let upstream = start_broker(&mut broker);

    let (transaction, response) = Transaction::channel(msg("in flight"));
    upstream.send(transaction).await.unwrap();

    broker.close_async();
    broker.close_async(); // idempotent

    // The broker exited without answering: failure upstream.
    assert!(response.await.is_err());
    broker.wait_for_close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_end_of_stream_cascades_to_outputs() {
    let (output, _log) = MockOutput::new(0);
    let mut broker = FanOut::new(vec![Box::new(output)], &weir_metrics::noop()).unwrap();
    let upstream = start_broker(&mut broker);

    drop(upstream);
    broker.wait_for_close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_rejects_empty_output_list() {
    assert!(matches!(
        FanOut::new(Vec::new(), &weir_metrics::noop()),
        Err(Error::Config(_))
    ));
}

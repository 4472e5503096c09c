use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use weir_core::{Closable, Error, Output, ShutdownSignal};
use weir_message::{DataflowError, Message, Response, Transaction};

use super::RoundRobin;

fn msg(payload: &str) -> Message {
    Message::from_payloads([Bytes::copy_from_slice(payload.as_bytes())])
}

fn payload_str(msg: &Message) -> String {
    String::from_utf8(msg.parts()[0].data().to_vec()).unwrap()
}

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

#[tokio::test]
async fn test_rotates_across_outputs() {
    let (output_a, log_a) = MockOutput::new(0);
    let (output_b, log_b) = MockOutput::new(0);

    let mut broker = RoundRobin::new(
        vec![Box::new(output_a), Box::new(output_b)],
        &weir_metrics::noop(),
    )
    .unwrap();
    let (upstream, rx) = mpsc::channel(1);
    broker.start_receiving(rx).unwrap();

    for i in 0..4 {
        let (transaction, response) = Transaction::channel(msg(&format!("m{i}")));
        upstream.send(transaction).await.unwrap();
        assert_eq!(response.await.unwrap(), Response::Ack);
    }

    drop(upstream);
    broker.wait_for_close(Duration::from_secs(1)).await.unwrap();

    assert_eq!(*log_a.lock(), vec!["m0", "m2"]);
    assert_eq!(*log_b.lock(), vec!["m1", "m3"]);
}

#[tokio::test]
async fn test_branch_failure_forwards_upstream_without_retry() {
    let (flaky, log_flaky) = MockOutput::new(1);
    let (healthy, log_healthy) = MockOutput::new(0);

    let mut broker = RoundRobin::new(
        vec![Box::new(flaky), Box::new(healthy)],
        &weir_metrics::noop(),
    )
    .unwrap();
    let (upstream, rx) = mpsc::channel(1);
    broker.start_receiving(rx).unwrap();

    let (transaction, response) = Transaction::channel(msg("rejected"));
    upstream.send(transaction).await.unwrap();
    assert_eq!(
        response.await.unwrap(),
        Response::Nack(DataflowError::output("injected"))
    );

    let (transaction, response) = Transaction::channel(msg("accepted"));
    upstream.send(transaction).await.unwrap();
    assert_eq!(response.await.unwrap(), Response::Ack);

    drop(upstream);
    broker.wait_for_close(Duration::from_secs(1)).await.unwrap();

    assert!(log_flaky.lock().is_empty());
    assert_eq!(*log_healthy.lock(), vec!["accepted"]);
}

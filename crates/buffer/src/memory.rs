//! In-memory FIFO message store
//!
//! A byte-limited queue. Pushers wait while the store is over its limit;
//! readers wait while it is empty. A watch channel carries a change
//! counter so waiting sides re-check after every push, shift or close.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use weir_message::Message;

use crate::{MessageStore, StoreError};

/// Default byte limit for a memory store.
pub const DEFAULT_LIMIT_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<Message>,
    bytes: usize,
    closed: bool,
}

/// Byte-limited in-memory [`MessageStore`].
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    limit: usize,
    changed: watch::Sender<u64>,
}

impl MemoryStore {
    /// A store holding up to `limit` payload bytes.
    pub fn new(limit: usize) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner::default()),
            limit,
            changed,
        }
    }

    fn bump(&self) {
        self.changed.send_modify(|v| *v = v.wrapping_add(1));
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn push(&self, msg: Message) -> Result<usize, StoreError> {
        let size = msg.total_bytes();
        loop {
            // Subscribe before checking so a concurrent shift cannot slip
            // between the check and the wait.
            let mut rx = self.changed.subscribe();
            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return Err(StoreError::Closed);
                }
                // An oversized message is still accepted into an empty
                // store; rejecting it forever would wedge the producer.
                if inner.bytes + size <= self.limit || inner.queue.is_empty() {
                    inner.queue.push_back(msg);
                    inner.bytes += size;
                    let backlog = inner.queue.len();
                    drop(inner);
                    self.bump();
                    return Ok(backlog);
                }
            }
            if rx.changed().await.is_err() {
                return Err(StoreError::Closed);
            }
        }
    }

    async fn next(&self) -> Result<Message, StoreError> {
        loop {
            let mut rx = self.changed.subscribe();
            {
                let inner = self.inner.lock();
                if let Some(msg) = inner.queue.front() {
                    return Ok(msg.shallow_copy());
                }
                if inner.closed {
                    return Err(StoreError::Closed);
                }
            }
            if rx.changed().await.is_err() {
                return Err(StoreError::Closed);
            }
        }
    }

    fn shift(&self) -> Result<usize, StoreError> {
        let backlog = {
            let mut inner = self.inner.lock();
            if let Some(msg) = inner.queue.pop_front() {
                inner.bytes -= msg.total_bytes();
            }
            inner.queue.len()
        };
        self.bump();
        Ok(backlog)
    }

    fn close(&self) {
        self.inner.lock().closed = true;
        self.bump();
    }

    fn backlog(&self) -> usize {
        self.inner.lock().queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;

    fn msg(payload: &str) -> Message {
        Message::from_payloads([Bytes::copy_from_slice(payload.as_bytes())])
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let store = MemoryStore::new(DEFAULT_LIMIT_BYTES);
        store.push(msg("first")).await.unwrap();
        store.push(msg("second")).await.unwrap();

        assert_eq!(store.next().await.unwrap().parts()[0].data().as_ref(), b"first");
        // Peek does not advance.
        assert_eq!(store.next().await.unwrap().parts()[0].data().as_ref(), b"first");

        store.shift().unwrap();
        assert_eq!(store.next().await.unwrap().parts()[0].data().as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_push_reports_backlog() {
        let store = MemoryStore::new(DEFAULT_LIMIT_BYTES);
        assert_eq!(store.push(msg("a")).await.unwrap(), 1);
        assert_eq!(store.push(msg("b")).await.unwrap(), 2);
        assert_eq!(store.shift().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_push_blocks_over_limit_until_shift() {
        let store = Arc::new(MemoryStore::new(8));
        store.push(msg("12345678")).await.unwrap();

        let blocked = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.push(msg("x")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        store.shift().unwrap();
        blocked.await.unwrap().unwrap();
        assert_eq!(store.backlog(), 1);
    }

    #[tokio::test]
    async fn test_close_drains_then_reports_closed() {
        let store = MemoryStore::new(DEFAULT_LIMIT_BYTES);
        store.push(msg("last")).await.unwrap();
        store.close();

        assert_eq!(store.push(msg("rejected")).await, Err(StoreError::Closed));
        // Drain is still permitted.
        assert!(store.next().await.is_ok());
        store.shift().unwrap();
        assert_eq!(store.next().await, Err(StoreError::Closed));
    }

    #[tokio::test]
    async fn test_close_unblocks_waiting_reader() {
        let store = Arc::new(MemoryStore::new(DEFAULT_LIMIT_BYTES));
        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.next().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.close();

        let res = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("reader did not unblock")
            .unwrap();
        assert_eq!(res, Err(StoreError::Closed));
    }
}

//! Deduplication processor

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use weir_core::{Cache, CacheError, Error, Processor, Resources};
use weir_message::{Message, Response};
use weir_metrics::{Counter, SharedMetrics};

/// Settings for the dedupe processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Name of the cache resource recording seen messages.
    pub cache: String,

    /// Part indices hashed into the dedupe key; negative indices count
    /// from the end. Empty hashes every part.
    #[serde(default)]
    pub parts: Vec<isize>,
}

/// Drops messages whose keyed content was already seen by the configured
/// cache. Duplicates are acknowledged upstream as intentional drops, so
/// at-least-once redelivery upstream of this processor collapses to one
/// delivery downstream of it.
pub struct Dedupe {
    cache: Arc<dyn Cache>,
    parts: Vec<isize>,

    count: Counter,
    dropped: Counter,
    sent: Counter,
}

impl Dedupe {
    /// Build a deduper, resolving its cache resource.
    pub fn new(
        conf: &DedupeConfig,
        resources: &Resources,
        metrics: &SharedMetrics,
    ) -> Result<Self, Error> {
        Ok(Self {
            cache: resources.cache(&conf.cache)?,
            parts: conf.parts.clone(),
            count: metrics.counter("processor.dedupe.count"),
            dropped: metrics.counter("processor.dedupe.dropped"),
            sent: metrics.counter("processor.dedupe.sent"),
        })
    }

    fn key(&self, msg: &Message) -> Option<String> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        if self.parts.is_empty() {
            for part in msg.parts() {
                part.data().hash(&mut hasher);
            }
        } else {
            for &index in &self.parts {
                msg.part(index)?.data().hash(&mut hasher);
            }
        }
        Some(format!("{:016x}", hasher.finish()))
    }
}

impl Processor for Dedupe {
    fn process(&self, msg: Message) -> (Vec<Message>, Option<Response>) {
        self.count.incr(1);

        let Some(key) = self.key(&msg) else {
            self.dropped.incr(1);
            return (
                Vec::new(),
                Some(Response::Nack(weir_message::DataflowError::processor(
                    "part index out of bounds",
                ))),
            );
        };

        match self.cache.add(&key, Vec::new()) {
            Ok(()) => {
                self.sent.incr(1);
                (vec![msg], None)
            }
            Err(CacheError::AlreadyExists) => {
                self.dropped.incr(1);
                (Vec::new(), Some(Response::Ack))
            }
            Err(err) => {
                self.dropped.incr(1);
                (
                    Vec::new(),
                    Some(Response::Nack(weir_message::DataflowError::processor(
                        format!("dedupe cache: {err}"),
                    ))),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use weir_core::MemoryCache;

    fn deduper(parts: Vec<isize>) -> Dedupe {
        let resources = Resources::new();
        resources.add_cache("seen", Arc::new(MemoryCache::new()));
        Dedupe::new(
            &DedupeConfig {
                cache: "seen".into(),
                parts,
            },
            &resources,
            &weir_metrics::noop(),
        )
        .unwrap()
    }

    fn msg(payload: &str) -> Message {
        Message::from_payloads([Bytes::copy_from_slice(payload.as_bytes())])
    }

    #[test]
    fn test_first_sighting_forwards_duplicate_drops() {
        let dedupe = deduper(Vec::new());

        let (msgs, response) = dedupe.process(msg("event-1"));
        assert_eq!(msgs.len(), 1);
        assert!(response.is_none());

        let (msgs, response) = dedupe.process(msg("event-1"));
        assert!(msgs.is_empty());
        assert_eq!(response, Some(Response::Ack));

        let (msgs, _) = dedupe.process(msg("event-2"));
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn test_keyed_parts_only() {
        let dedupe = deduper(vec![0]);

        let first = Message::from_payloads(["same-key", "body a"].map(Bytes::from));
        let second = Message::from_payloads(["same-key", "body b"].map(Bytes::from));

        let (msgs, _) = dedupe.process(first);
        assert_eq!(msgs.len(), 1);
        // Same keyed part, different body: still a duplicate.
        let (msgs, response) = dedupe.process(second);
        assert!(msgs.is_empty());
        assert_eq!(response, Some(Response::Ack));
    }

    #[test]
    fn test_missing_cache_resource_fails_construction() {
        let resources = Resources::new();
        let res = Dedupe::new(
            &DedupeConfig {
                cache: "ghost".into(),
                parts: Vec::new(),
            },
            &resources,
            &weir_metrics::noop(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_out_of_bounds_key_part_nacks() {
        let dedupe = deduper(vec![5]);
        let (msgs, response) = dedupe.process(msg("only one part"));
        assert!(msgs.is_empty());
        assert!(matches!(response, Some(Response::Nack(_))));
    }
}

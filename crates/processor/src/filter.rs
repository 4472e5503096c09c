//! Condition filter processor

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use weir_core::{Condition, Error, Processor};
use weir_message::{Message, Response};
use weir_metrics::{Counter, SharedMetrics};

use crate::condition::{self, ConditionConfig};

/// Settings for the filter processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Condition each message is tested against.
    pub condition: ConditionConfig,
}

/// Tests each message against a condition and drops it when the condition
/// fails. Dropped messages are acknowledged upstream as intentional.
pub struct Filter {
    condition: Arc<dyn Condition>,

    count: Counter,
    dropped: Counter,
    sent: Counter,
}

impl Filter {
    /// Build a filter with its condition.
    pub fn new(conf: &FilterConfig, metrics: &SharedMetrics) -> Result<Self, Error> {
        Ok(Self {
            condition: condition::build(&conf.condition)?,
            count: metrics.counter("processor.filter.count"),
            dropped: metrics.counter("processor.filter.dropped"),
            sent: metrics.counter("processor.filter.sent"),
        })
    }
}

impl Processor for Filter {
    fn process(&self, msg: Message) -> (Vec<Message>, Option<Response>) {
        self.count.incr(1);

        if !self.condition.check(&msg) {
            self.dropped.incr(1);
            return (Vec::new(), Some(Response::Ack));
        }

        self.sent.incr(1);
        (vec![msg], None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{TextConditionConfig, TextOperator};
    use bytes::Bytes;

    fn filter(arg: &str) -> Filter {
        Filter::new(
            &FilterConfig {
                condition: ConditionConfig::Text(TextConditionConfig {
                    operator: TextOperator::Contains,
                    part: 0,
                    arg: arg.into(),
                }),
            },
            &weir_metrics::noop(),
        )
        .unwrap()
    }

    fn msg(payload: &str) -> Message {
        Message::from_payloads([Bytes::copy_from_slice(payload.as_bytes())])
    }

    #[test]
    fn test_passing_message_forwards() {
        let (msgs, response) = filter("keep").process(msg("please keep this"));
        assert_eq!(msgs.len(), 1);
        assert!(response.is_none());
    }

    #[test]
    fn test_failing_message_drops_with_ack() {
        let (msgs, response) = filter("keep").process(msg("discard this"));
        assert!(msgs.is_empty());
        assert_eq!(response, Some(Response::Ack));
    }
}

//! Message conditions
//!
//! Side-effect-free predicates evaluated by the filter processor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use weir_core::{Condition, Error};
use weir_message::Message;

/// Condition selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionConfig {
    /// Compare a part's payload against a text argument.
    Text(TextConditionConfig),

    /// Fixed verdict, useful for wiring tests.
    Static(StaticConditionConfig),
}

/// Text comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOperator {
    Contains,
    Equals,
    Prefix,
    Suffix,
}

/// Settings for the text condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConditionConfig {
    /// Comparison to apply.
    pub operator: TextOperator,

    /// Part index to inspect; negative indices count from the end.
    #[serde(default)]
    pub part: isize,

    /// Text argument compared against the part payload.
    pub arg: String,
}

/// Settings for the static condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticConditionConfig {
    pub value: bool,
}

/// Build a condition from configuration.
pub fn build(conf: &ConditionConfig) -> Result<Arc<dyn Condition>, Error> {
    match conf {
        ConditionConfig::Text(text) => Ok(Arc::new(TextCondition::new(text.clone()))),
        ConditionConfig::Static(fixed) => Ok(Arc::new(StaticCondition { value: fixed.value })),
    }
}

/// Compares one part's payload against a configured argument.
pub struct TextCondition {
    conf: TextConditionConfig,
}

impl TextCondition {
    /// A condition with the given settings.
    pub fn new(conf: TextConditionConfig) -> Self {
        Self { conf }
    }
}

impl Condition for TextCondition {
    fn check(&self, msg: &Message) -> bool {
        let Some(part) = msg.part(self.conf.part) else {
            return false;
        };
        let payload = part.data().as_ref();
        let arg = self.conf.arg.as_bytes();
        match self.conf.operator {
            TextOperator::Contains => {
                arg.is_empty() || payload.windows(arg.len()).any(|w| w == arg)
            }
            TextOperator::Equals => payload == arg,
            TextOperator::Prefix => payload.starts_with(arg),
            TextOperator::Suffix => payload.ends_with(arg),
        }
    }
}

/// Always answers with the configured verdict.
pub struct StaticCondition {
    value: bool,
}

impl Condition for StaticCondition {
    fn check(&self, _msg: &Message) -> bool {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn msg(payload: &str) -> Message {
        Message::from_payloads([Bytes::copy_from_slice(payload.as_bytes())])
    }

    fn text(operator: TextOperator, part: isize, arg: &str) -> TextCondition {
        TextCondition::new(TextConditionConfig {
            operator,
            part,
            arg: arg.into(),
        })
    }

    #[test]
    fn test_contains() {
        let cond = text(TextOperator::Contains, 0, "ell");
        assert!(cond.check(&msg("hello")));
        assert!(!cond.check(&msg("goodbye")));
    }

    #[test]
    fn test_equals() {
        let cond = text(TextOperator::Equals, 0, "exact");
        assert!(cond.check(&msg("exact")));
        assert!(!cond.check(&msg("exactly")));
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert!(text(TextOperator::Prefix, 0, "he").check(&msg("hello")));
        assert!(!text(TextOperator::Prefix, 0, "lo").check(&msg("hello")));
        assert!(text(TextOperator::Suffix, 0, "lo").check(&msg("hello")));
        assert!(!text(TextOperator::Suffix, 0, "he").check(&msg("hello")));
    }

    #[test]
    fn test_negative_part_index() {
        let message = Message::from_payloads(["first", "last"].map(Bytes::from));
        assert!(text(TextOperator::Equals, -1, "last").check(&message));
    }

    #[test]
    fn test_missing_part_fails() {
        let cond = text(TextOperator::Contains, 3, "x");
        assert!(!cond.check(&msg("only one part")));
    }
}

//! Filter helpers for Qdrant queries and scrolls.

use serde_json::{Value, json};

/// Exact-match condition on a payload field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    /// Payload key.
    pub key: &'static str,
    /// Value the key must equal.
    pub value: Value,
}

impl FieldMatch {
    /// Match `key` against `value`.
    pub fn new(key: &'static str, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Compose a `must` filter from exact-match conditions, skipping blank string values.
///
/// Returns `None` when no condition survives so that callers can omit the filter entirely.
pub fn build_match_filter(conditions: &[FieldMatch]) -> Option<Value> {
    let must: Vec<Value> = conditions
        .iter()
        .filter(|condition| match &condition.value {
            Value::String(text) => !text.trim().is_empty(),
            Value::Null => false,
            _ => true,
        })
        .map(|condition| {
            let value = match &condition.value {
                Value::String(text) => Value::String(text.trim().to_string()),
                other => other.clone(),
            };
            json!({
                "key": condition.key,
                "match": { "value": value }
            })
        })
        .collect();

    if must.is_empty() {
        None
    } else {
        Some(json!({ "must": must }))
    }
}

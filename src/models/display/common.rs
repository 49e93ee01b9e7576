//! Common display utilities and helpers

use serde_json::Value;

/// Truncate string to max length with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a JSON value on one line; strings lose their quotes
pub fn compact_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Top-level fields of an object as (name, rendered value) pairs.
/// Non-object values become a single `value` field.
pub fn value_fields(value: &Value, max_len: usize) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), truncate_string(&compact_value(v), max_len)))
            .collect(),
        other => vec![(
            "value".to_string(),
            truncate_string(&compact_value(other), max_len),
        )],
    }
}

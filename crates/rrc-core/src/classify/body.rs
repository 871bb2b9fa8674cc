//! Lenient reader for structured error bodies.
//!
//! Each field is extracted on its own so one badly typed field never discards
//! the rest of the body.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Fields a peer may put in a JSON error body.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    pub suggestion: Option<String>,
    pub retryable: Option<bool>,
    pub retry_after_ms: Option<u64>,
    pub tracking_id: Option<String>,
}

impl ErrorBody {
    /// Parse raw bytes; anything that is not a JSON object yields an empty body.
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Self::from_map(&map),
            _ => Self::default(),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            message: string_field(map, "message"),
            code: code_field(map),
            category: string_field(map, "category"),
            errors: map.get("errors").and_then(validation_errors),
            suggestion: string_field(map, "suggestion"),
            retryable: map.get("retryable").and_then(Value::as_bool),
            retry_after_ms: map.get("retryAfter").and_then(Value::as_u64),
            tracking_id: string_field(map, "trackingId"),
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Codes are sometimes numeric; keep their textual form.
fn code_field(map: &Map<String, Value>) -> Option<String> {
    match map.get("code")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `{"field": ["msg", ...]}`; a bare string value is treated as one message.
fn validation_errors(value: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    let object = value.as_object()?;
    let mut out = BTreeMap::new();
    for (field, messages) in object {
        let list = match messages {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => continue,
        };
        out.insert(field.clone(), list);
    }
    Some(out)
}

//! Two-stage JSON recovery for model output.
//!
//! Models are asked for bare JSON but often wrap it in prose or code
//! fences. Stage one parses the whole text strictly; stage two takes the
//! span from the first opening bracket to the last closing bracket and
//! parses that. Anything else is a failure carrying the raw text.

use serde_json::{Map, Value};

/// Outcome of extracting a JSON value from generated text.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    /// The whole text was valid JSON of the expected shape.
    Strict(T),
    /// The value was recovered from a bracketed span inside the text.
    Recovered(T),
    /// Neither stage produced the expected shape.
    Failed,
}

impl<T> Extracted<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Strict(v) | Self::Recovered(v) => Some(v),
            Self::Failed => None,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }
}

/// Extract a JSON array.
pub fn json_array(raw: &str) -> Extracted<Vec<Value>> {
    extract(raw, '[', ']', |v| match v {
        Value::Array(items) => Some(items),
        _ => None,
    })
}

/// Extract a JSON object.
pub fn json_object(raw: &str) -> Extracted<Map<String, Value>> {
    extract(raw, '{', '}', |v| match v {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

fn extract<T>(raw: &str, open: char, close: char, shape: impl Fn(Value) -> Option<T>) -> Extracted<T> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim())
        && let Some(v) = shape(value)
    {
        return Extracted::Strict(v);
    }

    let (Some(start), Some(end)) = (raw.find(open), raw.rfind(close)) else {
        return Extracted::Failed;
    };
    if end <= start {
        return Extracted::Failed;
    }

    match serde_json::from_str::<Value>(&raw[start..=end]).ok().and_then(shape) {
        Some(v) => Extracted::Recovered(v),
        None => Extracted::Failed,
    }
}

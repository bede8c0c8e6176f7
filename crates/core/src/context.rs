//! The ContextBag: everything a plan fetched, keyed by field name.
//!
//! Built incrementally by the Executor. A failing tool contributes an
//! error marker (`{"error": "..."}`) under its own field; the bag is never
//! torn down because one source failed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Bag-level error raised when the plan had nothing to run.
pub const NO_TOOLS: &str = "no_tools";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBag {
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,

    /// Set when the plan included the advisory tool; selects the coaching
    /// framing in the Synthesizer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub advisory_requested: bool,

    /// Bag-level failure (e.g. `no_tools`). Field failures live in `fields`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContextBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bag signalling that no tools were planned.
    pub fn no_tools() -> Self {
        Self {
            error: Some(NO_TOOLS.to_string()),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Record a per-field failure marker.
    pub fn insert_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .insert(field.into(), json!({ "error": message.into() }));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The error message recorded for `field`, if it failed.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(error_marker)
    }

    /// Fields holding data (not error markers), in key order.
    pub fn fetched_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, v)| error_marker(v).is_none())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Fields holding error markers, with their messages.
    pub fn failed_fields(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| error_marker(v).map(|e| (k.as_str(), e)))
            .collect()
    }

    /// True when the bag carries a bag-level error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Compact JSON rendering embedded in synthesis prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// `Some(message)` when `value` is exactly an error marker object.
pub fn error_marker(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get("error").and_then(Value::as_str)
}

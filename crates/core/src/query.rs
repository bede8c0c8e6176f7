//! Query in, Answer out: the only contract the pipeline exposes upward.

use serde::{Deserialize, Serialize};

use crate::student::StudentId;

/// A free-text question, optionally asked on behalf of a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(alias = "query")]
    pub text: String,

    #[serde(default, alias = "student_id", skip_serializing_if = "Option::is_none")]
    pub caller: Option<StudentId>,
}

impl Query {
    pub fn new(text: impl Into<String>, caller: Option<StudentId>) -> Self {
        Self {
            text: text.into(),
            caller,
        }
    }

    /// Whitespace-only queries are still answered, as a degenerate advisory query.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The result envelope: `{"response_text": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Response { response_text: String },
    Error { error: String },
}

impl Answer {
    pub fn response(text: impl Into<String>) -> Self {
        Self::Response {
            response_text: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The text shown to the user, whichever variant this is.
    pub fn text(&self) -> &str {
        match self {
            Self::Response { response_text } => response_text,
            Self::Error { error } => error,
        }
    }
}

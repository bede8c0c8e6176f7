//! Fallback Summarizer: degraded answers without an inference call.
//!
//! Used when the plan was empty, when decomposition failed, or when
//! synthesis failed. It only reads the bag, so it works while the backend
//! is down. A backend that was never configured is reported through the
//! `{error}` envelope; every other failure gets an apology in
//! `response_text`.

use campusfed_core::context::ContextBag;
use campusfed_core::error::{DecompositionError, ProviderError, SynthesisError};
use campusfed_core::query::Answer;
use serde_json::Value;

use crate::truncate::TOTAL_COUNT_SUFFIX;

pub const CLARIFICATION: &str =
    "I'm sorry, I couldn't understand that request. Please ask about jobs, scholarships, or your documents.";

const NOT_CONFIGURED: &str = "Language model not configured";

pub struct FallbackSummarizer;

impl FallbackSummarizer {
    /// Answer for a bag that carries a bag-level error.
    pub fn for_bag(bag: &ContextBag) -> Answer {
        match bag.error.as_deref() {
            Some(campusfed_core::context::NO_TOOLS) | None => Answer::response(CLARIFICATION),
            Some(other) => Answer::response(format!(
                "Sorry, I couldn't complete that request ({other}). Please try again."
            )),
        }
    }

    pub fn for_decomposition(error: &DecompositionError) -> Answer {
        match error {
            DecompositionError::InvalidResponse { .. } => Answer::response(CLARIFICATION),
            DecompositionError::BackendUnavailable(ProviderError::NotConfigured(msg)) => {
                Answer::error(format!("{NOT_CONFIGURED}: {msg}"))
            }
            DecompositionError::BackendUnavailable(_) => Answer::response(
                "Sorry, I couldn't reach the language model to work out what to look up. Please try again in a moment.",
            ),
        }
    }

    /// Summarize what was fetched when the synthesis call failed.
    pub fn for_synthesis(bag: &ContextBag, error: &SynthesisError) -> Answer {
        if let SynthesisError::BackendUnavailable(ProviderError::NotConfigured(msg)) = error {
            return Answer::error(format!("{NOT_CONFIGURED}: {msg}"));
        }
        if bag.is_error() {
            return Self::for_bag(bag);
        }
        Answer::response(Self::degraded_summary(bag))
    }

    /// Plain-language listing of what the bag holds and what failed.
    pub fn degraded_summary(bag: &ContextBag) -> String {
        let mut found = Vec::new();
        for field in bag.fetched_fields() {
            if field.ends_with(TOTAL_COUNT_SUFFIX) {
                continue;
            }
            let Some(value) = bag.get(field) else { continue };
            let label = label(field);
            match value {
                Value::Array(items) => {
                    let total = bag
                        .get(&format!("{field}{TOTAL_COUNT_SUFFIX}"))
                        .and_then(Value::as_u64)
                        .unwrap_or(items.len() as u64);
                    found.push(format!("{total} {label}"));
                }
                Value::Object(obj) => match obj.get("full_name").and_then(Value::as_str) {
                    Some(name) => found.push(format!("{label} ({name})")),
                    None => found.push(label.to_string()),
                },
                _ => {}
            }
        }

        let failed: Vec<&str> = bag.failed_fields().into_iter().map(|(f, _)| label(f)).collect();

        let mut text =
            String::from("Sorry, I encountered an error while putting together a full answer.");
        if !found.is_empty() {
            text.push_str(&format!(" I did retrieve {}.", found.join(", ")));
        }
        if !failed.is_empty() {
            text.push_str(&format!(" I couldn't retrieve {} right now.", failed.join(", ")));
        }
        text.push_str(" Please try again shortly.");
        text
    }
}

fn label(field: &str) -> &str {
    match field {
        "student_profile" => "your profile",
        "all_student_profiles" => "student profiles",
        "student_documents" => "your documents",
        "all_documents" => "documents",
        "jobs_list" => "job listings",
        "scholarships_list" => "scholarship listings",
        "eligible_jobs" => "jobs you are eligible for",
        "eligible_scholarships" => "scholarships you are eligible for",
        other => other,
    }
}

//! Synthesizer: the (truncated) ContextBag plus the query, turned into prose.
//!
//! Exactly one inference call. The framing depends on whether the plan
//! asked for advice: a data analyst counts and cross-references, a career
//! coach recommends from the caller's profile and the listings.

use campusfed_core::context::ContextBag;
use campusfed_core::error::SynthesisError;
use campusfed_core::provider::{ModelSettings, Provider};
use campusfed_core::query::Answer;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fallback::FallbackSummarizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Analyst,
    Coach,
}

impl Framing {
    pub fn for_bag(bag: &ContextBag) -> Self {
        if bag.advisory_requested { Self::Coach } else { Self::Analyst }
    }

    fn persona(&self) -> &'static str {
        match self {
            Self::Analyst => {
                "You are a precise data analyst for a student services portal. \
                 Answer with facts drawn from the data: count, aggregate and cross-reference records \
                 exactly, and state numbers explicitly."
            }
            Self::Coach => {
                "You are a friendly student career coach. \
                 Give concrete, encouraging recommendations grounded in the student's profile \
                 and the jobs and scholarships in the data. Never invent listings."
            }
        }
    }
}

pub struct Synthesizer {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings) -> Self {
        Self { provider, settings }
    }

    pub fn prompt(bag: &ContextBag, query_text: &str) -> String {
        let framing = Framing::for_bag(bag);
        format!(
            "{persona}\n\n\
             User's question:\n\"{query_text}\"\n\n\
             Data to use (JSON):\n{data}\n\n\
             Instructions:\n\
             1. Answer the question in one concise, human-readable response.\n\
             2. If a field holds {{\"error\": ...}}, politely explain that this information could not be retrieved.\n\
             3. If a list is empty ([]), say that no matching items were found.\n\
             4. A field named <name>_total_count gives the full length of a list that was shortened.\n\
             5. eligible_jobs and eligible_scholarships are already filtered against the student's profile.\n\
             6. Do not repeat the JSON. Summarize it.\n\n\
             Your answer:",
            persona = framing.persona(),
            data = bag.to_prompt_json(),
        )
    }

    /// One call; the raw text or a synthesis error.
    pub async fn try_synthesize(&self, bag: &ContextBag, query_text: &str) -> Result<String, SynthesisError> {
        let framing = Framing::for_bag(bag);
        debug!(?framing, fields = ?bag.fields.keys().collect::<Vec<_>>(), "Synthesizing answer");

        let response = self
            .provider
            .complete(self.settings.request(Self::prompt(bag, query_text)))
            .await
            .map_err(SynthesisError::BackendUnavailable)?;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    /// Synthesize, delegating to the fallback summarizer on failure.
    pub async fn synthesize(&self, bag: &ContextBag, query_text: &str) -> Answer {
        match self.try_synthesize(bag, query_text).await {
            Ok(text) => Answer::response(text),
            Err(e) => {
                warn!(error = %e, "Synthesis failed, using fallback summary");
                FallbackSummarizer::for_synthesis(bag, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider};
    use campusfed_core::error::ProviderError;
    use serde_json::json;

    fn settings() -> ModelSettings {
        ModelSettings::new("mock-model")
    }

    #[test]
    fn framing_follows_the_advisory_flag() {
        let mut bag = ContextBag::new();
        assert_eq!(Framing::for_bag(&bag), Framing::Analyst);
        bag.advisory_requested = true;
        assert_eq!(Framing::for_bag(&bag), Framing::Coach);

        let prompt = Synthesizer::prompt(&bag, "what should I do next?");
        assert!(prompt.contains("career coach"));
    }

    #[test]
    fn prompt_carries_query_data_and_error_instructions() {
        let mut bag = ContextBag::new();
        bag.insert("all_student_profiles", json!([{"full_name": "Asha Rao"}]));
        bag.insert_error("jobs_list", "partner catalog unreachable");

        let prompt = Synthesizer::prompt(&bag, "how many students know Python");
        assert!(prompt.contains("data analyst"));
        assert!(prompt.contains("\"how many students know Python\""));
        assert!(prompt.contains("Asha Rao"));
        assert!(prompt.contains("partner catalog unreachable"));
        assert!(prompt.contains("politely explain"));
    }

    #[tokio::test]
    async fn one_call_and_trimmed_text() {
        let provider = Arc::new(SequentialMockProvider::single_text("  Your name is Asha Rao.\n"));
        let synth = Synthesizer::new(provider.clone(), settings());
        let answer = synth.synthesize(&ContextBag::new(), "what is my name").await;

        assert_eq!(answer, Answer::response("Your name is Asha Rao."));
        assert_eq!(provider.call_count(), 1);
        assert!(!provider.requests()[0].json_output);
    }

    #[tokio::test]
    async fn blank_output_is_an_empty_response() {
        let provider = Arc::new(SequentialMockProvider::single_text("   "));
        let synth = Synthesizer::new(provider, settings());
        let err = synth.try_synthesize(&ContextBag::new(), "q").await.unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyResponse));
    }

    #[tokio::test]
    async fn backend_failure_falls_back() {
        let provider = Arc::new(FailingProvider::new(ProviderError::Network("refused".into())));
        let synth = Synthesizer::new(provider.clone(), settings());

        let mut bag = ContextBag::new();
        bag.insert("jobs_list", json!([{"title": "Data Analyst"}]));
        let answer = synth.synthesize(&bag, "show me jobs").await;

        assert!(!answer.is_error());
        assert!(answer.text().contains("1 job listings"));
        assert_eq!(provider.call_count(), 1);
    }
}

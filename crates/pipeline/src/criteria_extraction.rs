//! Secondary extraction of free-text eligibility criteria.
//!
//! Listings whose criteria arrived as prose get one inference call each,
//! up to a per-query cap, asking for the same fixed-shape object the
//! structured path reads. On any failure the listing keeps its
//! `Unstructured` criteria and the filter excludes it.

use campusfed_core::listing::{Criteria, Listing, StructuredCriteria};
use campusfed_core::provider::{ModelSettings, Provider};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::json_extract::json_object;

const MAX_TEXT_CHARS: usize = 2000;

pub struct CriteriaExtractor {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
    max_calls: usize,
}

impl CriteriaExtractor {
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings, max_calls: usize) -> Self {
        Self {
            provider,
            settings,
            max_calls,
        }
    }

    pub fn prompt(title: &str, text: &str) -> String {
        let clipped: String = text.chars().take(MAX_TEXT_CHARS).collect();
        format!(
            "You are a data extraction tool. Read the eligibility text of the listing \"{title}\" \
             and return ONLY a JSON object with exactly these keys:\n\
             {{\"max_income\": integer or null, \"min_percentage\": number or null, \
             \"min_cgpa\": number or null, \"degrees\": [strings], \"required_skills\": [strings]}}\n\
             Use null or [] for anything the text does not state.\n\n\
             Text:\n\"{clipped}\"\n\
             Output:"
        )
    }

    /// Calls allowed for one query.
    pub fn budget(&self) -> usize {
        self.max_calls
    }

    /// Structure `Unstructured` criteria in place, spending at most
    /// `remaining` calls and decrementing it. Returns how many listings
    /// were converted.
    pub async fn structure(&self, listings: &mut [Listing], remaining: &mut usize) -> usize {
        let mut converted = 0;

        for listing in listings.iter_mut() {
            let Criteria::Unstructured(text) = &listing.criteria else {
                continue;
            };
            if *remaining == 0 {
                debug!(cap = self.max_calls, "Criteria extraction cap reached");
                break;
            }
            *remaining -= 1;

            if let Some(criteria) = self.extract_one(&listing.title, text).await {
                listing.criteria = Criteria::Structured(criteria);
                converted += 1;
            }
        }
        converted
    }

    async fn extract_one(&self, title: &str, text: &str) -> Option<StructuredCriteria> {
        let request = self.settings.request(Self::prompt(title, text)).with_json_output();
        let response = match self.provider.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(listing = title, error = %e, "Criteria extraction call failed");
                return None;
            }
        };

        let Some(obj) = json_object(&response.text).ok() else {
            warn!(listing = title, raw = %response.text, "Criteria extraction returned no object");
            return None;
        };
        match StructuredCriteria::from_object(title, &obj) {
            Ok(c) if c.is_empty() => {
                debug!(listing = title, "Nothing extractable from criteria text");
                None
            }
            Ok(c) => Some(c),
            Err(e) => {
                warn!(listing = title, field = %e.field, reason = %e.reason, "Extracted criteria malformed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider};
    use campusfed_core::listing::ListingKind;
    use serde_json::json;

    fn free_text(title: &str) -> Listing {
        Listing::from_value(
            ListingKind::Scholarship,
            json!({"title": title, "eligibility": "Family income below 3 lakh, 75% in Class 12"}),
        )
    }

    #[tokio::test]
    async fn converts_free_text_and_leaves_structured_alone() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            r#"{"max_income": 300000, "min_percentage": 75, "min_cgpa": null, "degrees": [], "required_skills": []}"#,
        ));
        let extractor = CriteriaExtractor::new(provider.clone(), ModelSettings::new("m"), 5);

        let mut listings = vec![
            Listing::from_value(
                ListingKind::Scholarship,
                json!({"title": "Structured", "eligibility_criteria": {"max_income": 1}}),
            ),
            free_text("Prose"),
        ];
        let mut budget = extractor.budget();
        assert_eq!(extractor.structure(&mut listings, &mut budget).await, 1);
        assert_eq!(budget, 4);
        assert_eq!(provider.call_count(), 1);
        assert!(provider.prompt(0).contains("Family income below 3 lakh"));

        match &listings[1].criteria {
            Criteria::Structured(c) => {
                assert_eq!(c.max_income, Some(300_000));
                assert_eq!(c.min_percentage, Some(75.0));
            }
            other => panic!("expected structured criteria, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn call_count_is_capped() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"max_income": 300000}"#,
            r#"{"min_percentage": 60}"#,
        ]));
        let extractor = CriteriaExtractor::new(provider.clone(), ModelSettings::new("m"), 2);
        let mut listings = vec![free_text("a"), free_text("b"), free_text("c")];

        let mut budget = extractor.budget();
        assert_eq!(extractor.structure(&mut listings, &mut budget).await, 2);
        assert_eq!(budget, 0);
        assert_eq!(provider.call_count(), 2);
        assert!(matches!(listings[2].criteria, Criteria::Unstructured(_)));
    }

    #[tokio::test]
    async fn budget_is_shared_across_batches() {
        let provider = Arc::new(SequentialMockProvider::texts(&[r#"{"max_income": 300000}"#]));
        let extractor = CriteriaExtractor::new(provider.clone(), ModelSettings::new("m"), 1);
        let mut jobs = vec![free_text("job")];
        let mut scholarships = vec![free_text("scholarship")];

        let mut budget = extractor.budget();
        assert_eq!(extractor.structure(&mut jobs, &mut budget).await, 1);
        assert_eq!(extractor.structure(&mut scholarships, &mut budget).await, 0);
        assert_eq!(provider.call_count(), 1);
        assert!(matches!(scholarships[0].criteria, Criteria::Unstructured(_)));
    }

    #[tokio::test]
    async fn empty_extraction_stays_unstructured() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            r#"{"max_income": null, "min_percentage": null, "min_cgpa": null, "degrees": [], "required_skills": []}"#,
        ));
        let extractor = CriteriaExtractor::new(provider.clone(), ModelSettings::new("m"), 5);
        let mut listings = vec![free_text("Vague")];

        let mut budget = extractor.budget();
        assert_eq!(extractor.structure(&mut listings, &mut budget).await, 0);
        assert_eq!(provider.call_count(), 1);
        assert!(matches!(listings[0].criteria, Criteria::Unstructured(_)));
    }

    #[tokio::test]
    async fn failures_keep_criteria_unknown() {
        let failing = Arc::new(FailingProvider::unavailable());
        let extractor = CriteriaExtractor::new(failing, ModelSettings::new("m"), 5);
        let mut listings = vec![free_text("a")];
        assert_eq!(extractor.structure(&mut listings, &mut 5).await, 0);
        assert!(matches!(listings[0].criteria, Criteria::Unstructured(_)));

        let garbled = Arc::new(SequentialMockProvider::single_text("no idea, sorry"));
        let extractor = CriteriaExtractor::new(garbled, ModelSettings::new("m"), 5);
        assert_eq!(extractor.structure(&mut listings, &mut 5).await, 0);
    }
}

//! ETL Profile Updater: extracted document text into profile fields.
//!
//! The document type picks an extraction goal; one inference call turns
//! the (clipped) text into a fixed-shape JSON object, and the result is
//! merged into the owner's profile by the store in one transaction.
//! Nothing here raises: every path ends in an [`EtlOutcome`].

use campusfed_core::error::EtlError;
use campusfed_core::provider::{ModelSettings, Provider};
use campusfed_core::store::StudentStore;
use campusfed_core::student::{Profile, ProfileUpdate, StudentId};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::eligibility::CGPA_TO_PERCENTAGE;
use crate::json_extract::json_object;

/// Degree names recognised in document types, with their canonical form.
const KNOWN_DEGREES: &[(&[&str], &str)] = &[
    (&["b.tech", "btech"], "B.Tech"),
    (&["m.tech", "mtech"], "M.Tech"),
    (&["b.e.", "b.e "], "B.E"),
    (&["b.sc", "bsc"], "B.Sc"),
    (&["m.sc", "msc"], "M.Sc"),
    (&["b.com", "bcom"], "B.Com"),
    (&["bca"], "BCA"),
    (&["mca"], "MCA"),
    (&["mba"], "MBA"),
    (&["diploma"], "Diploma"),
];

/// What to pull out of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionGoal {
    Academic,
    Income,
    Skills,
}

impl ExtractionGoal {
    /// `None` for document types we don't extract from.
    pub fn classify(document_type: &str) -> Option<Self> {
        let t = document_type.to_ascii_lowercase();
        if t.contains("income") {
            Some(Self::Income)
        } else if t.contains("resume") || t.contains("skill") || t.split_whitespace().any(|w| w == "cv") {
            Some(Self::Skills)
        } else if t.contains("marksheet") || t.contains("certificate") || t.contains("transcript") {
            Some(Self::Academic)
        } else {
            None
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::Academic => {
                "Extract the final 'percentage' (number) or 'cgpa' (number on a 10-point scale), \
                 and the 'degree' name if one is stated. \
                 Return as JSON: {\"percentage\": 85.2, \"cgpa\": null, \"degree\": \"B.Tech\"}"
            }
            Self::Income => {
                "Extract the final annual 'income' (integer, in rupees). Return as JSON: {\"income\": 500000}"
            }
            Self::Skills => {
                "Extract the technical 'skills' listed. Return as JSON: {\"skills\": [\"Python\", \"SQL\"]}"
            }
        }
    }
}

/// Canonical degree named by a document type, e.g. "B.Tech Certificate".
pub fn degree_from_document_type(document_type: &str) -> Option<&'static str> {
    let t = format!("{} ", document_type.to_ascii_lowercase());
    KNOWN_DEGREES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| t.contains(n)))
        .map(|(_, canonical)| *canonical)
}

/// Result of one profile update attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EtlOutcome {
    /// The document type has no extraction goal, or nothing was extracted.
    Skipped { reason: String },
    Merged {
        goal: ExtractionGoal,
        update: ProfileUpdate,
        profile: Profile,
    },
    /// The update was aborted; the profile is unchanged.
    Failed { reason: String },
}

pub struct ProfileUpdater {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
    store: Arc<dyn StudentStore>,
    max_text_chars: usize,
}

impl ProfileUpdater {
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: ModelSettings,
        store: Arc<dyn StudentStore>,
        max_text_chars: usize,
    ) -> Self {
        Self {
            provider,
            settings,
            store,
            max_text_chars,
        }
    }

    pub fn prompt(&self, goal: ExtractionGoal, document_type: &str, extracted_text: &str) -> String {
        let clipped: String = extracted_text.chars().take(self.max_text_chars).collect();
        format!(
            "You are a data extraction tool. From the following raw text from a {document_type}, \
             perform the following task: {instruction}\n\n\
             Raw Text:\n\"{clipped}\"\n\n\
             Return ONLY the JSON output.\n\
             Output:",
            instruction = goal.instruction(),
        )
    }

    /// Extract and merge. Failures are logged and reported, never raised.
    pub async fn update_profile(&self, owner: StudentId, document_type: &str, extracted_text: &str) -> EtlOutcome {
        let Some(goal) = ExtractionGoal::classify(document_type) else {
            debug!(student_id = %owner, document_type, "No extraction goal for document type");
            return EtlOutcome::Skipped {
                reason: format!("no extraction goal for document type {document_type:?}"),
            };
        };

        match self.try_update(owner, goal, document_type, extracted_text).await {
            Ok(Some((update, profile))) => {
                info!(student_id = %owner, ?goal, "Profile updated from document");
                EtlOutcome::Merged { goal, update, profile }
            }
            Ok(None) => EtlOutcome::Skipped {
                reason: "nothing extracted".into(),
            },
            Err(e) => {
                warn!(student_id = %owner, document_type, error = %e, "Profile update aborted");
                EtlOutcome::Failed { reason: e.to_string() }
            }
        }
    }

    async fn try_update(
        &self,
        owner: StudentId,
        goal: ExtractionGoal,
        document_type: &str,
        extracted_text: &str,
    ) -> Result<Option<(ProfileUpdate, Profile)>, EtlError> {
        if self.store.get_profile(owner).await.map_err(EtlError::Store)?.is_none() {
            return Err(EtlError::UnknownStudent(owner.0));
        }

        let request = self
            .settings
            .request(self.prompt(goal, document_type, extracted_text))
            .with_json_output();
        let response = self.provider.complete(request).await.map_err(EtlError::Inference)?;
        debug!(raw = %response.text, "Extraction output");

        let obj = json_object(&response.text).ok().ok_or_else(|| EtlError::MalformedOutput {
            raw: response.text.clone(),
        })?;
        let update = parse_update(goal, &obj, document_type);
        if update.is_empty() {
            return Ok(None);
        }

        let profile = self
            .store
            .merge_profile(owner, &update)
            .await
            .map_err(EtlError::Store)?
            .ok_or(EtlError::UnknownStudent(owner.0))?;
        Ok(Some((update, profile)))
    }
}

/// Read the goal's fields from the extraction object. Unusable values are
/// dropped rather than guessed.
pub fn parse_update(goal: ExtractionGoal, obj: &Map<String, Value>, document_type: &str) -> ProfileUpdate {
    let mut update = ProfileUpdate::default();
    match goal {
        ExtractionGoal::Academic => {
            let percentage = obj
                .get("percentage")
                .and_then(lenient_number)
                .or_else(|| obj.get("cgpa").and_then(lenient_number).map(|c| c * CGPA_TO_PERCENTAGE));
            update.percentage = percentage.filter(|p| (0.0..=100.0).contains(p));

            if let Some(degree) = obj.get("degree").and_then(Value::as_str).map(str::trim)
                && !degree.is_empty()
            {
                update.degrees.insert(degree.to_string());
            }
            if let Some(degree) = degree_from_document_type(document_type) {
                update.degrees.insert(degree.to_string());
            }
        }
        ExtractionGoal::Income => {
            update.annual_income = obj
                .get("income")
                .or_else(|| obj.get("annual_income"))
                .and_then(lenient_number)
                .map(|n| n.round() as u64);
        }
        ExtractionGoal::Skills => {
            if let Some(items) = obj.get("skills").and_then(Value::as_array) {
                update.skills = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
        }
    }
    update
}

fn lenient_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .chars()
            .filter(|c| !matches!(c, ',' | '%' | ' '))
            .collect::<String>()
            .parse()
            .ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider};
    use campusfed_core::student::NewStudent;
    use campusfed_store::InMemoryStore;
    use serde_json::json;

    async fn store_with_student() -> (Arc<dyn StudentStore>, StudentId) {
        let store: Arc<dyn StudentStore> = Arc::new(InMemoryStore::new());
        let id = store
            .create_student(NewStudent {
                full_name: "Asha Rao".into(),
                email: "asha@example.com".into(),
                phone_number: None,
            })
            .await
            .unwrap();
        (store, id)
    }

    fn updater(provider: Arc<dyn Provider>, store: Arc<dyn StudentStore>) -> ProfileUpdater {
        ProfileUpdater::new(provider, ModelSettings::new("mock-model"), store, 1000)
    }

    #[test]
    fn document_types_classify() {
        assert_eq!(ExtractionGoal::classify("Class 12 Marksheet"), Some(ExtractionGoal::Academic));
        assert_eq!(ExtractionGoal::classify("B.Tech Certificate"), Some(ExtractionGoal::Academic));
        assert_eq!(ExtractionGoal::classify("Income Certificate"), Some(ExtractionGoal::Income));
        assert_eq!(ExtractionGoal::classify("Resume"), Some(ExtractionGoal::Skills));
        assert_eq!(ExtractionGoal::classify("Python Skill Certificate"), Some(ExtractionGoal::Skills));
        assert_eq!(ExtractionGoal::classify("Aadhaar Card"), None);
    }

    #[test]
    fn degrees_inferred_from_document_type() {
        assert_eq!(degree_from_document_type("B.Tech Certificate"), Some("B.Tech"));
        assert_eq!(degree_from_document_type("Diploma Certificate"), Some("Diploma"));
        assert_eq!(degree_from_document_type("Class 10 Marksheet"), None);
    }

    #[test]
    fn cgpa_converts_to_percentage() {
        let obj = json!({"percentage": null, "cgpa": 8.0}).as_object().unwrap().clone();
        let update = parse_update(ExtractionGoal::Academic, &obj, "B.Tech Marksheet");
        assert_eq!(update.percentage, Some(76.0));
        assert!(update.degrees.contains("B.Tech"));
    }

    #[test]
    fn out_of_range_values_are_dropped() {
        let obj = json!({"percentage": 850}).as_object().unwrap().clone();
        assert!(parse_update(ExtractionGoal::Academic, &obj, "Marksheet").is_empty());

        let obj = json!({"income": "-5"}).as_object().unwrap().clone();
        assert!(parse_update(ExtractionGoal::Income, &obj, "Income Certificate").is_empty());

        let obj = json!({"income": "5,00,000"}).as_object().unwrap().clone();
        assert_eq!(
            parse_update(ExtractionGoal::Income, &obj, "Income Certificate").annual_income,
            Some(500_000)
        );
    }

    #[tokio::test]
    async fn prompt_clips_the_text() {
        let (store, _) = store_with_student().await;
        let mut u = updater(Arc::new(FailingProvider::unavailable()), store);
        u.max_text_chars = 10;
        let prompt = u.prompt(ExtractionGoal::Income, "Income Certificate", &"x".repeat(50));
        assert!(prompt.contains(&format!("\"{}\"", "x".repeat(10))));
        assert!(!prompt.contains(&"x".repeat(11)));
    }

    #[tokio::test]
    async fn merges_into_the_owner_profile() {
        let (store, id) = store_with_student().await;
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "```json\n{\"percentage\": 82.5}\n```",
            "{\"percentage\": 70.0}",
        ]));
        let u = updater(provider.clone(), store.clone());

        let first = u.update_profile(id, "B.Tech Certificate", "Aggregate 82.5%").await;
        assert!(matches!(first, EtlOutcome::Merged { goal: ExtractionGoal::Academic, .. }));
        let second = u.update_profile(id, "Class 12 Marksheet", "Total 70%").await;
        match second {
            EtlOutcome::Merged { profile, .. } => {
                assert_eq!(profile.highest_percentage, 82.5);
                assert!(profile.has_degree("b.tech"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(provider.requests().iter().all(|r| r.json_output));
    }

    #[tokio::test]
    async fn unrecognised_types_make_no_call() {
        let (store, id) = store_with_student().await;
        let provider = Arc::new(FailingProvider::unavailable());
        let outcome = updater(provider.clone(), store).update_profile(id, "Photo", "...").await;
        assert!(matches!(outcome, EtlOutcome::Skipped { .. }));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_output_leaves_the_profile_alone() {
        let (store, id) = store_with_student().await;
        let provider = Arc::new(SequentialMockProvider::single_text("income is about five lakh"));
        let outcome = updater(provider, store.clone())
            .update_profile(id, "Income Certificate", "Annual income Rs 5,00,000")
            .await;

        assert!(matches!(outcome, EtlOutcome::Failed { .. }));
        assert_eq!(store.get_profile(id).await.unwrap().unwrap().annual_income, None);
    }

    #[tokio::test]
    async fn inference_failure_and_unknown_student_are_reported() {
        let (store, id) = store_with_student().await;
        let outcome = updater(Arc::new(FailingProvider::unavailable()), store.clone())
            .update_profile(id, "Resume", "Python, SQL")
            .await;
        assert!(matches!(outcome, EtlOutcome::Failed { .. }));

        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let outcome = updater(provider.clone(), store)
            .update_profile(StudentId(999), "Resume", "Python")
            .await;
        match outcome {
            EtlOutcome::Failed { reason } => assert!(reason.contains("999")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn skills_union_across_documents() {
        let (store, id) = store_with_student().await;
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"skills": ["Python", "SQL"]}"#,
            r#"{"skills": ["SQL", "Power BI"]}"#,
        ]));
        let u = updater(provider, store.clone());
        u.update_profile(id, "Resume", "...").await;
        u.update_profile(id, "Skill Certificate", "...").await;

        let profile = store.get_profile(id).await.unwrap().unwrap();
        assert_eq!(profile.verified_skills.len(), 3);
    }
}

//! Decomposer: natural-language query to an ordered tool plan.
//!
//! One inference call, grounded by the catalog text generated from the
//! connector registry. The reply is parsed with the two-stage JSON
//! recovery in [`crate::json_extract`]; unknown tool names are dropped.

use campusfed_core::error::DecompositionError;
use campusfed_core::provider::{ModelSettings, Provider};
use campusfed_core::student::StudentId;
use campusfed_core::tool::{ConnectorRegistry, Plan};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::json_extract::json_array;

/// Multi-tool examples that no single connector can express on its own.
const COMBINED_EXAMPLES: &[(&str, &str)] = &[
    (
        "Am I eligible for any scholarship?",
        r#"["GET_STUDENT_PROFILE", "GET_ALL_SCHOLARSHIPS"]"#,
    ),
    (
        "Which jobs or scholarships can I apply to?",
        r#"["GET_STUDENT_PROFILE", "GET_ALL_JOBS", "GET_ALL_SCHOLARSHIPS"]"#,
    ),
    (
        "What career should I pursue with my skills?",
        r#"["GET_CAREER_ADVICE", "GET_STUDENT_PROFILE", "GET_ALL_JOBS"]"#,
    ),
    ("Hello", "[]"),
];

pub struct Decomposer {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
    catalog: String,
}

impl Decomposer {
    /// The catalog text is rendered once from the registry.
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings, registry: &ConnectorRegistry) -> Self {
        Self {
            provider,
            settings,
            catalog: registry.catalog_prompt(),
        }
    }

    pub fn prompt(&self, query_text: &str, caller: Option<StudentId>) -> String {
        let identity = match caller {
            Some(id) => format!("The query is asked by the logged-in student with id {id}; \"my\" and \"I\" refer to this student."),
            None => "The query has no logged-in student. Tools about \"my\" data will fail, prefer tools over all students.".to_string(),
        };

        let mut examples = String::new();
        for (query, plan) in COMBINED_EXAMPLES {
            examples.push_str(&format!("Query: \"{query}\" -> {plan}\n"));
        }

        format!(
            "You are the query planner of a student eligibility service.\n\
             Decide which tools must run to answer the user's query.\n\
             Respond with ONLY a JSON array of tool names, e.g. [\"GET_ALL_JOBS\"].\n\
             Use only the tools listed below, each at most once.\n\
             If the query is conversational or unrelated to students, jobs, scholarships or documents, respond with [].\n\
             Add GET_CAREER_ADVICE when the user wants recommendations or guidance rather than facts.\n\n\
             {catalog}\n\
             {examples}\n\
             {identity}\n\n\
             Query: \"{query_text}\"\n\
             Output:",
            catalog = self.catalog,
        )
    }

    /// Produce a plan. Blank queries are sent too; the model decides.
    pub async fn decompose(&self, query_text: &str, caller: Option<StudentId>) -> Result<Plan, DecompositionError> {
        let request = self
            .settings
            .request(self.prompt(query_text, caller))
            .with_json_output();

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Decomposition call failed");
            DecompositionError::BackendUnavailable(e)
        })?;

        debug!(raw = %response.text, "Decomposer output");
        let plan = parse_plan(&response.text)?;
        debug!(tools = ?plan.tools(), "Parsed plan");
        Ok(plan)
    }
}

/// Parse a tool list out of model output.
pub fn parse_plan(raw: &str) -> Result<Plan, DecompositionError> {
    let items = json_array(raw).ok().ok_or_else(|| DecompositionError::InvalidResponse {
        raw: raw.to_string(),
    })?;
    Ok(Plan::from_names(items.iter().filter_map(Value::as_str)))
}

//! QueryPipeline: Query in, Answer out.
//!
//! Decomposer -> Executor -> eligibility stage -> Truncator -> Synthesizer.
//! Any stage failure short-circuits to the Fallback Summarizer; nothing is
//! raised to the caller.

use campusfed_core::context::ContextBag;
use campusfed_core::listing::{Listing, ListingKind};
use campusfed_core::provider::{ModelSettings, Provider};
use campusfed_core::query::{Answer, Query};
use campusfed_core::store::StudentStore;
use campusfed_core::student::{Profile, StudentId};
use campusfed_core::tool::{ConnectorRegistry, Plan};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::criteria_extraction::CriteriaExtractor;
use crate::decomposer::Decomposer;
use crate::eligibility::{EligibilityOptions, filter_eligible};
use crate::executor::{Executor, ExecutorOptions};
use crate::fallback::FallbackSummarizer;
use crate::synthesizer::Synthesizer;
use crate::truncate::{DEFAULT_MAX_ITEMS, truncate};

/// Listing fields the eligibility stage reads, and the fields it writes.
const ELIGIBILITY_FIELDS: &[(&str, &str, ListingKind)] = &[
    ("jobs_list", "eligible_jobs", ListingKind::Job),
    ("scholarships_list", "eligible_scholarships", ListingKind::Scholarship),
];

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_items_per_field: usize,
    pub executor: ExecutorOptions,
    pub eligibility: EligibilityOptions,
    /// `Some(cap)` enables secondary criteria extraction with at most
    /// `cap` inference calls per query.
    pub criteria_extraction: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_items_per_field: DEFAULT_MAX_ITEMS,
            executor: ExecutorOptions::default(),
            eligibility: EligibilityOptions::default(),
            criteria_extraction: None,
        }
    }
}

impl From<&campusfed_config::PipelineConfig> for PipelineOptions {
    fn from(config: &campusfed_config::PipelineConfig) -> Self {
        Self {
            max_items_per_field: config.max_items_per_field,
            executor: ExecutorOptions::from(config),
            eligibility: EligibilityOptions::from(&config.eligibility),
            criteria_extraction: config
                .extract_unstructured_criteria
                .then_some(config.max_criteria_extractions),
        }
    }
}

/// Everything one query produced, for callers that want to show their work.
#[derive(Debug, Clone, Serialize)]
pub struct QueryTrace {
    pub query_id: Uuid,
    /// `None` when decomposition failed.
    pub plan: Option<Plan>,
    /// The bag handed to synthesis (after eligibility and truncation).
    pub context: Option<ContextBag>,
    pub answer: Answer,
}

pub struct QueryPipeline {
    decomposer: Decomposer,
    executor: Executor,
    synthesizer: Synthesizer,
    criteria: Option<CriteriaExtractor>,
    store: Arc<dyn StudentStore>,
    options: PipelineOptions,
}

impl QueryPipeline {
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: ModelSettings,
        registry: Arc<ConnectorRegistry>,
        store: Arc<dyn StudentStore>,
        options: PipelineOptions,
    ) -> Self {
        let decomposer = Decomposer::new(provider.clone(), settings.clone(), &registry);
        let criteria = options
            .criteria_extraction
            .map(|cap| CriteriaExtractor::new(provider.clone(), settings.clone(), cap));
        Self {
            decomposer,
            executor: Executor::new(registry, options.executor),
            synthesizer: Synthesizer::new(provider, settings),
            criteria,
            store,
            options,
        }
    }

    /// Build from loaded configuration.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        registry: Arc<ConnectorRegistry>,
        store: Arc<dyn StudentStore>,
        config: &campusfed_config::AppConfig,
    ) -> Self {
        let settings = ModelSettings {
            model: config.inference.model.clone(),
            temperature: config.inference.temperature,
            max_tokens: config.inference.max_tokens,
        };
        Self::new(provider, settings, registry, store, PipelineOptions::from(&config.pipeline))
    }

    pub async fn answer(&self, query: &Query) -> Answer {
        self.answer_with_trace(query).await.answer
    }

    pub async fn answer_with_trace(&self, query: &Query) -> QueryTrace {
        let query_id = Uuid::new_v4();
        let span = info_span!(
            "query",
            %query_id,
            student_id = ?query.caller,
        );
        self.run(query_id, query).instrument(span).await
    }

    async fn run(&self, query_id: Uuid, query: &Query) -> QueryTrace {
        info!(blank = query.is_blank(), "Decomposing query");
        let plan = match self.decomposer.decompose(&query.text, query.caller).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(reason = e.reason(), error = %e, "Decomposition failed");
                return QueryTrace {
                    query_id,
                    plan: None,
                    context: None,
                    answer: FallbackSummarizer::for_decomposition(&e),
                };
            }
        };

        info!(tools = ?plan.tools(), "Executing plan");
        let mut bag = self.executor.execute(&plan, query.caller).await;
        if bag.is_error() {
            info!(error = ?bag.error, "Bag carries an error, answering with fallback");
            let answer = FallbackSummarizer::for_bag(&bag);
            return QueryTrace {
                query_id,
                plan: Some(plan),
                context: Some(bag),
                answer,
            };
        }

        if let Some(owner) = query.caller {
            self.apply_eligibility(&mut bag, owner).await;
        }
        let bag = truncate(bag, self.options.max_items_per_field);

        info!(fields = bag.fields.len(), failed = bag.failed_fields().len(), "Synthesizing");
        let answer = self.synthesizer.synthesize(&bag, &query.text).await;
        QueryTrace {
            query_id,
            plan: Some(plan),
            context: Some(bag),
            answer,
        }
    }

    /// Add `eligible_*` fields for every listing field that was fetched.
    async fn apply_eligibility(&self, bag: &mut ContextBag, owner: StudentId) {
        let fetched: Vec<(&str, Vec<Value>, ListingKind)> = ELIGIBILITY_FIELDS
            .iter()
            .filter_map(|(source, target, kind)| match bag.get(source) {
                Some(Value::Array(items)) => Some((*target, items.clone(), *kind)),
                _ => None,
            })
            .collect();
        if fetched.is_empty() {
            return;
        }

        let Some(profile) = self.caller_profile(bag, owner).await else {
            for (target, _, _) in &fetched {
                bag.insert_error(*target, format!("no profile on file for student {owner}"));
            }
            return;
        };

        let mut extraction_budget = self.criteria.as_ref().map_or(0, |e| e.budget());
        for (target, items, kind) in fetched {
            let mut listings = Listing::from_array(kind, &items);
            if let Some(extractor) = &self.criteria {
                extractor.structure(&mut listings, &mut extraction_budget).await;
            }
            let eligible = filter_eligible(listings, &profile, self.options.eligibility);
            info!(field = target, kept = eligible.len(), of = items.len(), "Eligibility filter applied");
            bag.insert(target, Value::Array(eligible.into_iter().map(|l| l.raw).collect()));
        }
    }

    /// The caller's profile: from the bag if the plan fetched it, otherwise
    /// straight from the store.
    async fn caller_profile(&self, bag: &ContextBag, owner: StudentId) -> Option<Profile> {
        if let Some(value) = bag.get("student_profile")
            && let Ok(profile) = serde_json::from_value::<Profile>(value.clone())
        {
            return Some(profile);
        }

        debug!(student_id = %owner, "Loading caller profile for eligibility");
        match self.store.get_profile(owner).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(student_id = %owner, error = %e, "Could not load caller profile");
                None
            }
        }
    }
}

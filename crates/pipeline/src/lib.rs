//! The federated query pipeline: the heart of CampusFed.
//!
//! A query flows through fixed stages:
//!
//! 1. **Decompose** the question into a plan of catalog tools (one inference call)
//! 2. **Execute** the plan against the source connectors, tolerating per-tool failures
//! 3. **Filter** fetched jobs and scholarships against the caller's profile
//! 4. **Truncate** list fields so the context fits the backend
//! 5. **Synthesize** the answer (one inference call)
//!
//! Any stage failure short-circuits to the deterministic fallback summarizer.
//! The ETL profile updater lives here too, since it shares the inference
//! plumbing and the JSON recovery parser.

pub mod criteria_extraction;
pub mod decomposer;
pub mod eligibility;
pub mod etl;
pub mod executor;
pub mod fallback;
pub mod json_extract;
pub mod orchestrator;
pub mod synthesizer;
pub mod truncate;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use criteria_extraction::CriteriaExtractor;
pub use decomposer::{Decomposer, parse_plan};
pub use eligibility::{EligibilityOptions, filter_eligible};
pub use etl::{EtlOutcome, ExtractionGoal, ProfileUpdater};
pub use executor::{Executor, ExecutorOptions};
pub use fallback::FallbackSummarizer;
pub use orchestrator::{PipelineOptions, QueryPipeline, QueryTrace};
pub use synthesizer::{Framing, Synthesizer};
pub use truncate::truncate;

//! Partner catalog connectors: all jobs, all scholarships.

use async_trait::async_trait;
use campusfed_core::error::ToolError;
use campusfed_core::tool::{SourceConnector, ToolContext, ToolName};
use serde_json::Value;
use std::sync::Arc;

use crate::catalog::CatalogClient;

/// `GET_ALL_JOBS`
pub struct JobsConnector {
    catalog: Arc<CatalogClient>,
}

impl JobsConnector {
    pub fn new(catalog: Arc<CatalogClient>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl SourceConnector for JobsConnector {
    fn tool(&self) -> ToolName {
        ToolName::GetAllJobs
    }

    fn description(&self) -> &str {
        "Job listings from the partner catalog, with their eligibility criteria."
    }

    fn examples(&self) -> &[&'static str] {
        &["how many jobs are there", "show me jobs I'm eligible for"]
    }

    async fn invoke(&self, _ctx: &ToolContext) -> Result<Value, ToolError> {
        self.catalog.jobs().await.map(Value::Array)
    }
}

/// `GET_ALL_SCHOLARSHIPS`
pub struct ScholarshipsConnector {
    catalog: Arc<CatalogClient>,
}

impl ScholarshipsConnector {
    pub fn new(catalog: Arc<CatalogClient>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl SourceConnector for ScholarshipsConnector {
    fn tool(&self) -> ToolName {
        ToolName::GetAllScholarships
    }

    fn description(&self) -> &str {
        "Scholarship listings from the partner catalog, with income and academic criteria."
    }

    fn examples(&self) -> &[&'static str] {
        &["show me all scholarships", "am I eligible for any scholarship"]
    }

    async fn invoke(&self, _ctx: &ToolContext) -> Result<Value, ToolError> {
        self.catalog.scholarships().await.map(Value::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{partner_app, spawn};
    use std::time::Duration;

    #[tokio::test]
    async fn listing_connectors_return_arrays() {
        let base = spawn(partner_app()).await;
        let catalog = Arc::new(CatalogClient::new(base, Duration::from_secs(5)).unwrap());

        let jobs = JobsConnector::new(catalog.clone())
            .invoke(&ToolContext::default())
            .await
            .unwrap();
        assert_eq!(jobs.as_array().unwrap().len(), 2);

        let scholarships = ScholarshipsConnector::new(catalog)
            .invoke(&ToolContext::default())
            .await
            .unwrap();
        assert!(scholarships.is_array());
    }
}

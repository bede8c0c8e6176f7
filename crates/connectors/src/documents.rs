//! Document record connectors.

use async_trait::async_trait;
use campusfed_core::error::ToolError;
use campusfed_core::store::StudentStore;
use campusfed_core::tool::{SourceConnector, ToolContext, ToolName};
use serde_json::Value;
use std::sync::Arc;

use crate::profiles::{encode, store_failure};

/// `GET_STUDENT_DOCUMENTS`: the caller's documents, every status, newest first.
pub struct StudentDocumentsConnector {
    store: Arc<dyn StudentStore>,
}

impl StudentDocumentsConnector {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SourceConnector for StudentDocumentsConnector {
    fn tool(&self) -> ToolName {
        ToolName::GetStudentDocuments
    }

    fn description(&self) -> &str {
        "The asking student's uploaded documents with type and verification status (Pending, Verified, Rejected)."
    }

    fn examples(&self) -> &[&'static str] {
        &["which documents of mine are verified", "show me my documents"]
    }

    async fn invoke(&self, ctx: &ToolContext) -> Result<Value, ToolError> {
        let tool = self.tool();
        let owner = ctx.require_caller(tool)?;
        let docs = self
            .store
            .list_documents(owner)
            .await
            .map_err(|e| store_failure(tool, e))?;
        encode(tool, &docs)
    }
}

/// `GET_ALL_DOCUMENTS`: every document record in the store.
pub struct AllDocumentsConnector {
    store: Arc<dyn StudentStore>,
}

impl AllDocumentsConnector {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SourceConnector for AllDocumentsConnector {
    fn tool(&self) -> ToolName {
        ToolName::GetAllDocuments
    }

    fn description(&self) -> &str {
        "Document records of all students. Use for counting documents or verification backlogs."
    }

    fn examples(&self) -> &[&'static str] {
        &["how many documents are still pending"]
    }

    async fn invoke(&self, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let tool = self.tool();
        let docs = self
            .store
            .list_all_documents()
            .await
            .map_err(|e| store_failure(tool, e))?;
        encode(tool, &docs)
    }
}

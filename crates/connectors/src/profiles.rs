//! Profile store connectors: the caller's own profile, or every profile.

use async_trait::async_trait;
use campusfed_core::error::{StoreError, ToolError};
use campusfed_core::store::StudentStore;
use campusfed_core::tool::{SourceConnector, ToolContext, ToolName};
use serde_json::Value;
use std::sync::Arc;

pub(crate) fn store_failure(tool: ToolName, e: StoreError) -> ToolError {
    ToolError::Upstream {
        tool: tool.to_string(),
        reason: e.to_string(),
    }
}

pub(crate) fn encode<T: serde::Serialize>(tool: ToolName, value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Malformed {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// `GET_STUDENT_PROFILE`: the caller's structured profile.
pub struct StudentProfileConnector {
    store: Arc<dyn StudentStore>,
}

impl StudentProfileConnector {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SourceConnector for StudentProfileConnector {
    fn tool(&self) -> ToolName {
        ToolName::GetStudentProfile
    }

    fn description(&self) -> &str {
        "The asking student's own profile: name, highest percentage, degrees, annual income, verified skills."
    }

    fn examples(&self) -> &[&'static str] {
        &["what is my name", "what is my highest percentage"]
    }

    async fn invoke(&self, ctx: &ToolContext) -> Result<Value, ToolError> {
        let tool = self.tool();
        let owner = ctx.require_caller(tool)?;
        let profile = self
            .store
            .get_profile(owner)
            .await
            .map_err(|e| store_failure(tool, e))?
            .ok_or_else(|| ToolError::NotFound(format!("no profile for student {owner}")))?;
        encode(tool, &profile)
    }
}

/// `GET_ALL_STUDENT_PROFILES`: every student's profile, for aggregate questions.
pub struct AllProfilesConnector {
    store: Arc<dyn StudentStore>,
}

impl AllProfilesConnector {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SourceConnector for AllProfilesConnector {
    fn tool(&self) -> ToolName {
        ToolName::GetAllStudentProfiles
    }

    fn description(&self) -> &str {
        "Profiles of all students. Use for counting or comparing students (skills, percentages, incomes)."
    }

    fn examples(&self) -> &[&'static str] {
        &["how many students know Python"]
    }

    async fn invoke(&self, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let tool = self.tool();
        let profiles = self.store.list_profiles().await.map_err(|e| store_failure(tool, e))?;
        encode(tool, &profiles)
    }
}

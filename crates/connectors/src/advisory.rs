//! `GET_CAREER_ADVICE`: fetches nothing; its presence in a plan switches the
//! Synthesizer to the coaching framing.

use async_trait::async_trait;
use campusfed_core::error::ToolError;
use campusfed_core::tool::{SourceConnector, ToolContext, ToolName};
use serde_json::Value;

pub struct CareerAdviceConnector;

#[async_trait]
impl SourceConnector for CareerAdviceConnector {
    fn tool(&self) -> ToolName {
        ToolName::GetCareerAdvice
    }

    fn description(&self) -> &str {
        "Marks the question as a request for advice or recommendations. Combine with the data tools the advice should draw on."
    }

    fn examples(&self) -> &[&'static str] {
        &["what should I do to get a better job"]
    }

    async fn invoke(&self, _ctx: &ToolContext) -> Result<Value, ToolError> {
        Ok(Value::Null)
    }
}

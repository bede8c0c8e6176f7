//! HTTP client for the partner catalog (jobs and scholarships).
//!
//! The catalog is unauthenticated and unpaginated: `GET {base}/api/jobs` and
//! `GET {base}/api/scholarships` each return the full JSON array.

use campusfed_core::error::ToolError;
use campusfed_core::tool::ToolName;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct CatalogClient {
    base_url: String,
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Upstream {
                tool: "catalog".into(),
                reason: format!("HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &campusfed_config::CatalogConfig) -> Result<Self, ToolError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn jobs(&self) -> Result<Vec<Value>, ToolError> {
        self.fetch_array(ToolName::GetAllJobs, "/api/jobs").await
    }

    pub async fn scholarships(&self) -> Result<Vec<Value>, ToolError> {
        self.fetch_array(ToolName::GetAllScholarships, "/api/scholarships").await
    }

    async fn fetch_array(&self, tool: ToolName, path: &str) -> Result<Vec<Value>, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%tool, %url, "Fetching catalog listings");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(%tool, error = %e, "Catalog unreachable");
            ToolError::Upstream {
                tool: tool.to_string(),
                reason: if e.is_timeout() {
                    "partner catalog timed out".to_string()
                } else {
                    format!("partner catalog unreachable: {e}")
                },
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Upstream {
                tool: tool.to_string(),
                reason: format!("partner catalog returned HTTP {}", status.as_u16()),
            });
        }

        let body: Value = response.json().await.map_err(|e| ToolError::Malformed {
            tool: tool.to_string(),
            reason: format!("body is not JSON: {e}"),
        })?;

        match body {
            Value::Array(items) => Ok(items),
            other => Err(ToolError::Malformed {
                tool: tool.to_string(),
                reason: format!("expected a JSON array, got {}", short_kind(&other)),
            }),
        }
    }
}

fn short_kind(v: &Value) -> &'static str {
    match v {
        Value::Object(_) => "an object",
        Value::String(_) => "a string",
        Value::Null => "null",
        _ => "a scalar",
    }
}

//! Tool Executor: runs a plan against the connector registry.
//!
//! Each tool call is wrapped on its own, with an explicit timeout. A failure
//! becomes an error marker under that tool's field and the batch carries on.

use campusfed_core::context::ContextBag;
use campusfed_core::error::ToolError;
use campusfed_core::student::StudentId;
use campusfed_core::tool::{ConnectorRegistry, Plan, ToolContext, ToolName};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info_span, warn};

#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    pub tool_timeout: Duration,
    /// Run tools concurrently. Results land under fixed field keys, so the
    /// bag is the same either way.
    pub parallel: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(15),
            parallel: false,
        }
    }
}

impl From<&campusfed_config::PipelineConfig> for ExecutorOptions {
    fn from(config: &campusfed_config::PipelineConfig) -> Self {
        Self {
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            parallel: config.parallel_tools,
        }
    }
}

pub struct Executor {
    registry: Arc<ConnectorRegistry>,
    options: ExecutorOptions,
}

impl Executor {
    pub fn new(registry: Arc<ConnectorRegistry>, options: ExecutorOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Run every planned tool and assemble the bag.
    pub async fn execute(&self, plan: &Plan, caller: Option<StudentId>) -> ContextBag {
        if plan.is_empty() {
            debug!("Empty plan, nothing to execute");
            return ContextBag::no_tools();
        }

        let ctx = ToolContext::new(caller);
        let outcomes = if self.options.parallel {
            join_all(plan.tools().iter().map(|tool| self.run_one(*tool, &ctx))).await
        } else {
            let mut outcomes = Vec::with_capacity(plan.len());
            for tool in plan.tools() {
                outcomes.push(self.run_one(*tool, &ctx).await);
            }
            outcomes
        };

        let mut bag = ContextBag::new();
        for (tool, outcome) in outcomes {
            if tool == ToolName::GetCareerAdvice {
                bag.advisory_requested = true;
            }
            let Some(field) = tool.field() else {
                continue;
            };
            match outcome {
                Ok(value) => bag.insert(field, value),
                Err(e) => {
                    warn!(tool = %tool, field, error = %e, "Tool failed, recording error marker");
                    bag.insert_error(field, e.to_string());
                }
            }
        }
        bag
    }

    async fn run_one(&self, tool: ToolName, ctx: &ToolContext) -> (ToolName, Result<Value, ToolError>) {
        let timeout = self.options.tool_timeout;
        let span = info_span!("tool", tool = %tool);
        let outcome = async {
            debug!("Invoking connector");
            match tokio::time::timeout(timeout, self.registry.invoke(tool, ctx)).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    timeout_secs: timeout.as_secs(),
                }),
            }
        }
        .instrument(span)
        .await;
        (tool, outcome)
    }
}

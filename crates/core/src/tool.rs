//! Tool catalog: the closed set of federated data operations.
//!
//! A tool is a named operation that fetches one category of data from one
//! federated source. The Decomposer chooses tools by name, the Executor
//! dispatches them through the `ConnectorRegistry`, and the registry also
//! renders the catalog description embedded in the Decomposer's prompt, so
//! grounding and dispatch always come from the same table.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;
use crate::student::StudentId;

/// Every tool the Decomposer may request. Order here is catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolName {
    GetStudentProfile,
    GetAllStudentProfiles,
    GetStudentDocuments,
    GetAllDocuments,
    GetAllJobs,
    GetAllScholarships,
    GetCareerAdvice,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        Self::GetStudentProfile,
        Self::GetAllStudentProfiles,
        Self::GetStudentDocuments,
        Self::GetAllDocuments,
        Self::GetAllJobs,
        Self::GetAllScholarships,
        Self::GetCareerAdvice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetStudentProfile => "GET_STUDENT_PROFILE",
            Self::GetAllStudentProfiles => "GET_ALL_STUDENT_PROFILES",
            Self::GetStudentDocuments => "GET_STUDENT_DOCUMENTS",
            Self::GetAllDocuments => "GET_ALL_DOCUMENTS",
            Self::GetAllJobs => "GET_ALL_JOBS",
            Self::GetAllScholarships => "GET_ALL_SCHOLARSHIPS",
            Self::GetCareerAdvice => "GET_CAREER_ADVICE",
        }
    }

    /// The ContextBag field this tool writes. `None` for the advisory tool,
    /// which only raises the `advisory_requested` flag.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::GetStudentProfile => Some("student_profile"),
            Self::GetAllStudentProfiles => Some("all_student_profiles"),
            Self::GetStudentDocuments => Some("student_documents"),
            Self::GetAllDocuments => Some("all_documents"),
            Self::GetAllJobs => Some("jobs_list"),
            Self::GetAllScholarships => Some("scholarships_list"),
            Self::GetCareerAdvice => None,
        }
    }

    /// Whether the tool is scoped to the caller and fails without one.
    pub fn requires_caller(&self) -> bool {
        matches!(self, Self::GetStudentProfile | Self::GetStudentDocuments)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ToolError::NotRegistered(wanted.to_string()))
    }
}

/// Ordered, duplicate-free list of tools to run for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    tools: Vec<ToolName>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from raw names, dropping unknown names and repeats.
    /// The first occurrence of a name fixes its position.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plan = Self::new();
        for name in names {
            match name.as_ref().parse::<ToolName>() {
                Ok(tool) => plan.push(tool),
                Err(_) => tracing::debug!(name = name.as_ref(), "Dropping unknown tool name"),
            }
        }
        plan
    }

    /// Append a tool unless it is already planned.
    pub fn push(&mut self, tool: ToolName) {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
    }

    pub fn tools(&self) -> &[ToolName] {
        &self.tools
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn contains(&self, tool: ToolName) -> bool {
        self.tools.contains(&tool)
    }
}

impl FromIterator<ToolName> for Plan {
    fn from_iter<T: IntoIterator<Item = ToolName>>(iter: T) -> Self {
        let mut plan = Self::new();
        for tool in iter {
            plan.push(tool);
        }
        plan
    }
}

/// Per-query context handed to every connector invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolContext {
    pub caller: Option<StudentId>,
}

impl ToolContext {
    pub fn new(caller: Option<StudentId>) -> Self {
        Self { caller }
    }

    /// The caller identity, or `MissingCaller` for the given tool.
    pub fn require_caller(&self, tool: ToolName) -> Result<StudentId, ToolError> {
        self.caller.ok_or_else(|| ToolError::MissingCaller {
            tool: tool.to_string(),
        })
    }
}

/// A typed accessor for one federated source.
///
/// Connectors own their clients (store handle, HTTP client) and are built
/// once at startup. `invoke` returns the JSON value stored under the tool's
/// ContextBag field.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// The catalog entry this connector serves.
    fn tool(&self) -> ToolName;

    /// One-line description embedded in the Decomposer's catalog prompt.
    fn description(&self) -> &str;

    /// Example queries that should select this tool (few-shot grounding).
    fn examples(&self) -> &[&'static str] {
        &[]
    }

    async fn invoke(&self, ctx: &ToolContext) -> Result<serde_json::Value, ToolError>;
}

/// Static registration table of connectors, keyed and ordered by tool.
pub struct ConnectorRegistry {
    connectors: BTreeMap<ToolName, Box<dyn SourceConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: BTreeMap::new(),
        }
    }

    /// Register a connector. Replaces any existing connector for the same tool.
    pub fn register(&mut self, connector: Box<dyn SourceConnector>) {
        self.connectors.insert(connector.tool(), connector);
    }

    pub fn get(&self, tool: ToolName) -> Option<&dyn SourceConnector> {
        self.connectors.get(&tool).map(|c| c.as_ref())
    }

    /// Registered tools in catalog order.
    pub fn tools(&self) -> Vec<ToolName> {
        self.connectors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Dispatch one tool.
    pub async fn invoke(&self, tool: ToolName, ctx: &ToolContext) -> Result<serde_json::Value, ToolError> {
        let connector = self
            .connectors
            .get(&tool)
            .ok_or_else(|| ToolError::NotRegistered(tool.to_string()))?;
        connector.invoke(ctx).await
    }

    /// Catalog text for the Decomposer prompt: one line per tool, then
    /// the few-shot examples.
    pub fn catalog_prompt(&self) -> String {
        let mut out = String::from("Available tools:\n");
        for (tool, connector) in &self.connectors {
            out.push_str(&format!("- {}: {}\n", tool, connector.description()));
        }

        let examples: Vec<String> = self
            .connectors
            .iter()
            .flat_map(|(tool, c)| {
                c.examples()
                    .iter()
                    .map(move |q| format!("Query: \"{q}\" -> [\"{tool}\"]"))
            })
            .collect();
        if !examples.is_empty() {
            out.push_str("\nExamples:\n");
            for line in examples {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

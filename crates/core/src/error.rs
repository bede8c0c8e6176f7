//! Error types for the CampusFed domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage and each federated source has its own error type;
//! stages convert them into structured values instead of propagating.

use thiserror::Error;

/// The top-level error type for all CampusFed operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Source connector errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Pipeline stage errors ---
    #[error("Decomposition error: {0}")]
    Decomposition(#[from] DecompositionError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("ETL error: {0}")]
    Etl(#[from] EtlError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response body: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Map a `reqwest`-style transport failure description into the right variant.
    pub fn from_transport(message: impl Into<String>, is_timeout: bool) -> Self {
        if is_timeout {
            Self::Timeout(message.into())
        } else {
            Self::Network(message.into())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not registered: {0}")]
    NotRegistered(String),

    #[error("Tool {tool} requires a caller identity")]
    MissingCaller { tool: String },

    #[error("Upstream source failed for {tool}: {reason}")]
    Upstream { tool: String, reason: String },

    #[error("Upstream source for {tool} returned malformed data: {reason}")]
    Malformed { tool: String, reason: String },

    #[error("Tool timed out: {tool} after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("Not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Why the Decomposer could not produce a plan.
#[derive(Debug, Clone, Error)]
pub enum DecompositionError {
    #[error("invalid_response: could not parse a tool list from {raw:?}")]
    InvalidResponse { raw: String },

    #[error("backend_unavailable: {0}")]
    BackendUnavailable(ProviderError),
}

impl DecompositionError {
    /// The short machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidResponse { .. } => "invalid_response",
            Self::BackendUnavailable(_) => "backend_unavailable",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    #[error("backend_unavailable: {0}")]
    BackendUnavailable(ProviderError),

    #[error("empty response from backend")]
    EmptyResponse,
}

/// Malformed criteria on a single listing.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Malformed criteria on listing {listing:?}: field {field}: {reason}")]
pub struct FilterDataError {
    pub listing: String,
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Error)]
pub enum EtlError {
    #[error("Inference call failed: {0}")]
    Inference(ProviderError),

    #[error("Extraction output was not a JSON object: {raw:?}")]
    MalformedOutput { raw: String },

    #[error("Profile store failed: {0}")]
    Store(StoreError),

    #[error("No profile for student {0}")]
    UnknownStudent(i64),
}

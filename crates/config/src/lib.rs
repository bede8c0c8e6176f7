//! Configuration loading, validation, and management for CampusFed.
//!
//! Loads configuration from `~/.campusfed/config.toml` (or an explicit path)
//! with environment variable overrides applied once at load time. Every
//! component receives the parts it needs through its constructor; nothing
//! reads the environment afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.campusfed/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inference backend settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Partner catalog (jobs and scholarships)
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Profile/document store
    #[serde(default)]
    pub store: StoreConfig,

    /// Query pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Document-to-profile extraction
    #[serde(default)]
    pub etl: EtlConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Backend name: "gemini", "openai", "openrouter", "ollama", or any
    /// OpenAI-compatible endpoint name.
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the backend's default base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash-lite".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_inference_timeout() -> u64 {
    20
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_inference_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the partner catalog; `/api/jobs` and `/api/scholarships`
    /// are appended.
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

fn default_catalog_url() -> String {
    "http://127.0.0.1:5000".into()
}
fn default_catalog_timeout() -> u64 {
    10
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "sqlite://campusfed.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// List fields longer than this are truncated before synthesis.
    #[serde(default = "default_max_items")]
    pub max_items_per_field: usize,

    /// Upper bound on a single connector invocation.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Fan tool calls out concurrently instead of running them in plan order.
    #[serde(default)]
    pub parallel_tools: bool,

    /// Run a secondary inference call to structure free-text criteria.
    #[serde(default)]
    pub extract_unstructured_criteria: bool,

    /// Cap on secondary extraction calls per query.
    #[serde(default = "default_max_criteria_extractions")]
    pub max_criteria_extractions: usize,

    #[serde(default)]
    pub eligibility: EligibilityToggles,
}

fn default_max_items() -> usize {
    50
}
fn default_tool_timeout() -> u64 {
    15
}
fn default_max_criteria_extractions() -> usize {
    20
}
fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items_per_field: default_max_items(),
            tool_timeout_secs: default_tool_timeout(),
            parallel_tools: false,
            extract_unstructured_criteria: false,
            max_criteria_extractions: default_max_criteria_extractions(),
            eligibility: EligibilityToggles::default(),
        }
    }
}

/// Which eligibility dimensions are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityToggles {
    #[serde(default = "default_true")]
    pub income: bool,

    /// Percentage, CGPA and degree requirements.
    #[serde(default = "default_true")]
    pub academic: bool,

    #[serde(default = "default_true")]
    pub skills: bool,
}

impl Default for EligibilityToggles {
    fn default() -> Self {
        Self {
            income: true,
            academic: true,
            skills: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Extracted document text is clipped to this many characters.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

fn default_max_text_chars() -> usize {
    1000
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.campusfed/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// - `CAMPUSFED_PROVIDER`, `CAMPUSFED_MODEL` replace the inference backend
    /// - `CAMPUSFED_API_KEY` (highest priority), then `GEMINI_API_KEY` for the
    ///   gemini backend or `OPENAI_API_KEY` for the others, fill a missing key
    /// - `CAMPUSFED_CATALOG_URL`, `CAMPUSFED_DATABASE_URL` replace endpoints
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = set("CAMPUSFED_PROVIDER") {
            self.inference.provider = provider;
        }
        if let Some(model) = set("CAMPUSFED_MODEL") {
            self.inference.model = model;
        }

        if let Some(key) = set("CAMPUSFED_API_KEY") {
            self.inference.api_key = Some(key);
        } else if self.inference.api_key.is_none() {
            let vendor_var = if self.inference.provider == "gemini" {
                "GEMINI_API_KEY"
            } else {
                "OPENAI_API_KEY"
            };
            self.inference.api_key = set(vendor_var);
        }

        if let Some(url) = set("CAMPUSFED_CATALOG_URL") {
            self.catalog.base_url = url;
        }
        if let Some(url) = set("CAMPUSFED_DATABASE_URL") {
            self.store.database_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".campusfed")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.inference.timeout_secs == 0 || self.catalog.timeout_secs == 0 || self.pipeline.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("timeouts must be at least 1 second".into()));
        }
        if self.pipeline.max_items_per_field == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_items_per_field must be > 0".into(),
            ));
        }
        if self.etl.max_text_chars == 0 {
            return Err(ConfigError::ValidationError("etl.max_text_chars must be > 0".into()));
        }
        if !self.catalog.base_url.starts_with("http://") && !self.catalog.base_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "catalog.base_url must be an http(s) URL, got {:?}",
                self.catalog.base_url
            )));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.inference.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

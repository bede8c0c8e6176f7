//! Provider router: selects the inference backend based on config.
//!
//! Handles provider creation and hands the configured backend to every
//! pipeline stage as a shared `Arc<dyn Provider>`.

use campusfed_core::error::ProviderError;
use campusfed_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes inference requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build the configured backend.
pub fn build_from_config(config: &campusfed_config::InferenceConfig) -> Result<ProviderRouter, ProviderError> {
    let mut router = ProviderRouter::new(&config.provider);
    let timeout = Duration::from_secs(config.timeout_secs);

    let provider: Arc<dyn Provider> = match config.provider.as_str() {
        "gemini" => {
            let mut p = GeminiProvider::new(config.api_key.clone(), timeout)?;
            if let Some(url) = &config.api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "ollama" => Arc::new(OpenAiCompatProvider::ollama(config.api_url.as_deref(), timeout)?),
        name => {
            let base_url = config
                .api_url
                .clone()
                .or_else(|| default_base_url(name))
                .ok_or_else(|| {
                    ProviderError::NotConfigured(format!("provider {name} needs inference.api_url"))
                })?;
            Arc::new(OpenAiCompatProvider::new(name, base_url, config.api_key.clone(), timeout)?)
        }
    };

    tracing::info!(provider = %config.provider, model = %config.model, "Inference backend configured");
    router.register(config.provider.clone(), provider);
    Ok(router)
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.to_string())
}

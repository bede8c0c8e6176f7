//! Shared application state: every subsystem built once from config.

use campusfed_connectors::{CatalogClient, default_registry};
use campusfed_core::provider::{ModelSettings, Provider};
use campusfed_core::store::StudentStore;
use campusfed_core::tool::ConnectorRegistry;
use campusfed_pipeline::{ProfileUpdater, QueryPipeline};
use campusfed_store::SqliteStore;
use std::sync::Arc;
use tracing::info;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct AppState {
    pub config: campusfed_config::AppConfig,
    pub provider: Arc<dyn Provider>,
    pub store: Arc<dyn StudentStore>,
    pub pipeline: Arc<QueryPipeline>,
    pub updater: Arc<ProfileUpdater>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the pipeline and the ETL updater around an existing backend,
    /// registry and store.
    pub fn new(
        config: campusfed_config::AppConfig,
        provider: Arc<dyn Provider>,
        registry: Arc<ConnectorRegistry>,
        store: Arc<dyn StudentStore>,
    ) -> Self {
        let pipeline = QueryPipeline::from_config(provider.clone(), registry, store.clone(), &config);
        let settings = ModelSettings {
            model: config.inference.model.clone(),
            temperature: config.inference.temperature,
            max_tokens: config.inference.max_tokens,
        };
        let updater = ProfileUpdater::new(provider.clone(), settings, store.clone(), config.etl.max_text_chars);

        Self {
            config,
            provider,
            store,
            pipeline: Arc::new(pipeline),
            updater: Arc::new(updater),
            start_time: chrono::Utc::now(),
        }
    }

    /// Build every subsystem from configuration: inference backend,
    /// SQLite store, partner catalog client, connector registry.
    pub async fn from_config(config: campusfed_config::AppConfig) -> Result<Self, BoxError> {
        let router = campusfed_providers::build_from_config(&config.inference)?;
        let provider = router
            .default()
            .ok_or_else(|| format!("inference provider {} was not registered", config.inference.provider))?;

        let store: Arc<dyn StudentStore> = Arc::new(SqliteStore::new(&config.store.database_url).await?);
        let catalog = Arc::new(CatalogClient::from_config(&config.catalog)?);
        let registry = Arc::new(default_registry(store.clone(), catalog));

        info!(
            provider = provider.name(),
            tools = registry.len(),
            catalog = %config.catalog.base_url,
            "Subsystems ready"
        );
        Ok(Self::new(config, provider, registry, store))
    }
}

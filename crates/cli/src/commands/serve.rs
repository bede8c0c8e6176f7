//! `campusfed serve`: Start the HTTP API server.

use campusfed_gateway::BoxError;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), BoxError> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("CampusFed Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Backend:   {} ({})", config.inference.provider, config.inference.model);
    println!("   Catalog:   {}", config.catalog.base_url);
    if !config.has_api_key() {
        println!("   Warning:   no API key set, queries will return the error envelope");
    }

    campusfed_gateway::start(config).await
}

//! `campusfed config`: Configuration inspection commands.

use campusfed_gateway::BoxError;
use std::path::Path;

pub async fn validate(config_path: Option<&Path>) -> Result<(), BoxError> {
    println!("Validating configuration...");

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e);
        }
    };
    println!("   Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   Warning: {w}");
        }
    }

    println!();
    println!("   Provider:  {}", config.inference.provider);
    println!("   Model:     {}", config.inference.model);
    println!("   Catalog:   {}", config.catalog.base_url);
    println!("   Store:     {}", config.store.database_url);
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);

    Ok(())
}

/// Problems that don't stop the service from starting.
fn warnings(config: &campusfed_config::AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set CAMPUSFED_API_KEY, GEMINI_API_KEY or OPENAI_API_KEY)");
    }
    if config.gateway.host == "0.0.0.0" {
        warnings.push("Gateway bound to 0.0.0.0 and reachable from the network");
    }
    if config.pipeline.extract_unstructured_criteria && config.pipeline.max_criteria_extractions == 0 {
        warnings.push("Criteria extraction is enabled but max_criteria_extractions is 0");
    }
    warnings
}

pub async fn show(config_path: Option<&Path>) -> Result<(), BoxError> {
    let mut config = super::load_config(config_path)?;
    if config.inference.api_key.is_some() {
        config.inference.api_key = Some("***".into());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), BoxError> {
    println!("{}", super::config_path(config_path).display());
    Ok(())
}

//! `campusfed init`: Write a default configuration file.

use campusfed_config::AppConfig;
use campusfed_gateway::BoxError;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), BoxError> {
    let path = super::config_path(config_path);

    println!("CampusFed: First-Time Setup");
    println!("============================\n");

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("Created config directory: {}", dir.display());
    }

    if path.exists() {
        println!("Config already exists at: {}", path.display());
        println!("   Edit it manually or delete it and re-run init.\n");
        return Ok(());
    }

    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", path.display());
    println!("\nNext steps:");
    println!("   1. Set GEMINI_API_KEY (or add inference.api_key to {})", path.display());
    println!("   2. Point catalog.base_url at the partner job/scholarship service");
    println!("   3. Run: campusfed serve\n");

    Ok(())
}

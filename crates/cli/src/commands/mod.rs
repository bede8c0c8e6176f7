pub mod ask;
pub mod config_cmd;
pub mod extract;
pub mod init;
pub mod serve;

use campusfed_config::AppConfig;
use campusfed_gateway::BoxError;
use std::path::{Path, PathBuf};

/// `--config` if given, otherwise `~/.campusfed/config.toml`.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load config with environment overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, BoxError> {
    AppConfig::load_with_env(&config_path(path)).map_err(|e| format!("Failed to load config: {e}").into())
}

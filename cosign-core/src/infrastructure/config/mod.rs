mod loader;
mod types;
pub mod validation;

pub use loader::{load_config, load_config_from_file, load_config_from_file_with_profile, load_config_with_profile};
pub use types::*;

use crate::foundation::{CosignError, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "COSIGN_CONFIG_PATH";
pub const CONFIG_FILE_NAME: &str = "cosign.toml";

/// Load and validate configuration from `COSIGN_CONFIG_PATH` or `./cosign.toml`.
pub fn load_app_config() -> Result<AppConfig> {
    let path = resolve_config_path()?;
    load_app_config_from_path(&path)
}

pub fn load_app_config_from_path(path: &Path) -> Result<AppConfig> {
    let config = load_config_from_file(path)?;
    config.validate().map_err(|errors| CosignError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    Ok(config)
}

pub fn load_app_config_from_profile_path(path: &Path, profile: &str) -> Result<AppConfig> {
    let config = load_config_from_file_with_profile(path, profile)?;
    config.validate().map_err(|errors| CosignError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    Ok(config)
}

pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(value) = std::env::var(CONFIG_PATH_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    let cwd = std::env::current_dir()
        .map_err(|err| CosignError::StorageError { operation: "env::current_dir".to_string(), details: err.to_string() })?;
    Ok(cwd.join(CONFIG_FILE_NAME))
}

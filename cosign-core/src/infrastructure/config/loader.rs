//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Profile overrides from `[profiles.<name>]`
//! 4. Environment variables (COSIGN_* prefix)

use crate::foundation::{CosignError, Result};
use crate::infrastructure::config::types::AppConfig;
use crate::infrastructure::config::CONFIG_FILE_NAME;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::Dict;
use figment::{Figment, Profile};
use log::{debug, info};
use std::path::Path;

/// Environment variable prefix for config overrides.
///
/// Example: `COSIGN_LEDGER__CHAIN_ID` -> `ledger.chain_id`
const ENV_PREFIX: &str = "COSIGN_";

/// Load configuration from the default file in `data_dir` (`cosign.toml`).
pub fn load_config(data_dir: &Path) -> Result<AppConfig> {
    load_config_from_file(&data_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default file in `data_dir` (`cosign.toml`) with a profile.
pub fn load_config_with_profile(data_dir: &Path, profile: &str) -> Result<AppConfig> {
    load_config_from_file_with_profile(&data_dir.join(CONFIG_FILE_NAME), profile)
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    info!("loading configuration path={}", path.display());
    let config: AppConfig = figment_base(path)
        .merge(env_provider())
        .extract()
        .map_err(|e| CosignError::ConfigError(format!("config extraction failed: {e}")))?;
    log_loaded(&config, None);
    Ok(config)
}

/// Load configuration from a specific file path with profile overrides.
pub fn load_config_from_file_with_profile(path: &Path, profile: &str) -> Result<AppConfig> {
    info!("loading configuration with profile path={} profile={}", path.display(), profile);

    // Extract once to read `profiles.<name>` from the file.
    let base: AppConfig =
        figment_base(path).extract().map_err(|e| CosignError::ConfigError(format!("config extraction failed: {e}")))?;
    let overrides = profile_overrides(&base, profile)?;

    let config: AppConfig = figment_base(path)
        .merge(Serialized::from(overrides, Profile::Default))
        .merge(env_provider())
        .extract()
        .map_err(|e| CosignError::ConfigError(format!("config extraction failed for profile '{profile}': {e}")))?;
    log_loaded(&config, Some(profile));
    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    let figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment.merge(Toml::file(path))
    } else {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
        figment
    }
}

fn env_provider() -> Env {
    // COSIGN_CONFIG_PATH selects the file and is not a config key.
    Env::prefixed(ENV_PREFIX).ignore(&["CONFIG_PATH", "TEST_NOW_NANOS"]).split("__")
}

fn profile_overrides(config: &AppConfig, profile: &str) -> Result<Dict> {
    let profiles = config.profiles.as_ref().ok_or_else(|| CosignError::ConfigError("no profiles section in config".to_string()))?;
    profiles.get(profile).cloned().ok_or_else(|| CosignError::ConfigError(format!("profile '{profile}' not found in config")))
}

fn log_loaded(config: &AppConfig, profile: Option<&str>) {
    debug!(
        "configuration loaded profile={} chain_id={} contract_version={:?} max_pending_per_account={} allow_endorsed_deletion={}",
        profile.unwrap_or("-"),
        config.ledger.chain_id,
        config.ledger.contract_version,
        config.pool.max_pending_per_account,
        config.cancellation.allow_endorsed_deletion
    );
}

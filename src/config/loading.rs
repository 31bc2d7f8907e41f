//! Locating, reading and defaulting the configuration file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::common::constants::*;
use crate::common::utils::private_path;

/// Directory given with `--config`, set once at startup.
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Record the configuration directory for this process.
///
/// Fails if called a second time.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// The `--config` directory, if one was given.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Path of `eyeshade.toml`, honoring `--config`.
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the configuration, writing the default file first if none exists.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
    }

    load_from_path(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            private_path(&config_path)
        )
    })
}

/// Load a specific file. Unlike [`load`], a missing file is an error.
pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", private_path(path));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))?;

    validate_config(&config)?;
    apply_defaults(&mut config);

    Ok(config)
}

/// Fill every unset field so later comparisons see effective values.
pub(crate) fn apply_defaults(config: &mut Config) {
    config.filter_enabled.get_or_insert(false);
    config.temperature.get_or_insert(DEFAULT_FILTER_TEMP);
    config.dim_enabled.get_or_insert(false);
    config.dim_level.get_or_insert(DEFAULT_DIM);
    config.focus_enabled.get_or_insert(false);
    config.focus_dim_level.get_or_insert(DEFAULT_FOCUS_DIM);
    config.break_enabled.get_or_insert(false);
    config
        .break_mode
        .get_or_insert_with(|| DEFAULT_BREAK_MODE.to_string());
    config.work_duration.get_or_insert(DEFAULT_WORK_DURATION);
    config.break_duration.get_or_insert(DEFAULT_BREAK_DURATION);
    config.force_break.get_or_insert(DEFAULT_FORCE_BREAK);
    config.schedule_enabled.get_or_insert(false);
    config.latitude.get_or_insert(DEFAULT_LATITUDE);
    config.longitude.get_or_insert(DEFAULT_LONGITUDE);
    config
        .topology_poll_interval
        .get_or_insert(DEFAULT_TOPOLOGY_POLL_SECS);
}

//! Configuration loading

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::Config;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Load configuration from a config file and environment variables
///
/// Config file search order:
/// 1. `explicit_path` (from `--config` or `CLASSROOM_CONFIG_PATH`), which must exist
/// 2. ./config.yaml (current working directory)
/// 3. Fall back to environment variables only
pub fn load_config(explicit_path: Option<&str>) -> Result<Config> {
    let config_path = match explicit_path {
        Some(path) => {
            if !Path::new(path).exists() {
                anyhow::bail!("Config file not found: {path}");
            }
            Some(path.to_string())
        }
        None => Path::new(DEFAULT_CONFIG_FILE)
            .exists()
            .then(|| DEFAULT_CONFIG_FILE.to_string()),
    };

    let config = match config_path.as_deref() {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(path).with_context(|| format!("Failed to load {path}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env().context("Failed to load configuration from environment")?
        }
    };

    // Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!("Configuration loaded and validated successfully");
    Ok(config)
}

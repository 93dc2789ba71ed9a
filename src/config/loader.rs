//! Configuration loading and discovery for `spheremap.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{ConfigValidationError, SphereConfig};
use crate::projection::ProjectionStrategy;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up by [`find_config`].
pub const CONFIG_FILE_NAME: &str = "spheremap.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spheremap.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override texture width
    pub width: Option<u32>,
    /// Override texture height
    pub height: Option<u32>,
    /// Override projection strategy
    pub strategy: Option<ProjectionStrategy>,
    /// Force sequential evaluation
    pub sequential: Option<bool>,
}

/// Find spheremap.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for spheremap.toml
/// 2. Check XDG_CONFIG_HOME/spheremap/spheremap.toml (or ~/.config/spheremap/spheremap.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find spheremap.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("spheremap").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find spheremap.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a spheremap.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// [`find_config`] to locate the config file. If no config file is found,
/// returns the default configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("rig/spheremap.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<SphereConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => {
            log::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
            Ok(SphereConfig::default())
        }
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<SphereConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config = parse_config(&contents)?;
    log::info!("loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<SphereConfig, ConfigError> {
    let config: SphereConfig = toml::from_str(contents)?;
    validate(config)
}

fn validate(config: SphereConfig) -> Result<SphereConfig, ConfigError> {
    check(config.validate())?;
    Ok(config)
}

/// Turn collected validation errors into a [`ConfigError`].
fn check(errors: Vec<ConfigValidationError>) -> Result<(), ConfigError> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
}

/// Merge CLI overrides into a configuration and re-validate it.
///
/// CLI arguments take precedence over config file values. Feature bands
/// are not checked against an overridden width here; commands that use
/// features call [`SphereConfig::validate_feature_bands`] themselves.
pub fn merge_cli_overrides(
    mut config: SphereConfig,
    overrides: &CliOverrides,
) -> Result<SphereConfig, ConfigError> {
    if let Some(width) = overrides.width {
        config.texture.width = width;
    }
    if let Some(height) = overrides.height {
        config.texture.height = height;
    }
    if let Some(strategy) = overrides.strategy {
        config.projection.strategy = strategy;
    }
    if let Some(sequential) = overrides.sequential {
        config.engine.parallel = !sequential;
    }
    check(config.validate_settings())?;
    Ok(config)
}

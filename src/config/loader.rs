//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables that override file values.
pub const ENV_GATEWAY_LISTEN: &str = "GATEWAY_LISTEN";
pub const ENV_BACKEND_LISTEN: &str = "BACKEND_LISTEN";
pub const ENV_BACKEND_ENDPOINT: &str = "BACKEND_ENDPOINT";
pub const ENV_TRACE_ENDPOINT: &str = "TRACE_ENDPOINT";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay values from `lookup` (normally the process environment).
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_GATEWAY_LISTEN) {
        config.gateway.bind_address = v;
    }
    if let Some(v) = get(ENV_BACKEND_LISTEN) {
        config.backend.bind_address = v;
    }
    if let Some(v) = get(ENV_BACKEND_ENDPOINT) {
        config.gateway.backend_url = v;
    }
    if let Some(v) = get(ENV_TRACE_ENDPOINT) {
        config.observability.trace_endpoint = Some(v);
    }
    config
}

/// Resolve the effective configuration: file (or defaults), then
/// environment, then validation.
pub fn resolve(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let base = match path {
        Some(path) => read_config(path)?,
        None => AppConfig::default(),
    };
    let config = apply_env_overrides(base, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

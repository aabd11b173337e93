//! Configuration loading from disk and the command line.

use std::fs;
use std::path::Path;

use crate::config::schema::{default_capacity, BackendConfig, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid backend list entry {entry:?}: {reason}")]
    BackendList { entry: String, reason: String },
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

/// Load a configuration from a TOML file without validating it.
///
/// Callers apply command-line overrides first and then run
/// [`validate_config`].
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a comma-separated backend list such as
/// `127.0.0.1:3001=10,127.0.0.1:3002=5`.
///
/// Entries without `=capacity` get the default capacity. Address syntax is
/// checked later by validation.
pub fn parse_backend_list(list: &str) -> Result<Vec<BackendConfig>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            None => Ok(BackendConfig::new(entry, default_capacity())),
            Some((address, capacity)) => {
                let capacity = capacity.trim().parse::<usize>().map_err(|e| {
                    ConfigError::BackendList {
                        entry: entry.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(BackendConfig::new(address.trim(), capacity))
            }
        })
        .collect()
}

//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
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
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<EdgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => EdgeConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay recognized environment variables onto `config`.
///
/// `lookup` returns the value of a variable; empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut EdgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(host) = var("CANONICAL_HOST") {
        config.host.canonical = Some(host);
    }
    if let Some(url) = var("SITE_URL") {
        config.host.site_url = Some(url);
    }
    if let Some(flag) = var("MULTI_TENANT_ENABLED") {
        config.tenancy.multi_tenant = parse_flag(&flag);
    }
    if let Some(dataset) = var("ACTIVE_DATASET") {
        config.tenancy.active_dataset = Some(dataset);
    }
    if let Some(token) = var("CMS_TOKEN") {
        config.redirects.cms.token = Some(token);
    }
    if let Some(key) = var("ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

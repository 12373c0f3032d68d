//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, durations, and source settings
//! - Detect duplicate static rule ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{EdgeConfig, RuleSourceKind, PLACEHOLDER_API_KEY};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("redirects.cms.query_url is required when redirects.source = \"cms\"")]
    MissingCmsEndpoint,

    #[error("redirects.cms.query_url: invalid URL '{0}'")]
    InvalidCmsEndpoint(String),

    #[error("host.scheme must be http or https, got '{0}'")]
    InvalidScheme(String),

    #[error("duplicate redirect rule id '{0}'")]
    DuplicateRuleId(String),

    #[error("monitoring.endpoint: invalid URL '{0}'")]
    InvalidMonitoringEndpoint(String),

    #[error("admin.api_key must be changed when the admin API is enabled")]
    PlaceholderAdminKey,
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key == PLACEHOLDER_API_KEY || config.admin.api_key.is_empty() {
            errors.push(ValidationError::PlaceholderAdminKey);
        }
    }

    if config.upstream.origin.parse::<axum::http::uri::Authority>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "upstream.origin",
            value: config.upstream.origin.clone(),
        });
    }

    if config.redirects.cache_ttl_secs == 0 {
        errors.push(ValidationError::ZeroDuration("redirects.cache_ttl_secs"));
    }
    if config.redirects.fetch_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration("redirects.fetch_timeout_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.upstream_secs"));
    }

    if config.redirects.source == RuleSourceKind::Cms {
        let url = config.redirects.cms.query_url.trim();
        if url.is_empty() {
            errors.push(ValidationError::MissingCmsEndpoint);
        } else if url::Url::parse(url).is_err() {
            errors.push(ValidationError::InvalidCmsEndpoint(url.to_string()));
        }
    }

    if let Some(endpoint) = &config.monitoring.endpoint {
        if url::Url::parse(endpoint).is_err() {
            errors.push(ValidationError::InvalidMonitoringEndpoint(endpoint.clone()));
        }
    }

    let scheme = config.host.scheme.as_str();
    if scheme != "http" && scheme != "https" {
        errors.push(ValidationError::InvalidScheme(scheme.to_string()));
    }

    let mut seen = HashSet::new();
    for rule in &config.redirects.rules {
        if !seen.insert(rule.id.as_str()) {
            errors.push(ValidationError::DuplicateRuleId(rule.id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

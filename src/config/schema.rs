//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::routing::rule::RedirectRule;

/// Hostname used when neither an explicit canonical host nor a site URL is set.
pub const DEFAULT_CANONICAL_HOST: &str = "www.example.com";

/// Root configuration for the edge router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Page renderer that pass-through requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Canonical host enforcement.
    pub host: HostConfig,

    /// Paths the edge router leaves alone.
    pub filter: FilterConfig,

    /// Redirect rule source and cache settings.
    pub redirects: RedirectsConfig,

    /// Multi-tenant dataset headers.
    pub tenancy: TenancyConfig,

    /// Redirect monitoring side-channel.
    pub monitoring: MonitoringConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin (page renderer) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub origin: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Canonical host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Explicit canonical hostname (env `CANONICAL_HOST`).
    pub canonical: Option<String>,

    /// Public site URL; its hostname is used when `canonical` is unset (env `SITE_URL`).
    pub site_url: Option<String>,

    /// Scheme used in canonical-host redirects.
    pub scheme: String,

    /// Redirect requests for other hostnames to the canonical host.
    pub enforce: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            canonical: None,
            site_url: None,
            scheme: "https".to_string(),
            enforce: true,
        }
    }
}

impl HostConfig {
    /// Resolve the canonical hostname: explicit setting, then site URL
    /// hostname, then `DEFAULT_CANONICAL_HOST`.
    pub fn canonical_host(&self) -> String {
        if let Some(host) = self.canonical.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            return host.to_lowercase();
        }

        if let Some(site_url) = self.site_url.as_deref().filter(|u| !u.trim().is_empty()) {
            match url::Url::parse(site_url.trim()) {
                Ok(parsed) => {
                    if let Some(host) = parsed.host_str() {
                        return match parsed.port() {
                            Some(port) => format!("{}:{}", host.to_lowercase(), port),
                            None => host.to_lowercase(),
                        };
                    }
                    tracing::warn!(site_url = %site_url, "Site URL has no host, using default canonical host");
                }
                Err(e) => {
                    tracing::warn!(site_url = %site_url, error = %e, "Invalid site URL, using default canonical host");
                }
            }
        }

        DEFAULT_CANONICAL_HOST.to_string()
    }
}

/// Path filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Path prefixes that bypass the edge router.
    pub excluded_prefixes: Vec<String>,

    /// File extensions (without dot) that bypass the edge router.
    pub excluded_extensions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["/_next".to_string()],
            excluded_extensions: ["png", "jpg", "jpeg", "gif", "ico", "svg", "webp", "avif", "txt", "xml"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Where redirect rules come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSourceKind {
    /// CMS content query over HTTP.
    Cms,
    /// `redirects.rules` in this file.
    Static,
}

/// Redirect rule configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectsConfig {
    pub source: RuleSourceKind,

    /// Rule set lifetime in seconds.
    pub cache_ttl_secs: u64,

    /// Upper bound on a single rule fetch in milliseconds.
    pub fetch_timeout_ms: u64,

    pub cms: CmsConfig,

    /// Rules used by the static source.
    pub rules: Vec<RedirectRule>,
}

impl Default for RedirectsConfig {
    fn default() -> Self {
        Self {
            source: RuleSourceKind::Static,
            cache_ttl_secs: 300,
            fetch_timeout_ms: 2000,
            cms: CmsConfig::default(),
            rules: Vec::new(),
        }
    }
}

/// CMS content query settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CmsConfig {
    /// Full URL of the content query endpoint.
    pub query_url: String,

    /// Query selecting active redirect documents.
    pub query: String,

    /// Read token (env `CMS_TOKEN`).
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            query_url: String::new(),
            query: r#"*[_type == "redirect" && isActive == true] | order(priority desc, order asc)"#
                .to_string(),
            token: None,
        }
    }
}

/// Multi-tenant configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TenancyConfig {
    /// Attach `x-site-*` headers (env `MULTI_TENANT_ENABLED`).
    pub multi_tenant: bool,

    /// Dataset this deployment serves (env `ACTIVE_DATASET`).
    pub active_dataset: Option<String>,

    /// Hostname → dataset mapping.
    pub domains: HashMap<String, String>,
}

/// Redirect monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Optional HTTP endpoint receiving redirect events as JSON.
    pub endpoint: Option<String>,

    /// Timeout for a single event delivery in milliseconds.
    pub timeout_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 1000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for a forwarded request to the origin in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 25,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token, env `ADMIN_API_KEY`).
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder admin key that validation rejects.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

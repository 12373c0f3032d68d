//! Multi-tenant dataset headers.
//!
//! Headers are advisory: downstream page handlers may read them and must
//! tolerate their absence. A mismatch between the mapped and the active
//! dataset is logged, never enforced.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::TenancyConfig;
use crate::edge::canonical::hostname_of;

pub const X_SITE_DOMAIN: HeaderName = HeaderName::from_static("x-site-domain");
pub const X_SITE_DATASET: HeaderName = HeaderName::from_static("x-site-dataset");
pub const X_SITE_DATASET_EXPECTED: HeaderName = HeaderName::from_static("x-site-dataset-expected");

/// Maps a request hostname to the dataset that should serve it.
pub trait DatasetLookup: Send + Sync {
    fn dataset_for(&self, hostname: &str) -> Option<String>;
}

/// Hostname → dataset mapping from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDatasetMap {
    domains: HashMap<String, String>,
}

impl StaticDatasetMap {
    pub fn new(domains: &HashMap<String, String>) -> Self {
        Self {
            domains: domains
                .iter()
                .map(|(host, dataset)| (hostname_of(host), dataset.clone()))
                .collect(),
        }
    }
}

impl DatasetLookup for StaticDatasetMap {
    fn dataset_for(&self, hostname: &str) -> Option<String> {
        self.domains.get(hostname).cloned().or_else(|| {
            // "example.com" also covers "www.example.com".
            hostname
                .strip_prefix("www.")
                .and_then(|bare| self.domains.get(bare).cloned())
        })
    }
}

/// Builds `x-site-*` headers for pass-through requests.
pub struct TenantHeaders {
    enabled: bool,
    active_dataset: Option<String>,
    lookup: Box<dyn DatasetLookup>,
}

impl TenantHeaders {
    pub fn new(config: &TenancyConfig, lookup: Box<dyn DatasetLookup>) -> Self {
        Self {
            enabled: config.multi_tenant,
            active_dataset: config.active_dataset.clone(),
            lookup,
        }
    }

    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(config, Box::new(StaticDatasetMap::new(&config.domains)))
    }

    /// Headers for a request to `hostname`; empty when multi-tenant mode is off.
    pub fn headers_for(&self, hostname: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !self.enabled {
            return headers;
        }
        let Some(hostname) = hostname else {
            return headers;
        };

        let mapped = self.lookup.dataset_for(hostname);
        if mapped.is_none() {
            tracing::debug!(domain = %hostname, "No dataset mapped for domain");
        }

        insert(&mut headers, X_SITE_DOMAIN, hostname);
        if let Some(dataset) = self.active_dataset.as_deref().or(mapped.as_deref()) {
            insert(&mut headers, X_SITE_DATASET, dataset);
        }

        if let (Some(active), Some(expected)) = (self.active_dataset.as_deref(), mapped.as_deref()) {
            if active != expected {
                tracing::warn!(
                    domain = %hostname,
                    active_dataset = %active,
                    expected_dataset = %expected,
                    "Domain is served by a different dataset than its mapping"
                );
                insert(&mut headers, X_SITE_DATASET_EXPECTED, expected);
            }
        }

        headers
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!(header = %name, "Skipping header with invalid value"),
    }
}

//! Redirect monitoring side-channel.
//!
//! # Responsibilities
//! - Report every rule redirect (from, to, match type, elapsed time)
//! - Deliver events without delaying or failing the client response
//!
//! # Design Decisions
//! - Events are dispatched on a detached task
//! - Delivery errors are logged at debug and dropped; no retry

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::MonitoringConfig;
use crate::observability::metrics;
use crate::routing::MatchType;

/// One redirect issued by a CMS rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectEvent {
    pub from_path: String,
    pub to_path: String,
    pub match_type: MatchType,
    pub duration_ms: u64,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("sink returned status {0}")]
    Status(u16),
}

/// A sink for redirect events.
#[async_trait]
pub trait RedirectMonitor: Send + Sync {
    async fn record(&self, event: RedirectEvent) -> Result<(), MonitorError>;
}

/// Records redirect events as metrics and debug logs.
#[derive(Debug, Default)]
pub struct MetricsMonitor;

#[async_trait]
impl RedirectMonitor for MetricsMonitor {
    async fn record(&self, event: RedirectEvent) -> Result<(), MonitorError> {
        metrics::record_redirect_duration(Duration::from_millis(event.duration_ms));
        tracing::debug!(
            from = %event.from_path,
            to = %event.to_path,
            match_type = %event.match_type,
            duration_ms = event.duration_ms,
            "Redirect issued"
        );
        Ok(())
    }
}

/// Posts redirect events as JSON to an HTTP endpoint.
pub struct WebhookMonitor {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookMonitor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RedirectMonitor for WebhookMonitor {
    async fn record(&self, event: RedirectEvent) -> Result<(), MonitorError> {
        let response = self.client.post(&self.endpoint).json(&event).send().await?;
        if !response.status().is_success() {
            return Err(MonitorError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Sends each event to every inner monitor; one failure does not stop the rest.
pub struct FanoutMonitor {
    monitors: Vec<Arc<dyn RedirectMonitor>>,
}

impl FanoutMonitor {
    pub fn new(monitors: Vec<Arc<dyn RedirectMonitor>>) -> Self {
        Self { monitors }
    }
}

#[async_trait]
impl RedirectMonitor for FanoutMonitor {
    async fn record(&self, event: RedirectEvent) -> Result<(), MonitorError> {
        let mut first_error = None;
        for monitor in &self.monitors {
            if let Err(e) = monitor.record(event.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Build the monitor described by `config`.
pub fn build_monitor(config: &MonitoringConfig) -> Arc<dyn RedirectMonitor> {
    let metrics_monitor: Arc<dyn RedirectMonitor> = Arc::new(MetricsMonitor);
    let Some(endpoint) = &config.endpoint else {
        return metrics_monitor;
    };

    match WebhookMonitor::new(endpoint.clone(), Duration::from_millis(config.timeout_ms)) {
        Ok(webhook) => Arc::new(FanoutMonitor::new(vec![metrics_monitor, Arc::new(webhook)])),
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "Redirect webhook disabled");
            metrics_monitor
        }
    }
}

/// Deliver `event` on a detached task. Never blocks the caller.
pub fn dispatch(monitor: &Arc<dyn RedirectMonitor>, event: RedirectEvent) {
    let monitor = monitor.clone();
    tokio::spawn(async move {
        if let Err(e) = monitor.record(event).await {
            tracing::debug!(error = %e, "Redirect monitor delivery failed");
        }
    });
}

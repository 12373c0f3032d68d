//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_redirects_total` (counter): redirects issued by kind, status
//! - `edge_redirect_duration_seconds` (histogram): time to a rule redirect
//! - `edge_redirect_cycles_total` (counter): chains aborted by cycle detection
//! - `edge_rule_fetch_total` (counter): rule fetches by outcome
//! - `edge_rules_cached` (gauge): compiled rules in the current set
//! - `edge_upstream_requests_total` (counter): forwarded requests by status
//! - `edge_upstream_duration_seconds` (histogram): origin round-trip time
//!
//! # Design Decisions
//! - `metrics` facade; the Prometheus exporter is installed only when enabled
//! - Recording without an installed exporter is a no-op, so tests need no setup

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a redirect issued by the edge (`kind`: host, slash, internal, external).
pub fn record_redirect(kind: &'static str, status: u16) {
    metrics::counter!("edge_redirects_total", "kind" => kind, "status" => status.to_string())
        .increment(1);
}

pub fn record_redirect_duration(duration: Duration) {
    metrics::histogram!("edge_redirect_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_redirect_cycle() {
    metrics::counter!("edge_redirect_cycles_total").increment(1);
}

/// `outcome`: success, stale, empty.
pub fn record_rule_fetch(outcome: &'static str) {
    metrics::counter!("edge_rule_fetch_total", "outcome" => outcome).increment(1);
}

pub fn record_rules_cached(count: usize) {
    metrics::gauge!("edge_rules_cached").set(count as f64);
}

pub fn record_upstream(status: u16, start: Instant) {
    metrics::counter!("edge_upstream_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("edge_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

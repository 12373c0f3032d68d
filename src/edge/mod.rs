//! Edge request router.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, query)
//!     → filter.rs (skip framework internals and static files)
//!     → canonical.rs (canonical host? 308)
//!     → canonical.rs (trailing slash? 308)
//!     → routing::cache get() → routing::resolve()
//!     → Decision → redirect (+ monitor event) or pass-through
//!     → tenant.rs (x-site-* headers on pass-through)
//! ```
//!
//! # Design Decisions
//! - Host check runs first and short-circuits everything else
//! - Redirect resolution problems never produce a 5xx
//! - Monitoring is dispatched after the decision, off the response path

pub mod canonical;
pub mod filter;
pub mod tenant;

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use tokio::time::Instant;

use crate::config::EdgeConfig;
use crate::observability::monitor::{dispatch, RedirectEvent, RedirectMonitor};
use crate::routing::resolver::append_query;
use crate::routing::{resolve, Decision, MatchType, RuleCache};

use self::canonical::{hostname_of, trailing_slash_location, HostPolicy};
use self::filter::PathFilter;
use self::tenant::TenantHeaders;

/// The routing-relevant parts of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Lower-cased hostname without port.
    pub hostname: Option<String>,
    pub path: String,
    pub query: Option<String>,
}

impl RequestTarget {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let authority = request
            .headers()
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()));

        Self {
            hostname: authority.as_deref().map(hostname_of),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
        }
    }
}

/// Why a redirect was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    CanonicalHost,
    TrailingSlash,
    Internal(MatchType),
    External(MatchType),
}

impl RedirectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectKind::CanonicalHost => "host",
            RedirectKind::TrailingSlash => "slash",
            RedirectKind::Internal(_) => "internal",
            RedirectKind::External(_) => "external",
        }
    }
}

/// A redirect the edge wants to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: StatusCode,
    pub kind: RedirectKind,
}

/// What the edge decided for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeAction {
    /// Path excluded by the filter; forward untouched.
    Skip,
    Redirect(Redirect),
    /// Forward to the origin with these informational headers.
    Continue(HeaderMap),
}

/// Orchestrates host, slash, and rule-based redirects for each request.
pub struct EdgeRouter {
    filter: PathFilter,
    host: HostPolicy,
    cache: Arc<RuleCache>,
    tenants: TenantHeaders,
    monitor: Arc<dyn RedirectMonitor>,
}

impl EdgeRouter {
    pub fn new(
        config: &EdgeConfig,
        cache: Arc<RuleCache>,
        tenants: TenantHeaders,
        monitor: Arc<dyn RedirectMonitor>,
    ) -> Self {
        let host = HostPolicy::new(&config.host);
        tracing::info!(canonical_host = %host.canonical_host(), enforce = config.host.enforce, "Edge router configured");
        Self {
            filter: PathFilter::new(&config.filter),
            host,
            cache,
            tenants,
            monitor,
        }
    }

    pub fn cache(&self) -> &Arc<RuleCache> {
        &self.cache
    }

    pub fn canonical_host(&self) -> &str {
        self.host.canonical_host()
    }

    /// Decide what to do with `target`.
    pub async fn evaluate(&self, target: &RequestTarget) -> EdgeAction {
        let started = Instant::now();

        if !self.filter.should_handle(&target.path) {
            return EdgeAction::Skip;
        }

        if let Some(location) = self.host.redirect_location(target) {
            return EdgeAction::Redirect(Redirect {
                location,
                status: StatusCode::PERMANENT_REDIRECT,
                kind: RedirectKind::CanonicalHost,
            });
        }

        if let Some(location) = trailing_slash_location(target) {
            return EdgeAction::Redirect(Redirect {
                location,
                status: StatusCode::PERMANENT_REDIRECT,
                kind: RedirectKind::TrailingSlash,
            });
        }

        let rules = self.cache.get().await;
        let redirect = match resolve(&target.path, target.query.as_deref(), &rules) {
            Decision::External {
                url,
                status,
                match_type,
                ..
            } => Redirect {
                location: url,
                status,
                kind: RedirectKind::External(match_type),
            },
            Decision::Internal {
                path,
                status,
                query_handling,
                match_type,
            } => Redirect {
                location: append_query(&path, target.query.as_deref(), query_handling),
                status,
                kind: RedirectKind::Internal(match_type),
            },
            Decision::PassThrough => {
                return EdgeAction::Continue(self.tenants.headers_for(target.hostname.as_deref()));
            }
        };

        if HeaderValue::from_str(&redirect.location).is_err() {
            tracing::warn!(
                path = %target.path,
                location = %redirect.location,
                "Redirect location is not a valid header value, passing through"
            );
            return EdgeAction::Continue(self.tenants.headers_for(target.hostname.as_deref()));
        }

        if let RedirectKind::Internal(match_type) | RedirectKind::External(match_type) = redirect.kind {
            dispatch(
                &self.monitor,
                RedirectEvent {
                    from_path: target.path.clone(),
                    to_path: redirect.location.clone(),
                    match_type,
                    duration_ms: started.elapsed().as_millis() as u64,
                },
            );
        }

        tracing::info!(
            from = %target.path,
            to = %redirect.location,
            status = redirect.status.as_u16(),
            kind = redirect.kind.as_str(),
            "Redirect rule applied"
        );
        EdgeAction::Redirect(redirect)
    }
}

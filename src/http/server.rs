//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the rule source, cache, monitor and edge router from config
//! - Create Axum Router with the edge middleware and forwarder
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve the admin API when enabled
//! - Graceful shutdown on the shared shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::any, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{EdgeConfig, RuleSourceKind};
use crate::edge::tenant::TenantHeaders;
use crate::edge::EdgeRouter;
use crate::http::middleware::edge_middleware;
use crate::http::upstream::{forward_handler, Upstream};
use crate::observability::monitor::{build_monitor, RedirectMonitor};
use crate::routing::{CmsRuleSource, RuleCache, RuleSource, SourceError, StaticRuleSource};

/// Errors building the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("rule source: {0}")]
    Source(#[from] SourceError),

    #[error("invalid upstream origin: {0}")]
    Origin(#[from] axum::http::uri::InvalidUri),
}

/// HTTP server for the edge router.
pub struct HttpServer {
    router: Router,
    config: EdgeConfig,
    edge: Arc<EdgeRouter>,
}

impl HttpServer {
    /// Create a server with the rule source and monitor described by `config`.
    pub fn new(config: EdgeConfig) -> Result<Self, ServerError> {
        let fetch_timeout = Duration::from_millis(config.redirects.fetch_timeout_ms);
        let source: Arc<dyn RuleSource> = match config.redirects.source {
            RuleSourceKind::Cms => Arc::new(CmsRuleSource::new(&config.redirects.cms, fetch_timeout)?),
            RuleSourceKind::Static => Arc::new(StaticRuleSource::new(config.redirects.rules.clone())),
        };
        let monitor = build_monitor(&config.monitoring);
        Self::with_components(config, source, monitor)
    }

    /// Create a server with explicit collaborators.
    pub fn with_components(
        config: EdgeConfig,
        source: Arc<dyn RuleSource>,
        monitor: Arc<dyn RedirectMonitor>,
    ) -> Result<Self, ServerError> {
        let cache = Arc::new(RuleCache::new(
            source,
            Duration::from_secs(config.redirects.cache_ttl_secs),
            Duration::from_millis(config.redirects.fetch_timeout_ms),
        ));
        let tenants = TenantHeaders::from_config(&config.tenancy);
        let edge = Arc::new(EdgeRouter::new(&config, cache, tenants, monitor));

        let upstream = Upstream::new(
            config.upstream.origin.parse()?,
            Duration::from_secs(config.timeouts.upstream_secs),
        );

        let router = Self::build_router(&config, edge.clone(), upstream);
        Ok(Self {
            router,
            config,
            edge,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeConfig, edge: Arc<EdgeRouter>, upstream: Upstream) -> Router {
        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(upstream)
            .layer(middleware::from_fn_with_state(edge, edge_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, origin = %self.config.upstream.origin, "HTTP server starting");

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_addr = admin_listener.local_addr()?;
            let admin = setup_admin_router(self.edge.clone(), &self.config.admin.api_key);
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin_addr, "Admin API starting");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    pub fn edge(&self) -> Arc<EdgeRouter> {
        self.edge.clone()
    }
}

//! Pass-through forwarding to the origin page renderer.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the origin authority
//! - Forward method, headers (incl. x-site-*, x-request-id) and body
//! - Map origin failures to 502 and origin timeouts to 504

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::observability::metrics;

/// Pooled HTTP client bound to one origin.
#[derive(Clone)]
pub struct Upstream {
    origin: Authority,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Upstream {
    pub fn new(origin: Authority, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            origin,
            client,
            timeout,
        }
    }

    fn origin_uri(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.origin.clone())
            .path_and_query(path_and_query)
            .build()
    }

    /// Forward `request` to the origin and return its response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let (mut parts, body) = request.into_parts();

        parts.uri = match self.origin_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build origin URI");
                return (StatusCode::BAD_GATEWAY, "Invalid upstream request").into_response();
            }
        };

        let request = Request::from_parts(parts, body);
        match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                metrics::record_upstream(response.status().as_u16(), start);
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Ok(Err(e)) => {
                tracing::error!(origin = %self.origin, error = %e, "Origin request failed");
                metrics::record_upstream(502, start);
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            Err(_) => {
                tracing::error!(origin = %self.origin, timeout = ?self.timeout, "Origin request timed out");
                metrics::record_upstream(504, start);
                (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
            }
        }
    }
}

/// Catch-all handler forwarding pass-through requests.
pub async fn forward_handler(State(upstream): State<Upstream>, request: Request<Body>) -> Response {
    upstream.forward(request).await
}

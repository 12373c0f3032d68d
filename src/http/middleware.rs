//! Axum middleware running the edge router in front of every handler.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::edge::{EdgeAction, EdgeRouter, RequestTarget};
use crate::observability::metrics;

pub async fn edge_middleware(
    State(edge): State<Arc<EdgeRouter>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let target = RequestTarget::from_request(&request);

    match edge.evaluate(&target).await {
        EdgeAction::Skip => next.run(request).await,
        EdgeAction::Redirect(redirect) => match HeaderValue::from_str(&redirect.location) {
            Ok(location) => {
                metrics::record_redirect(redirect.kind.as_str(), redirect.status.as_u16());
                (redirect.status, [(header::LOCATION, location)]).into_response()
            }
            Err(_) => {
                tracing::warn!(
                    path = %target.path,
                    location = %redirect.location,
                    "Redirect location is not a valid header value, passing through"
                );
                next.run(request).await
            }
        },
        EdgeAction::Continue(headers) => {
            for (name, value) in headers.iter() {
                request.headers_mut().insert(name.clone(), value.clone());
            }
            let mut response = next.run(request).await;
            response.headers_mut().extend(headers);
            response
        }
    }
}

//! Operator API for the redirect cache.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::edge::EdgeRouter;
use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub edge: Arc<EdgeRouter>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(edge: Arc<EdgeRouter>, api_key: &str) -> Router {
    let state = AdminState {
        edge,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/redirects", get(get_redirects))
        .route("/admin/redirects/invalidate", post(invalidate_redirects))
        .route("/admin/resolve", get(resolve_path))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

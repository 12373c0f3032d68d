use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::routing::cache::CacheSnapshot;
use crate::routing::resolver::append_query;
use crate::routing::{resolve, Decision};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub canonical_host: String,
}

#[derive(Deserialize)]
pub struct ResolveParams {
    pub path: String,
    pub query: Option<String>,
}

/// Dry-run result of resolving a path against the cached rules.
#[derive(Debug, Serialize, PartialEq)]
pub struct ResolveReport {
    pub decision: &'static str,
    pub location: Option<String>,
    pub status: Option<u16>,
    pub match_type: Option<String>,
}

impl ResolveReport {
    /// Report the `Location` a client sending `query` would receive.
    pub fn new(decision: Decision, query: Option<&str>) -> Self {
        match decision {
            Decision::Internal {
                path,
                status,
                query_handling,
                match_type,
            } => Self {
                decision: "internal",
                location: Some(append_query(&path, query, query_handling)),
                status: Some(status.as_u16()),
                match_type: Some(match_type.to_string()),
            },
            Decision::External {
                url,
                status,
                match_type,
                ..
            } => Self {
                decision: "external",
                location: Some(url),
                status: Some(status.as_u16()),
                match_type: Some(match_type.to_string()),
            },
            Decision::PassThrough => Self {
                decision: "pass-through",
                location: None,
                status: None,
                match_type: None,
            },
        }
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        canonical_host: state.edge.canonical_host().to_string(),
    })
}

pub async fn get_redirects(State(state): State<AdminState>) -> Json<CacheSnapshot> {
    Json(state.edge.cache().snapshot())
}

pub async fn invalidate_redirects(State(state): State<AdminState>) -> Json<serde_json::Value> {
    state.edge.cache().invalidate();
    Json(serde_json::json!({ "invalidated": true }))
}

pub async fn resolve_path(
    State(state): State<AdminState>,
    Query(params): Query<ResolveParams>,
) -> Json<ResolveReport> {
    let rules = state.edge.cache().get().await;
    let query = params.query.as_deref();
    Json(ResolveReport::new(resolve(&params.path, query, &rules), query))
}

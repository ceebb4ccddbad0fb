//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{HealthResponse, InvalidateResponse, StatsResponse};

/// Header reporting whether a proxied body came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read-through client, owning the cache
    pub client: Arc<ApiClient>,
}

impl AppState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

// Re-attach the query string so that it takes part in the cache key
fn request_target(path: String, query: Option<String>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path,
    }
}

/// Handler for GET /api/*path
///
/// Serves the remote body for `path`, from the cache when possible.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let target = request_target(path, query);
    let (body, status) = state.client.lookup(&target).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (X_CACHE, status.as_str()),
        ],
        body,
    )
        .into_response())
}

/// Handler for DELETE /api/*path
///
/// Drops the cached body for `path`, if any.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<InvalidateResponse>> {
    let target = request_target(path, query);
    let removed = state.client.invalidate(&target).await?;

    Ok(Json(InvalidateResponse::new(target, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.client.cache();
    let interval_ms = u64::try_from(cache.eviction_interval().as_millis()).unwrap_or(u64::MAX);

    Json(StatsResponse::new(
        &cache.stats(),
        state.client.fetch_count(),
        interval_ms,
        cache.reaper_state(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

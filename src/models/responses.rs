//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing JSON bodies. Proxied bodies are passed
//! through untouched and have no DTO.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::tasks::ReaperState;

/// Response body for DELETE /api/*path
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// The request path that was invalidated
    pub path: String,
    /// Whether a cached body was actually dropped
    pub removed: bool,
}

impl InvalidateResponse {
    pub fn new(path: impl Into<String>, removed: bool) -> Self {
        Self {
            path: path.into(),
            removed,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries removed by the reaper
    pub reaped: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Remote fetches issued
    pub fetches: u64,
    /// Eviction interval in milliseconds
    pub eviction_interval_ms: u64,
    /// Reaper lifecycle state
    pub reaper: ReaperState,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a stats snapshot and client counters
    pub fn new(
        stats: &CacheStats,
        fetches: u64,
        eviction_interval_ms: u64,
        reaper: ReaperState,
    ) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            reaped: stats.reaped,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            fetches,
            eviction_interval_ms,
            reaper,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

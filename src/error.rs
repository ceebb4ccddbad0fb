//! Error types for the read-through layer
//!
//! The cache itself has no failure modes; every error here comes from
//! resolving, fetching, or decoding a remote resource.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Fetch Error Enum ==
/// Unified error type for read-through operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request path or URL could not be resolved
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration values could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Network or connection failure, including timeouts
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote system answered 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote system answered with another non-success status
    #[error("Remote returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// Freshly fetched bytes did not decode into the requested type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Cached bytes failed to decode; the cache only holds verbatim responses,
    /// so this is a defect rather than a remote problem
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let status = match &self {
            FetchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            FetchError::NotFound(_) => StatusCode::NOT_FOUND,
            FetchError::Transport(_) | FetchError::Status { .. } => StatusCode::BAD_GATEWAY,
            FetchError::InvalidConfig(_) | FetchError::Decode(_) | FetchError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for read-through operations.
pub type Result<T> = std::result::Result<T, FetchError>;

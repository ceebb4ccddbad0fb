//! API Module
//!
//! HTTP handlers and routing for the read-through gateway.
//!
//! # Endpoints
//! - `GET /api/*path` - Serve a remote resource through the cache
//! - `DELETE /api/*path` - Invalidate a cached resource
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

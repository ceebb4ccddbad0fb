//! Pokecache - A self-expiring read-through cache
//!
//! A concurrent key-value cache whose entries are reclaimed by a background
//! reaper, plus the read-through client that sits it in front of a remote
//! HTTP API.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheConfig, ReadPolicy};
pub use client::ApiClient;
pub use config::Config;
pub use error::FetchError;

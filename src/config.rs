//! Configuration Module
//!
//! Handles loading cache, client, and gateway settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheConfig, ReadPolicy};

/// Default remote API the client sits in front of.
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/";

/// Runtime configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Age in milliseconds after which the reaper removes an entry
    pub eviction_interval_ms: u64,
    /// Timeout in milliseconds for a single remote fetch
    pub fetch_timeout_ms: u64,
    /// Base URL that relative request paths are resolved against
    pub api_base_url: String,
    /// HTTP gateway port
    pub server_port: u16,
    /// Whether lookups reject entries older than the eviction interval
    pub strict_reads: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_INTERVAL_MS` - Eviction interval (default: 5000)
    /// - `FETCH_TIMEOUT_MS` - Remote fetch timeout (default: 10000)
    /// - `API_BASE_URL` - Remote API base (default: [`DEFAULT_BASE_URL`])
    /// - `SERVER_PORT` - Gateway port (default: 3000)
    /// - `STRICT_READS` - `true`/`1`/`yes` enables strict reads (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            eviction_interval_ms: parse_env("CACHE_INTERVAL_MS")
                .unwrap_or(defaults.eviction_interval_ms),
            fetch_timeout_ms: parse_env("FETCH_TIMEOUT_MS").unwrap_or(defaults.fetch_timeout_ms),
            api_base_url: env::var("API_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            strict_reads: env::var("STRICT_READS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.strict_reads),
        }
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Builds the cache parameters described by this config.
    pub fn cache_config(&self) -> CacheConfig {
        let policy = if self.strict_reads {
            ReadPolicy::Strict
        } else {
            ReadPolicy::Sweep
        };
        CacheConfig::new(self.eviction_interval()).read_policy(policy)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eviction_interval_ms: 5_000,
            fetch_timeout_ms: 10_000,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            server_port: 3000,
            strict_reads: false,
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

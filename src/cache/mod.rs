//! Cache Module
//!
//! Provides the in-memory self-expiring cache: an exclusively locked store
//! whose stale entries are reclaimed by a background reaper.

mod entry;
mod handle;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use handle::Cache;
pub use stats::CacheStats;
pub use store::{CacheConfig, ExpiringStore, ReadPolicy, MIN_EVICTION_INTERVAL};

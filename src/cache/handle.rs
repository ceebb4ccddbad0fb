//! Cache Handle Module
//!
//! Pairs an [`ExpiringStore`] with its reaper behind one cloneable handle.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::cache::{CacheConfig, CacheStats, ExpiringStore, ReadPolicy};
use crate::tasks::{spawn_reaper, ReaperHandle, ReaperState};

// == Cache ==
/// A self-expiring key-value cache.
///
/// Clones share the same entries and the same reaper. The reaper stops on
/// [`Cache::shutdown`], or once the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<ExpiringStore>,
    reaper: Arc<ReaperHandle>,
}

impl Cache {
    // == Constructor ==
    /// Creates an empty cache and starts its reaper.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new(eviction_interval: Duration) -> Self {
        Self::with_config(CacheConfig::new(eviction_interval))
    }

    /// Creates an empty cache from a full config and starts its reaper.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn with_config(config: CacheConfig) -> Self {
        let store = Arc::new(ExpiringStore::new(config));
        let reaper = Arc::new(spawn_reaper(Arc::clone(&store)));
        Self { store, reaper }
    }

    pub fn add(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.store.add(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.store.get(key)
    }

    pub(crate) fn peek(&self, key: &str) -> Option<Bytes> {
        self.store.peek(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.store.remove(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Runs one sweep now, outside the reaper's schedule.
    pub fn sweep(&self) -> usize {
        self.store.sweep()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn eviction_interval(&self) -> Duration {
        self.store.eviction_interval()
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.store.read_policy()
    }

    pub fn reaper_state(&self) -> ReaperState {
        self.reaper.state()
    }

    // == Shutdown ==
    /// Stops the reaper and waits for it to exit.
    ///
    /// Point operations keep working afterwards; entries simply stop expiring.
    pub async fn shutdown(&self) {
        self.reaper.shutdown().await;
    }
}

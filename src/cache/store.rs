//! Expiring Store Module
//!
//! The key to entry mapping behind a single exclusive lock. Staleness is
//! enforced by sweeps, not by lookups, unless the strict read policy is chosen.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats};

/// Smallest eviction interval accepted; a zero-period timer cannot be built.
pub const MIN_EVICTION_INTERVAL: Duration = Duration::from_millis(1);

// == Read Policy ==
/// How `get` treats entries older than the eviction interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Lookups never check age; an expired but unswept entry is still a hit.
    /// Entries can therefore be served up to one interval plus sweep latency
    /// after insertion.
    #[default]
    Sweep,
    /// Lookups treat an entry older than the interval as a miss and drop it.
    Strict,
}

// == Cache Config ==
/// Construction parameters for a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age an entry may reach before a sweep removes it
    pub eviction_interval: Duration,
    /// Whether lookups check entry age themselves
    pub read_policy: ReadPolicy,
}

impl CacheConfig {
    /// Creates a config with the given interval and the default read policy.
    pub fn new(eviction_interval: Duration) -> Self {
        Self {
            eviction_interval,
            read_policy: ReadPolicy::default(),
        }
    }

    /// Returns a copy with the given read policy.
    pub fn read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

// == Expiring Store ==
/// Thread-safe mapping from key to [`CacheEntry`].
///
/// Every operation takes the same lock for its full duration and never
/// suspends while holding it, so all operations (sweeps included) are
/// totally ordered by lock acquisition.
#[derive(Debug)]
pub struct ExpiringStore {
    state: Mutex<StoreState>,
    eviction_interval: Duration,
    read_policy: ReadPolicy,
}

impl ExpiringStore {
    // == Constructor ==
    /// Creates an empty store. Intervals below [`MIN_EVICTION_INTERVAL`] are
    /// raised to it.
    pub fn new(config: CacheConfig) -> Self {
        let eviction_interval = if config.eviction_interval < MIN_EVICTION_INTERVAL {
            warn!(
                requested = ?config.eviction_interval,
                "Eviction interval too small, using {:?}",
                MIN_EVICTION_INTERVAL
            );
            MIN_EVICTION_INTERVAL
        } else {
            config.eviction_interval
        };

        Self {
            state: Mutex::new(StoreState::default()),
            eviction_interval,
            read_policy: config.read_policy,
        }
    }

    // A panic under the lock can only happen mid-way through a map operation
    // on our side; the map itself stays valid, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Add ==
    /// Inserts or replaces the entry for `key`, stamped with the current time.
    ///
    /// Last write wins; the previous value is discarded.
    pub fn add(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        let key = key.into();
        let entry = CacheEntry::new(value.into());

        let mut state = self.lock();
        state.entries.insert(key, entry);
        let count = state.entries.len();
        state.stats.set_total_entries(count);
    }

    // == Get ==
    /// Returns the stored value for `key`, or `None` if there is none.
    ///
    /// Under [`ReadPolicy::Sweep`] the entry's age is not consulted.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let expired = match state.entries.get(key) {
            Some(entry) => {
                self.read_policy == ReadPolicy::Strict
                    && entry.is_expired(self.eviction_interval, Instant::now())
            }
            None => {
                state.stats.record_miss();
                return None;
            }
        };

        if expired {
            state.entries.remove(key);
            let count = state.entries.len();
            state.stats.set_total_entries(count);
            state.stats.record_miss();
            debug!(key = key, "Dropped stale entry on strict read");
            return None;
        }

        state.stats.record_hit();
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Like [`get`](Self::get), but leaves the stats and the entries untouched.
    pub(crate) fn peek(&self, key: &str) -> Option<Bytes> {
        let state = self.lock();
        let entry = state.entries.get(key)?;

        if self.read_policy == ReadPolicy::Strict
            && entry.is_expired(self.eviction_interval, Instant::now())
        {
            return None;
        }
        Some(entry.value.clone())
    }

    // == Remove ==
    /// Deletes the entry for `key`; returns whether one was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.lock();
        let removed = state.entries.remove(key).is_some();
        let count = state.entries.len();
        state.stats.set_total_entries(count);
        removed
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    // == Sweep ==
    /// Removes every entry older than the eviction interval.
    ///
    /// The threshold is taken from the clock on each call. Returns the number
    /// of entries removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let interval = self.eviction_interval;

        let mut state = self.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| !entry.is_expired(interval, now));
        let removed = before - state.entries.len();

        let count = state.entries.len();
        state.stats.set_total_entries(count);
        state.stats.record_reaped(removed);
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    pub fn eviction_interval(&self) -> Duration {
        self.eviction_interval
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    #[cfg(test)]
    pub(crate) fn inserted_at(&self, key: &str) -> Option<Instant> {
        self.lock().entries.get(key).map(|entry| entry.inserted_at)
    }
}

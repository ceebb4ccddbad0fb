//! Cache Entry Module
//!
//! Defines a single cached response body together with its insertion time.

use std::time::{Duration, Instant};

use bytes::Bytes;

// == Cache Entry ==
/// One cached value plus the moment it was inserted.
///
/// The value is opaque: the cache never looks inside it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload, exactly as handed to `add`
    pub value: Bytes,
    /// Insertion timestamp on the monotonic clock
    pub inserted_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    // == Age ==
    /// Returns how long the entry has been stored, measured against `now`.
    ///
    /// Saturates to zero if `now` is earlier than the insertion time.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    // == Is Expired ==
    /// Checks whether the entry is strictly older than `interval` at `now`.
    ///
    /// An entry whose age equals the interval exactly is still live; it becomes
    /// eligible for removal on the next sweep.
    pub fn is_expired(&self, interval: Duration, now: Instant) -> bool {
        self.age(now) > interval
    }
}

//! In-Flight Module
//!
//! Per-key guards so that concurrent misses for one key issue a single fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Tracks keys that currently have a fetch running.
#[derive(Debug, Default)]
pub struct InFlight {
    keys: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits until no other caller holds the guard for `key`, then takes it.
    ///
    /// Dropping the returned future while it waits leaves no trace in the map.
    pub async fn acquire(&self, key: &str) -> InFlightGuard<'_> {
        let slot = Slot {
            owner: self,
            key: key.to_string(),
            mutex: Arc::clone(self.keys().entry(key.to_string()).or_default()),
        };
        let permit = Arc::clone(&slot.mutex).lock_owned().await;

        InFlightGuard {
            _permit: permit,
            _slot: slot,
        }
    }

    /// Number of keys with a holder or waiter.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// Held while fetching one key; released on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    // Declared first so its reference is gone before the slot counts
    _permit: OwnedMutexGuard<()>,
    _slot: Slot<'a>,
}

/// One caller's claim on a key, from the start of `acquire` until release.
#[derive(Debug)]
struct Slot<'a> {
    owner: &'a InFlight,
    key: String,
    mutex: Arc<AsyncMutex<()>>,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let mut keys = self.owner.keys();
        // The map and this slot are the only references left
        if Arc::strong_count(&self.mutex) == 2 {
            keys.remove(&self.key);
        }
    }
}

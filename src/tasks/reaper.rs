//! Reaper Task
//!
//! Background task that periodically sweeps expired entries out of an
//! [`ExpiringStore`], until it is told to stop.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ExpiringStore;

// == Reaper State ==
/// Lifecycle of a reaper task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaperState {
    /// Ticking on its fixed period
    Running,
    /// No further sweeps will happen
    Stopped,
}

// == Reaper Handle ==
/// Owner of a running reaper task.
///
/// Stopping is explicit through [`ReaperHandle::shutdown`]. Dropping the handle
/// closes the stop channel, which also ends the task.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReaperHandle {
    // == State ==
    /// Reports whether the task is still ticking.
    pub fn state(&self) -> ReaperState {
        match self.task.try_lock() {
            Ok(task) => match task.as_ref() {
                Some(handle) if !handle.is_finished() => ReaperState::Running,
                _ => ReaperState::Stopped,
            },
            // Held by a shutdown still waiting on the task
            Err(_) => ReaperState::Running,
        }
    }

    // == Shutdown ==
    /// Signals the task to stop and waits for it to exit.
    ///
    /// Calling this more than once is harmless; concurrent callers all return
    /// only once the task is gone.
    pub async fn shutdown(&self) {
        // Nobody listening means the task is already gone
        let _ = self.shutdown_tx.send(());

        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Reaper task did not exit cleanly");
            }
        }
    }
}

/// Spawns the reaper for `store`, ticking every eviction interval.
///
/// The first sweep happens one full interval after spawning. Must be called
/// from within a tokio runtime.
///
/// # Example
/// ```ignore
/// let store = Arc::new(ExpiringStore::new(CacheConfig::new(Duration::from_secs(5))));
/// let reaper = spawn_reaper(store.clone());
/// // Later, during shutdown:
/// reaper.shutdown().await;
/// ```
pub fn spawn_reaper(store: Arc<ExpiringStore>) -> ReaperHandle {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(run(store, shutdown_rx));

    ReaperHandle {
        shutdown_tx,
        task: Mutex::new(Some(task)),
    }
}

async fn run(store: Arc<ExpiringStore>, mut shutdown_rx: broadcast::Receiver<()>) {
    let period = store.eviction_interval();
    let mut ticker = tokio::time::interval(period);

    // Skip first tick (fires immediately)
    ticker.tick().await;

    info!(interval = ?period, "Reaper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = store.sweep();
                if removed > 0 {
                    info!(removed = removed, "Reaper removed expired entries");
                } else {
                    debug!("Reaper found no expired entries");
                }
            }
            // A stop signal and a closed channel both end the loop
            _ = shutdown_rx.recv() => {
                info!("Reaper stopped");
                break;
            }
        }
    }
}

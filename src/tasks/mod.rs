//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Reaper: removes entries older than the eviction interval

mod reaper;

pub use reaper::{spawn_reaper, ReaperHandle, ReaperState};

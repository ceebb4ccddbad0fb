//! Client Module
//!
//! The read-through side of the cache: canonical keys, the fetch seam, the
//! per-key in-flight guard, and the client that ties them to a [`Cache`].
//!
//! [`Cache`]: crate::cache::Cache

mod fetcher;
mod in_flight;
mod key;
mod read_through;

pub use fetcher::{Fetcher, HttpFetcher};
pub use in_flight::{InFlight, InFlightGuard};
pub use key::cache_key;
pub use read_through::{ApiClient, CacheStatus};

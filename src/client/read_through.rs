//! Read-Through Client
//!
//! Composes the cache with a [`Fetcher`]: look up the canonical key first,
//! fetch only on a miss, and store exactly the bytes that came back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::cache::Cache;
use crate::client::{cache_key, Fetcher, HttpFetcher, InFlight};
use crate::config::Config;
use crate::error::{FetchError, Result};

// == Cache Status ==
/// Whether a response was served from the cache or fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

// == Api Client ==
/// Read-through client for one remote API.
pub struct ApiClient {
    base_url: Url,
    cache: Cache,
    fetcher: Arc<dyn Fetcher>,
    in_flight: InFlight,
    fetches: AtomicU64,
}

impl ApiClient {
    // == Constructor ==
    /// Creates a client resolving relative paths against `base_url`.
    pub fn new(mut base_url: Url, cache: Cache, fetcher: Arc<dyn Fetcher>) -> Self {
        // Without a trailing slash `join` would replace the last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            base_url,
            cache,
            fetcher,
            in_flight: InFlight::new(),
            fetches: AtomicU64::new(0),
        }
    }

    /// Builds the HTTP fetcher and cache described by `config`.
    ///
    /// Starts the cache's reaper, so this must run inside a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            FetchError::InvalidConfig(format!("invalid base URL {}: {e}", config.api_base_url))
        })?;
        let fetcher = HttpFetcher::new(config.fetch_timeout())?;
        let cache = Cache::with_config(config.cache_config());

        Ok(Self::new(base_url, cache, Arc::new(fetcher)))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Number of remote fetches issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    // == Resolve ==
    /// Turns a request path into an absolute URL.
    ///
    /// Relative paths are joined onto the base URL. Absolute URLs (such as
    /// pagination links returned by the API) are accepted when they share the
    /// base URL's origin. Either way the result must stay under the base path.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let path = path.trim();
        if path.is_empty() {
            return Err(FetchError::InvalidRequest("empty request path".to_string()));
        }

        let url = match Url::parse(path) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .join(path.trim_start_matches('/'))
                .map_err(|e| FetchError::InvalidRequest(format!("invalid path {path}: {e}")))?,
            Err(e) => return Err(FetchError::InvalidRequest(format!("invalid URL {path}: {e}"))),
        };

        // Dot segments are already collapsed by the parser
        if url.origin() != self.base_url.origin()
            || !url.path().starts_with(self.base_url.path())
        {
            return Err(FetchError::InvalidRequest(format!(
                "{url} is outside {}",
                self.base_url
            )));
        }

        Ok(url)
    }

    /// Returns the cache key a request path maps to.
    pub fn key_for(&self, path: &str) -> Result<String> {
        self.resolve(path).map(|url| cache_key(&url))
    }

    // == Lookup ==
    /// Returns the body for `path`, fetching and caching it on a miss.
    ///
    /// Concurrent misses for the same key wait for the first fetch instead of
    /// issuing their own. Failed fetches are never cached and never retried.
    pub async fn lookup(&self, path: &str) -> Result<(Bytes, CacheStatus)> {
        let url = self.resolve(path)?;
        let key = cache_key(&url);

        if let Some(body) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok((body, CacheStatus::Hit));
        }

        let _guard = self.in_flight.acquire(&key).await;

        // Filled by another caller while we waited; already counted as a miss
        if let Some(body) = self.cache.peek(&key) {
            debug!(key = %key, "Cache hit after waiting on in-flight fetch");
            return Ok((body, CacheStatus::Hit));
        }

        debug!(key = %key, "Cache miss, fetching");
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let body = match self.fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(err) => {
                warn!(key = %key, error = %err, "Fetch failed");
                return Err(err);
            }
        };

        self.cache.add(key, body.clone());
        Ok((body, CacheStatus::Miss))
    }

    /// Returns the raw body for `path`.
    pub async fn get_raw(&self, path: &str) -> Result<Bytes> {
        self.lookup(path).await.map(|(body, _)| body)
    }

    // == Get JSON ==
    /// Returns the body for `path` decoded as `T`.
    ///
    /// Decode failures on cached bytes are reported as
    /// [`FetchError::Internal`]; on freshly fetched bytes as
    /// [`FetchError::Decode`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (body, status) = self.lookup(path).await?;

        serde_json::from_slice(&body).map_err(|e| match status {
            CacheStatus::Hit => {
                FetchError::Internal(format!("cached body for {path} failed to decode: {e}"))
            }
            CacheStatus::Miss => FetchError::Decode(format!("body for {path}: {e}")),
        })
    }

    // == Invalidate ==
    /// Drops the cached body for `path`; returns whether one was present.
    pub async fn invalidate(&self, path: &str) -> Result<bool> {
        let key = self.key_for(path)?;
        let removed = self.cache.remove(&key);
        debug!(key = %key, removed = removed, "Invalidated");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const BASE: &str = "https://pokeapi.co/api/v2/";

    /// Serves canned bodies by URL and counts calls.
    #[derive(Default)]
    struct FakeFetcher {
        bodies: Mutex<HashMap<String, Result<Bytes>>>,
        calls: AtomicU64,
        delay: Duration,
    }

    impl FakeFetcher {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn respond(&self, url: &str, body: Result<Bytes>) {
            self.bodies.lock().unwrap().insert(url.to_string(), body);
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.bodies
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .unwrap_or_else(|| Err(FetchError::NotFound(url.to_string())))
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pokemon {
        name: String,
        base_experience: u32,
    }

    fn client_with(fetcher: Arc<FakeFetcher>) -> ApiClient {
        let cache = Cache::new(Duration::from_secs(60));
        ApiClient::new(Url::parse(BASE).unwrap(), cache, fetcher)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches_exact_bytes() {
        let fetcher = Arc::new(FakeFetcher::default());
        let raw = Bytes::from_static(b"{\"name\":\"pikachu\",  \"base_experience\":112}");
        fetcher.respond("https://pokeapi.co/api/v2/pokemon/pikachu", Ok(raw.clone()));
        let client = client_with(fetcher.clone());

        let (body, status) = client.lookup("pokemon/pikachu").await.unwrap();

        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(body, raw);
        assert_eq!(
            client.cache().get("https://pokeapi.co/api/v2/pokemon/pikachu"),
            Some(raw)
        );
        assert_eq!(fetcher.calls(), 1);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.respond(
            "https://pokeapi.co/api/v2/location/",
            Ok(Bytes::from_static(b"{}")),
        );
        let client = client_with(fetcher.clone());

        assert_ok!(client.get_raw("location/").await);
        let (_, status) = client.lookup("/location/").await.unwrap();

        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(client.fetch_count(), 1);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_equivalent_requests_share_key() {
        let fetcher = Arc::new(FakeFetcher::default());
        // Only the first spelling is ever fetched
        fetcher.respond(
            "https://pokeapi.co/api/v2/location/?offset=20&limit=20",
            Ok(Bytes::from_static(b"{}")),
        );
        let client = client_with(fetcher.clone());

        assert_ok!(client.get_raw("location/?offset=20&limit=20").await);
        assert_ok!(
            client
                .get_raw("https://pokeapi.co/api/v2/location/?limit=20&offset=20")
                .await
        );

        assert_eq!(fetcher.calls(), 1);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let fetcher = Arc::new(FakeFetcher::default());
        let client = client_with(fetcher.clone());

        let err = client.get_raw("location-area/nowhere").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(client.cache().is_empty());

        // Not retried internally, and the next call fetches again
        assert_eq!(fetcher.calls(), 1);
        assert_err!(client.get_raw("location-area/nowhere").await);
        assert_eq!(fetcher.calls(), 2);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_status_error_propagates() {
        let fetcher = Arc::new(FakeFetcher::default());
        let url = "https://pokeapi.co/api/v2/pokemon/mew";
        fetcher.respond(
            url,
            Err(FetchError::Status {
                status: 500,
                url: url.to_string(),
            }),
        );
        let client = client_with(fetcher);

        let err = client.get_raw("pokemon/mew").await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        assert!(client.cache().is_empty());

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let fetcher = Arc::new(FakeFetcher::with_delay(Duration::from_millis(50)));
        fetcher.respond(
            "https://pokeapi.co/api/v2/pokemon/ditto",
            Ok(Bytes::from_static(b"{}")),
        );
        let client = Arc::new(client_with(fetcher.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.lookup("pokemon/ditto").await })
            })
            .collect();

        let mut misses = 0;
        for task in tasks {
            let (_, status) = task.await.unwrap().unwrap();
            if status == CacheStatus::Miss {
                misses += 1;
            }
        }

        assert_eq!(misses, 1);
        assert_eq!(fetcher.calls(), 1);
        assert!(client.in_flight.is_empty());

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_waiter_refetches_after_failed_fetch() {
        let fetcher = Arc::new(FakeFetcher::with_delay(Duration::from_millis(30)));
        let client = Arc::new(client_with(fetcher.clone()));

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.get_raw("pokemon/missingno").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.get_raw("pokemon/missingno").await })
        };

        assert_err!(first.await.unwrap());
        assert_err!(second.await.unwrap());
        assert_eq!(fetcher.calls(), 2);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_get_json_decodes() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.respond(
            "https://pokeapi.co/api/v2/pokemon/pikachu",
            Ok(Bytes::from_static(
                b"{\"name\":\"pikachu\",\"base_experience\":112,\"height\":4}",
            )),
        );
        let client = client_with(fetcher);

        let expected = Pokemon {
            name: "pikachu".to_string(),
            base_experience: 112,
        };
        let fetched: Pokemon = client.get_json("pokemon/pikachu").await.unwrap();
        let cached: Pokemon = client.get_json("pokemon/pikachu").await.unwrap();

        assert_eq!(fetched, expected);
        assert_eq!(cached, expected);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_decode_errors_distinguish_fresh_and_cached() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.respond(
            "https://pokeapi.co/api/v2/pokemon/glitch",
            Ok(Bytes::from_static(b"not json")),
        );
        let client = client_with(fetcher);

        let fresh = client.get_json::<Pokemon>("pokemon/glitch").await.unwrap_err();
        assert!(matches!(fresh, FetchError::Decode(_)));

        let cached = client.get_json::<Pokemon>("pokemon/glitch").await.unwrap_err();
        assert!(matches!(cached, FetchError::Internal(_)));

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.respond(
            "https://pokeapi.co/api/v2/pokemon/eevee",
            Ok(Bytes::from_static(b"{}")),
        );
        let client = client_with(fetcher.clone());

        assert_ok!(client.get_raw("pokemon/eevee").await);
        assert!(client.invalidate("pokemon/eevee").await.unwrap());
        assert!(!client.invalidate("pokemon/eevee").await.unwrap());

        let (_, status) = client.lookup("pokemon/eevee").await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(fetcher.calls(), 2);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_resolve() {
        let client = client_with(Arc::new(FakeFetcher::default()));

        assert_eq!(
            client.resolve("location-area/canalave-city").unwrap().as_str(),
            "https://pokeapi.co/api/v2/location-area/canalave-city"
        );
        assert_eq!(
            client
                .resolve("https://pokeapi.co/api/v2/location/?offset=20&limit=20")
                .unwrap()
                .as_str(),
            "https://pokeapi.co/api/v2/location/?offset=20&limit=20"
        );
        assert!(matches!(
            client.resolve("   "),
            Err(FetchError::InvalidRequest(_))
        ));
        assert!(matches!(
            client.resolve("https://elsewhere.test/api"),
            Err(FetchError::InvalidRequest(_))
        ));

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_resolve_stays_under_base_path() {
        let client = client_with(Arc::new(FakeFetcher::default()));

        for path in [
            "../../admin",
            "pokemon/../../../admin",
            "%2e%2e/%2e%2e/admin",
            "https://pokeapi.co/admin",
            "https://pokeapi.co/api/v1/pokemon/ditto",
        ] {
            assert!(
                matches!(client.resolve(path), Err(FetchError::InvalidRequest(_))),
                "{path} resolved"
            );
        }

        // Dot segments that stay inside the base path are fine
        assert_eq!(
            client.resolve("pokemon/../berry/cheri").unwrap().as_str(),
            "https://pokeapi.co/api/v2/berry/cheri"
        );

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_miss_then_hit_counts_once_each() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.respond(
            "https://pokeapi.co/api/v2/pokemon/snorlax",
            Ok(Bytes::from_static(b"{}")),
        );
        let client = client_with(fetcher);

        assert_ok!(client.get_raw("pokemon/snorlax").await);
        assert_ok!(client.get_raw("pokemon/snorlax").await);

        let stats = client.cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_rate(), 0.5);

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_base_url_without_trailing_slash() {
        let cache = Cache::new(Duration::from_secs(60));
        let client = ApiClient::new(
            Url::parse("https://pokeapi.co/api/v2").unwrap(),
            cache,
            Arc::new(FakeFetcher::default()),
        );

        assert_eq!(client.base_url().as_str(), "https://pokeapi.co/api/v2/");
        assert_eq!(
            client.resolve("pokemon/ditto").unwrap().as_str(),
            "https://pokeapi.co/api/v2/pokemon/ditto"
        );

        client.cache().shutdown().await;
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_base_url() {
        let config = Config {
            api_base_url: "not a url".to_string(),
            ..Config::default()
        };

        let result = ApiClient::from_config(&config);

        assert!(matches!(result, Err(FetchError::InvalidConfig(_))));
    }
}

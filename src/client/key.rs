//! Cache Key Module
//!
//! Derives a canonical cache key from a request URL.

use url::Url;

/// Returns the canonical cache key for `url`.
///
/// Scheme and host are already normalised by the URL parser (lowercase host,
/// default port dropped). On top of that, the fragment is dropped and query
/// pairs are sorted, so requests that differ only in parameter order share a key.
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort();
        url.query_pairs_mut().clear().extend_pairs(&pairs);
    }

    url.into()
}

//! Per-run memoization of build-service fetches
//!
//! The cache is owned by one `ObsClient` and keyed by request URL, so it
//! lives exactly as long as one detection run and never outlives the
//! credentials it was filled with. Both successful bodies and transport
//! failures are memoized: probing the same package twice in a batch (for
//! example a listing followed by a membership check) must not re-query the
//! server.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

/// A transport-level fetch failure: non-2xx status or connection error.
///
/// Cloneable so cached failures can be replayed without re-querying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request to {url} failed: {reason}")]
pub struct TransportError {
    pub url: String,
    pub reason: String,
}

/// Outcome of one HTTP fetch: the response body, or a transport failure.
pub type FetchOutcome = std::result::Result<String, TransportError>;

/// URL-keyed memoization of fetch outcomes.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, FetchOutcome>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<FetchOutcome> {
        self.entries
            .lock()
            .expect("response cache lock poisoned")
            .get(key)
            .cloned()
    }

    fn insert(&self, key: &str, outcome: FetchOutcome) {
        self.entries
            .lock()
            .expect("response cache lock poisoned")
            .insert(key.to_string(), outcome);
    }
}

/// Run `fetch` unless the cache already holds an outcome for `key`.
///
/// An identical key looked up twice performs exactly one underlying fetch.
pub async fn fetch_with_cache<F, Fut>(cache: &ResponseCache, key: &str, fetch: F) -> FetchOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchOutcome>,
{
    if let Some(hit) = cache.get(key) {
        return hit;
    }

    let outcome = fetch().await;
    cache.insert(key, outcome.clone());
    outcome
}

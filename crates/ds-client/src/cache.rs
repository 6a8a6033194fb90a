//! Bounded, time-expiring response cache
//!
//! LRU-bounded cache keyed by a request fingerprint, with a per-entry TTL.
//! `get_or_compute` runs the network call outside the lock: two callers
//! racing on the same cold key may both fetch, which is acceptable, but
//! neither can observe a half-written entry. Failed computations are never
//! cached.

use ds_core::Result;
use lru::LruCache;
use serde_json::Value;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
struct CacheEntry {
  value: Value,
  expires_at: Instant,
}

/// LRU + TTL cache for successful response payloads.
pub struct ResponseCache {
  inner: Mutex<LruCache<String, CacheEntry>>,
}

impl ResponseCache {
  /// Cache holding at most `capacity` entries
  pub fn new(capacity: usize) -> Self {
    let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
    ResponseCache { inner: Mutex::new(LruCache::new(capacity)) }
  }

  /// Cached value for `key`, if present and unexpired. Expired entries are
  /// dropped on access; a hit refreshes the entry's recency.
  pub fn get(&self, key: &str) -> Option<Value> {
    let mut cache = self.inner.lock().expect("cache lock poisoned");
    match cache.get(key) {
      Some(entry) if entry.expires_at > Instant::now() => {
        trace!(key, "cache hit");
        Some(entry.value.clone())
      }
      Some(_) => {
        trace!(key, "cache entry expired");
        cache.pop(key);
        None
      }
      None => None,
    }
  }

  /// Store `value` under `key` for `ttl`. Overwrites refresh the expiry;
  /// exceeding capacity evicts the least-recently-used entry.
  pub fn insert(&self, key: impl Into<String>, value: Value, ttl: Duration) {
    let entry = CacheEntry { value, expires_at: Instant::now() + ttl };
    self.inner.lock().expect("cache lock poisoned").put(key.into(), entry);
  }

  /// Drop one entry regardless of TTL (e.g. after a mutating call).
  pub fn invalidate(&self, key: &str) {
    self.inner.lock().expect("cache lock poisoned").pop(key);
  }

  /// Drop everything.
  pub fn invalidate_all(&self) {
    self.inner.lock().expect("cache lock poisoned").clear();
  }

  /// Number of live entries (expired ones may still be counted until
  /// touched).
  pub fn len(&self) -> usize {
    self.inner.lock().expect("cache lock poisoned").len()
  }

  /// Whether the cache currently holds no entries.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Return the cached value for `key`, or run `compute`, cache its result
  /// for `ttl` and return it. Errors from `compute` pass through uncached.
  pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<Value>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value>>,
  {
    if let Some(value) = self.get(key) {
      return Ok(value);
    }

    let value = compute().await?;
    self.insert(key, value.clone(), ttl);
    Ok(value)
  }
}

impl std::fmt::Debug for ResponseCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResponseCache").field("len", &self.len()).finish()
  }
}

/// Deterministic cache key for an operation and its parameters.
/// Parameter order does not affect the fingerprint.
pub fn fingerprint(operation: &str, params: &[(&str, &str)]) -> String {
  let mut sorted: Vec<_> = params.to_vec();
  sorted.sort_unstable();
  let mut key = String::from(operation);
  for (name, value) in sorted {
    key.push('\u{1f}');
    key.push_str(name);
    key.push('=');
    key.push_str(value);
  }
  key
}

#[cfg(test)]
mod tests {
  use super::*;
  use ds_core::Error;
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[tokio::test]
  async fn test_compute_runs_at_most_once_within_ttl() {
    let cache = ResponseCache::new(10);
    let calls = AtomicU32::new(0);

    for _ in 0..3 {
      let value = cache
        .get_or_compute("k", Duration::from_secs(60), || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(json!({"v": 1}))
        })
        .await
        .unwrap();
      assert_eq!(value, json!({"v": 1}));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_expiry_forces_recompute() {
    let cache = ResponseCache::new(10);
    let calls = AtomicU32::new(0);

    let compute = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(json!(42))
    };

    cache.get_or_compute("k", Duration::ZERO, compute).await.unwrap();
    cache.get_or_compute("k", Duration::ZERO, compute).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_failures_are_never_cached() {
    let cache = ResponseCache::new(10);

    let result = cache
      .get_or_compute("k", Duration::from_secs(60), || async {
        Err(Error::Service { status: 503, message: "down".to_string() })
      })
      .await;
    assert!(result.is_err());
    assert!(cache.get("k").is_none());

    // next caller recomputes and succeeds
    let value = cache
      .get_or_compute("k", Duration::from_secs(60), || async { Ok(json!(1)) })
      .await
      .unwrap();
    assert_eq!(value, json!(1));
  }

  #[test]
  fn test_lru_evicts_least_recently_used() {
    let cache = ResponseCache::new(2);
    let ttl = Duration::from_secs(60);

    cache.insert("a", json!(1), ttl);
    cache.insert("b", json!(2), ttl);
    // touch "a" so "b" becomes the eviction candidate
    assert!(cache.get("a").is_some());

    cache.insert("c", json!(3), ttl);
    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());
    assert!(cache.get("c").is_some());
  }

  #[test]
  fn test_explicit_invalidation() {
    let cache = ResponseCache::new(10);
    cache.insert("a", json!(1), Duration::from_secs(60));
    cache.insert("b", json!(2), Duration::from_secs(60));

    cache.invalidate("a");
    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_some());

    cache.invalidate_all();
    assert!(cache.is_empty());
  }

  #[test]
  fn test_fingerprint_is_order_insensitive() {
    let a = fingerprint("documents/_search", &[("model", "PAGE"), ("limit", "50")]);
    let b = fingerprint("documents/_search", &[("limit", "50"), ("model", "PAGE")]);
    assert_eq!(a, b);

    let c = fingerprint("documents/_search", &[("limit", "51"), ("model", "PAGE")]);
    assert_ne!(a, c);
  }
}

/// In-process caching layer
///
/// A read-through cache over a concurrent map. Entries expire lazily on read
/// and are swept periodically by the job scheduler. There is no atomic
/// check-then-set: concurrent misses on the same key may both fetch, and the
/// last write wins.

mod key;

pub use key::{cache_key, prefixes};

use crate::config::CacheConfig;
use crate::error::AppResult;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest time an entry may live, whatever TTL is asked for
const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365);

fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-wide cache store
#[derive(Debug)]
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_ttl(Duration::from_secs(config.default_ttl))
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a live value. Expired or undecodable entries are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Instant::now();

        // Release the shard guard before any removal
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (entry.is_expired(now), entry.value.clone()));

        let value = match lookup {
            Some((false, value)) => value,
            Some((true, _)) => {
                self.entries.remove_if(key, |_, e| e.is_expired(now));
                self.record_miss(key);
                return None;
            }
            None => {
                self.record_miss(key);
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(decoded) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache HIT: {}", key);
                Some(decoded)
            }
            Err(e) => {
                warn!("Failed to decode cached value for {}: {}", key, e);
                self.entries.remove(key);
                self.record_miss(key);
                None
            }
        }
    }

    fn record_miss(&self, key: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache MISS: {}", key);
    }

    /// Store a value with the default TTL
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize value for cache key {}: {}", key, e);
                return;
            }
        };

        debug!("Cache SET: {} (TTL: {}s)", key, ttl.as_secs());
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: deadline(ttl),
            },
        );
    }

    pub fn delete(&self, key: &str) -> bool {
        debug!("Cache DELETE: {}", key);
        self.entries.remove(key).is_some()
    }

    /// Return the cached value, or run `fetcher` once and cache its result.
    ///
    /// Fetcher errors are propagated and nothing is cached. Results that
    /// serialize to `null` (an absent record) are returned but not cached.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(cached) = self.get::<T>(key) {
            return Ok(cached);
        }

        let fetched = fetcher().await?;

        match serde_json::to_value(&fetched) {
            Ok(Value::Null) => {}
            Ok(value) => {
                debug!("Cache SET: {} (TTL: {}s)", key, self.default_ttl.as_secs());
                self.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        value,
                        expires_at: deadline(self.default_ttl),
                    },
                );
            }
            Err(e) => warn!("Failed to serialize value for cache key {}: {}", key, e),
        }

        Ok(fetched)
    }

    /// Remove every key starting with `prefix`. Returns the number removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });

        debug!("Cache INVALIDATE prefix {}: {} keys", prefix, removed);
        removed
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        CacheStats {
            entries: self.entries.len(),
            hits,
            misses,
            hit_rate: if hits + misses > 0 {
                hits as f64 / (hits + misses) as f64
            } else {
                0.0
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn store() -> CacheStore {
        CacheStore::new(&CacheConfig::default())
    }

    #[tokio::test]
    async fn test_get_or_fetch_calls_fetcher_once() {
        let cache = store();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Vec<u32> = cache
                .get_or_fetch("tasks:1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = store();

        let result: AppResult<u32> = cache
            .get_or_fetch("user:id=1", || async {
                Err(AppError::NotFound("User not found".to_string()))
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_absent_result_is_not_cached() {
        let cache = store();

        let result: Option<u32> = cache
            .get_or_fetch("task:id=1", || async { Ok(None) })
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_prefix_removes_only_matching_keys() {
        let cache = store();
        cache.set("tasks:42:page=1", &json!([1]));
        cache.set("tasks:42:page=2", &json!([2]));
        cache.set("tasks:7:page=1", &json!([3]));
        cache.set("task:id=42", &json!({}));

        assert_eq!(cache.invalidate_prefix("tasks:42"), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get::<Value>("tasks:7:page=1").is_some());
        assert!(cache.get::<Value>("task:id=42").is_some());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = CacheStore::with_ttl(Duration::from_millis(20));
        cache.set("user:id=1", &"jane");
        assert_eq!(cache.get::<String>("user:id=1").as_deref(), Some("jane"));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get::<String>("user:id=1").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_is_capped() {
        let cache = CacheStore::with_ttl(Duration::MAX);

        let value: u32 = cache
            .get_or_fetch("user:id=1", || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        cache.set_with_ttl("user:id=2", &8, Duration::MAX);
        assert_eq!(cache.get::<u32>("user:id=1"), Some(7));
        assert_eq!(cache.get::<u32>("user:id=2"), Some(8));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = store();
        cache.set_with_ttl("short", &1, Duration::from_millis(10));
        cache.set("long", &2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_undecodable_entry_is_dropped() {
        let cache = store();
        cache.set("user:id=1", &"not a number");
        assert!(cache.get::<u32>("user:id=1").is_none());
        assert!(cache.is_empty());
    }
}

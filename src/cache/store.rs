//! Key-value storage for serialized responses.

use std::{fmt, num::NonZeroUsize, sync::RwLock, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const METRIC_CACHE_EVICTED: &str = "storefront_cache_evicted_total";

/// A serialized response body and the content type it was served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub content_type: String,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new("application/json", body)
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Storage backend for cached responses.
///
/// An entry moves absent → present → (expired | invalidated) → absent. A `get`
/// after the TTL has elapsed is a miss; `set` overwrites and restarts the TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError>;

    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration)
    -> Result<(), CacheError>;

    /// Remove every key starting with `prefix` (plain string prefix, no
    /// patterns). Returns the number of entries removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: CachedResponse,
    stored_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

/// Process-local [`CacheStore`] bounded by an LRU capacity.
///
/// Expiry is checked lazily: an expired entry stays in memory until it is
/// read, invalidated, evicted or swept by [`MemoryCacheStore::purge_expired`].
/// Reads refresh recency, so `set` on a full store evicts the entry read
/// least recently.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, StoredEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(CacheConfig::default().max_entries_non_zero())
    }

    pub fn with_capacity(max_entries: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(max_entries)),
        }
    }

    /// Entries currently held, expired or not.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        rw_read(&self.entries, "capacity").cap().get()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, "purge_expired");
        remove_where(&mut entries, |_, entry| entry.is_expired(now))
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = rw_read(&self.entries, "debug");
        f.debug_struct("MemoryCacheStore")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

fn remove_where<F>(entries: &mut LruCache<String, StoredEntry>, doomed: F) -> usize
where
    F: Fn(&str, &StoredEntry) -> bool,
{
    let keys: Vec<String> = entries
        .iter()
        .filter(|(key, entry)| doomed(key, entry))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &keys {
        entries.pop(key);
    }
    keys.len()
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, "get");
        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }
        entries.pop(key);
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: CachedResponse,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = StoredEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        let evicted = rw_write(&self.entries, "set")
            .push(key.to_string(), entry)
            .filter(|(evicted, _)| evicted != key);
        if let Some((evicted, _)) = evicted {
            counter!(METRIC_CACHE_EVICTED).increment(1);
            debug!(
                target = "storefront::cache::store",
                key = %evicted,
                "Evicted least recently used cache entry"
            );
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut entries = rw_write(&self.entries, "delete_prefix");
        Ok(remove_where(&mut entries, |key, _| key.starts_with(prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(text: &'static str) -> CachedResponse {
        CachedResponse::json(text)
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let store = MemoryCacheStore::new();
        store
            .set("products|GET||", body("[1]"), Duration::from_secs(10))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(
            store.get("products|GET||").await.expect("get"),
            Some(body("[1]"))
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("products|GET||").await.expect("get"), None);
        assert!(store.is_empty(), "expired entry is dropped on read");
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_refreshes_ttl() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(10);
        store.set("k", body("old"), ttl).await.expect("set");
        tokio::time::advance(Duration::from_secs(8)).await;
        store.set("k", body("new"), ttl).await.expect("set");
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get("k").await.expect("get"), Some(body("new")));
    }

    #[tokio::test]
    async fn delete_prefix_is_a_plain_string_match() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        for key in ["products|a", "products|b", "orders|c", "products*|d"] {
            store.set(key, body("x"), ttl).await.expect("set");
        }

        let removed = store.delete_prefix("products|").await.expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(store.get("products|a").await.expect("get"), None);
        assert_eq!(store.get("products|b").await.expect("get"), None);
        assert!(store.get("orders|c").await.expect("get").is_some());
        assert!(store.get("products*|d").await.expect("get").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired_entries() {
        let store = MemoryCacheStore::new();
        store
            .set("short", body("x"), Duration::from_secs(1))
            .await
            .expect("set");
        store
            .set("long", body("y"), Duration::from_secs(100))
            .await
            .expect("set");
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(store.len(), 2);
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn full_store_evicts_least_recently_used() {
        let store = MemoryCacheStore::with_capacity(NonZeroUsize::new(2).expect("non-zero"));
        let ttl = Duration::from_secs(60);
        store.set("products|a", body("a"), ttl).await.expect("set");
        store.set("products|b", body("b"), ttl).await.expect("set");
        assert!(store.get("products|a").await.expect("get").is_some());

        store.set("products|c", body("c"), ttl).await.expect("set");

        assert_eq!(store.len(), 2);
        assert_eq!(store.capacity(), 2);
        assert_eq!(store.get("products|b").await.expect("get"), None);
        assert!(store.get("products|a").await.expect("get").is_some());
        assert!(store.get("products|c").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn overwrite_does_not_evict_other_entries() {
        let store = MemoryCacheStore::with_capacity(NonZeroUsize::new(2).expect("non-zero"));
        let ttl = Duration::from_secs(60);
        store.set("a", body("1"), ttl).await.expect("set");
        store.set("b", body("2"), ttl).await.expect("set");
        store.set("a", body("3"), ttl).await.expect("set");

        assert_eq!(store.get("a").await.expect("get"), Some(body("3")));
        assert_eq!(store.get("b").await.expect("get"), Some(body("2")));
    }
}

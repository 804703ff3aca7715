//! Response cache facade used by handlers and middleware.
//!
//! Cache failures never reach callers: a failed read is a miss, failed writes
//! and invalidations are skipped. Both are logged at `warn`.

use std::{sync::Arc, time::Duration};

use axum::http::Method;
use metrics::counter;
use tracing::{debug, warn};

use super::{
    config::CacheConfig,
    keys::CacheKey,
    store::{CacheStore, CachedResponse},
};

pub(crate) const METRIC_CACHE_HIT: &str = "storefront_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "storefront_cache_miss_total";
pub(crate) const METRIC_CACHE_STORE: &str = "storefront_cache_store_total";
pub(crate) const METRIC_CACHE_INVALIDATED: &str = "storefront_cache_invalidated_total";
pub(crate) const METRIC_CACHE_ERROR: &str = "storefront_cache_error_total";

#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn lookup<I, K, V>(
        &self,
        method: &Method,
        path: &str,
        params: I,
    ) -> Option<CachedResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.get(&CacheKey::compute(method, path, params)).await
    }

    pub async fn store<I, K, V>(
        &self,
        method: &Method,
        path: &str,
        params: I,
        value: CachedResponse,
        ttl: Duration,
    ) where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.set(&CacheKey::compute(method, path, params), value, ttl)
            .await;
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        if !self.config.enabled {
            return None;
        }

        let resource = key.resource().to_string();
        match self.store.get(key.as_str()).await {
            Ok(Some(hit)) => {
                counter!(METRIC_CACHE_HIT, "resource" => resource).increment(1);
                debug!(key = %key, outcome = "hit", "response cache lookup");
                Some(hit)
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "resource" => resource).increment(1);
                debug!(key = %key, outcome = "miss", "response cache lookup");
                None
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "get").increment(1);
                warn!(
                    target = "storefront::cache",
                    key = %key,
                    error = %err,
                    "cache read failed; treating as miss"
                );
                None
            }
        }
    }

    pub async fn set(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) {
        if !self.config.enabled {
            return;
        }

        match self.store.set(key.as_str(), value, ttl).await {
            Ok(()) => {
                counter!(METRIC_CACHE_STORE, "resource" => key.resource().to_string())
                    .increment(1);
                debug!(key = %key, ttl_secs = ttl.as_secs(), "response cached");
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "set").increment(1);
                warn!(
                    target = "storefront::cache",
                    key = %key,
                    error = %err,
                    "cache write failed; skipping"
                );
            }
        }
    }

    /// Remove every cached response whose key starts with `prefix`.
    ///
    /// Runs even while the cache is disabled so that re-enabling it never
    /// serves entries written before the toggle.
    pub async fn invalidate(&self, prefix: &str) -> usize {
        match self.store.delete_prefix(prefix).await {
            Ok(removed) => {
                counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
                debug!(prefix, removed, "cache prefix invalidated");
                removed
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "invalidate").increment(1);
                warn!(
                    target = "storefront::cache",
                    prefix,
                    error = %err,
                    "cache invalidation failed; skipping"
                );
                0
            }
        }
    }
}

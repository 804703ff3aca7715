//! Prefix-invalidated response cache.
//!
//! Responses are stored under a [`CacheKey`] derived from method, path and
//! sorted query parameters, each with its own TTL. Mutating routes clear
//! every key of their resource through a `"{resource}|"` prefix.
//!
//! ```toml
//! [cache]
//! enabled = true
//! list_ttl_seconds = 600
//! item_ttl_seconds = 300
//! lookup_ttl_seconds = 100000
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod service;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheKey, KEY_SEPARATOR};
pub use middleware::{
    CachePolicy, InvalidationPolicy, X_CACHE, cache_response, invalidate_on_success,
};
pub use service::ResponseCache;
pub use store::{CacheError, CacheStore, CachedResponse, MemoryCacheStore};

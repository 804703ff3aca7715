//! Response cache configuration.

use std::{num::NonZeroUsize, time::Duration};

const DEFAULT_LIST_TTL_SECS: u64 = 600;
const DEFAULT_ITEM_TTL_SECS: u64 = 300;
const DEFAULT_LOOKUP_TTL_SECS: u64 = 100_000;
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Resolved cache behavior, derived from `[cache]` settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup misses and nothing is stored.
    pub enabled: bool,
    /// TTL for paged product listings.
    pub list_ttl: Duration,
    /// TTL for single product responses.
    pub item_ttl: Duration,
    /// TTL for rarely changing lookups such as brands and types.
    pub lookup_ttl: Duration,
    /// Upper bound on stored responses before LRU eviction.
    pub max_entries: usize,
    /// Interval of the expired-entry sweeper; `None` leaves expiry fully lazy.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            list_ttl: Duration::from_secs(DEFAULT_LIST_TTL_SECS),
            item_ttl: Duration::from_secs(DEFAULT_ITEM_TTL_SECS),
            lookup_ttl: Duration::from_secs(DEFAULT_LOOKUP_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            list_ttl: settings.list_ttl,
            item_ttl: settings.item_ttl,
            lookup_ttl: settings.lookup_ttl,
            max_entries: settings.max_entries.get(),
            sweep_interval: settings.sweep_interval,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Store capacity, clamped to one when configured as zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

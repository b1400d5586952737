//! Memoization store for read-only endpoint responses
//!
//! Entries are keyed by `endpoint:args_hash`, where `args_hash` is the
//! SHA-256 digest of the canonical JSON arguments (positional order kept,
//! keywords sorted), so equal argument sets always share one entry.
//!
//! Each key owns a slot guarded by its own mutex. The first caller for a
//! key holds the slot while the upstream call runs; concurrent callers for
//! the same key block on it and then read the stored value, so at most one
//! upstream call per key is ever in flight. Failed calls are not stored;
//! the slot stays in place for callers already queued on it, one of which
//! retries the call, and is dropped once no caller holds it.
//!
//! Unbounded unless a TTL or a maximum entry count is configured.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::Result;
use crate::method::CallArgs;

/// Thread-safe single-flight response cache
pub struct ResponseCache {
    /// Slots keyed by `endpoint:args_hash`
    entries: DashMap<String, Arc<Slot>>,
    /// Cache statistics
    stats: CacheStats,
    /// Entry lifetime; `None` keeps entries forever
    ttl: Option<Duration>,
    /// Entry cap; `None` never evicts
    max_entries: Option<usize>,
}

#[derive(Default)]
struct Slot {
    state: Mutex<Option<CachedResponse>>,
}

/// A cached response
struct CachedResponse {
    /// The cached JSON value
    value: Value,
    /// When this entry was cached
    cached_at: Instant,
}

/// Cache statistics tracked atomically
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Total cache hits (entries served from cache)
    pub hits: AtomicU64,
    /// Total cache misses (upstream calls made)
    pub misses: AtomicU64,
    /// Total evictions (expired or over capacity)
    pub evictions: AtomicU64,
}

impl CacheStats {
    /// Get current cache hit count
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get current cache miss count
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get current eviction count
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Calculate hit rate as a fraction (0.0-1.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl ResponseCache {
    /// Create a cache. Both bounds are optional.
    ///
    /// A `max_entries` of zero still keeps the most recent entry.
    #[must_use]
    pub fn new(ttl: Option<Duration>, max_entries: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            stats: CacheStats::default(),
            ttl,
            max_entries,
        }
    }

    /// Unbounded cache that lives as long as its owner
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// Return the stored value for `key`, or run `fetch`, store its
    /// successful result and return it.
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` returns; errors are never cached.
    pub fn get_or_try_insert_with<F>(&self, key: &str, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        let slot = Arc::clone(
            self.entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Slot::default()))
                .value(),
        );

        let mut state = slot.state.lock();
        if let Some(entry) = state.as_ref() {
            if self.is_expired(entry) {
                *state = None;
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            } else {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.value.clone());
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        match fetch() {
            Ok(value) => {
                *state = Some(CachedResponse {
                    value: value.clone(),
                    cached_at: Instant::now(),
                });
                drop(state);
                self.enforce_capacity(key);
                Ok(value)
            }
            Err(e) => {
                drop(state);
                // Drop the slot only when the map and this call are its sole
                // holders; clones are taken under the same shard lock.
                self.entries.remove_if(key, |_, current| {
                    Arc::ptr_eq(current, &slot)
                        && Arc::strong_count(current) == 2
                        && current.state.try_lock().is_some_and(|s| s.is_none())
                });
                Err(e)
            }
        }
    }

    fn is_expired(&self, entry: &CachedResponse) -> bool {
        self.ttl
            .is_some_and(|ttl| Instant::now().duration_since(entry.cached_at) > ttl)
    }

    /// Evict the oldest stored entries until within `max_entries`.
    /// Slots with a call in flight are never chosen.
    fn enforce_capacity(&self, keep: &str) {
        let Some(max) = self.max_entries else {
            return;
        };

        while self.entries.len() > max {
            let oldest = self
                .entries
                .iter()
                .filter(|entry| entry.key() != keep)
                .filter_map(|entry| {
                    let state = entry.value().state.try_lock()?;
                    state.as_ref().map(|c| (entry.key().clone(), c.cached_at))
                })
                .min_by_key(|(_, cached_at)| *cached_at)
                .map(|(key, _)| key);

            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            evictions: self.stats.evictions(),
            size: self.entries.len(),
            hit_rate: self.stats.hit_rate(),
        }
    }

    /// Build a cache key from endpoint name and call arguments
    ///
    /// The key format is `{endpoint}:{args_hash}` where `args_hash`
    /// is the SHA-256 hex digest of the canonical JSON arguments.
    #[must_use]
    pub fn build_key(endpoint: &str, args: &CallArgs) -> String {
        let mut hasher = Sha256::new();
        hasher.update(args.canonical().as_bytes());
        let digest = hasher.finalize();
        format!("{endpoint}:{}", hex::encode(&digest[..]))
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CacheStatsSnapshot {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Total evictions
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
    /// Hit rate (0.0-1.0)
    pub hit_rate: f64,
}

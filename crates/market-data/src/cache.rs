//! Generic TTL cache for fetched payloads.
//!
//! A key -> value store with per-entry expiry. Stale entries are evicted
//! lazily on lookup; a periodic [`sweep`](TtlCache::sweep) (driven by the
//! client's maintenance task) bounds memory growth from keys that are never
//! looked up again. The cache is in-memory only and resets on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

/// A stored value with its expiry bookkeeping.
#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// An entry is valid iff less than its TTL has elapsed since storage.
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Thread-safe key -> value store with per-entry TTL.
pub struct TtlCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the entries mutex, recovering from poison if necessary.
    ///
    /// The worst case after recovery is a stale or missing cache entry,
    /// which the caller already has to handle.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Return the cached value for `key` if present and unexpired.
    ///
    /// An expired entry is deleted as a side effect of the lookup.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.lock_entries();

        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                debug!("Cache: evicted stale entry '{}'", key);
                None
            }
            None => None,
        }
    }

    /// Store or overwrite an entry with a fresh timestamp.
    pub fn set(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let mut entries = self.lock_entries();
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Evict every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("Cache: sweep evicted {} expired entries", evicted);
        }
        evicted
    }

    /// Number of entries currently stored, expired or not.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Stale-aware query cache.
//!
//! The synchronizer never fetches data itself; it only marks cached query
//! results stale so the consuming layer refetches. `QueryCache` is that
//! consuming layer's storage: an LRU-bounded map from query key to the last
//! fetched result plus a staleness flag.

use crate::types::QueryKey;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Default number of cached query results.
const DEFAULT_QUERY_CAPACITY: usize = 64;

/// The single outbound capability the synchronizer needs from the cache
/// layer: mark a query key stale so its next read refetches.
pub trait Invalidate: Send + Sync {
    fn invalidate(&self, key: &QueryKey);
}

/// A cached query result.
struct CachedQuery {
    value: serde_json::Value,
    stale: bool,
    /// How many times this entry has been invalidated (observability).
    invalidations: u64,
}

/// LRU-bounded cache of query results with staleness marking.
pub struct QueryCache {
    entries: Mutex<LruCache<QueryKey, CachedQuery>>,
}

impl QueryCache {
    /// Create a cache holding up to `capacity` query results.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Store a freshly fetched result for `key`, clearing its staleness.
    ///
    /// The invalidation counter survives refreshes of an existing entry.
    pub fn put(&self, key: QueryKey, value: serde_json::Value) {
        let mut entries = self.entries.lock();
        let invalidations = entries.peek(&key).map(|e| e.invalidations).unwrap_or(0);
        entries.put(
            key,
            CachedQuery {
                value,
                stale: false,
                invalidations,
            },
        );
    }

    /// Look up a cached result. Returns the value and whether it is stale.
    pub fn get(&self, key: &QueryKey) -> Option<(serde_json::Value, bool)> {
        let mut entries = self.entries.lock();
        entries.get(key).map(|e| (e.value.clone(), e.stale))
    }

    /// Whether `key` needs a refetch. Missing entries count as stale:
    /// nothing fresh is cached for them.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        let entries = self.entries.lock();
        entries.peek(key).map(|e| e.stale).unwrap_or(true)
    }

    /// Mark `key` stale. No-op for keys with no cached entry (the next
    /// fetch will populate them fresh anyway).
    pub fn mark_stale(&self, key: &QueryKey) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.peek_mut(key) {
            entry.stale = true;
            entry.invalidations += 1;
        }
    }

    /// Total invalidations recorded for `key`.
    pub fn invalidation_count(&self, key: &QueryKey) -> u64 {
        let entries = self.entries.lock();
        entries.peek(key).map(|e| e.invalidations).unwrap_or(0)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_CAPACITY)
    }
}

impl Invalidate for QueryCache {
    fn invalidate(&self, key: &QueryKey) {
        self.mark_stale(key);
    }
}

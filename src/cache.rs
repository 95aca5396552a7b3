//! Resolution cache
//!
//! Resolved trees are memoized per (format, requested version). Format data
//! never changes while the process runs, so entries are never invalidated.
//! Computation happens outside the lock; two threads racing on the same key
//! both compute and the last insert wins, which is harmless because the
//! result is deterministic.

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    format: String,
    version: String,
}

/// Counters reported by [`ResolutionCache::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct ResolutionCache {
    enabled: bool,
    entries: RwLock<HashMap<CacheKey, Arc<Value>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResolutionCache {
    /// A disabled cache misses every lookup and stores nothing.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, format: &str, version: &str) -> Option<Arc<Value>> {
        let found = if self.enabled {
            let key = CacheKey {
                format: format.to_string(),
                version: version.to_string(),
            };
            self.entries.read().get(&key).cloned()
        } else {
            None
        };

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, format: &str, version: &str, tree: Arc<Value>) {
        if !self.enabled {
            return;
        }
        let key = CacheKey {
            format: format.to_string(),
            version: version.to_string(),
        };
        self.entries.write().insert(key, tree);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

//! Source-keyed patch cache.
//!
//! # Invariants
//!
//! 1. Keys are source *content*: two equal strings share one entry.
//! 2. An entry is never modified after insertion; it is returned as-is even
//!    when the element it was compiled from has since changed.
//! 3. With a bound, inserting past capacity evicts the least recently used
//!    entry. `peek` and `contains` do not refresh recency.

use std::num::NonZeroUsize;

use ahash::RandomState;
use lru::LruCache;

use crate::patch::Patch;

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Successful compiles inserted into the cache.
    pub compiles: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU map from source markup to its compiled [`Patch`].
#[derive(Debug)]
pub struct PatchCache {
    entries: LruCache<String, Patch, RandomState>,
    stats: CacheStats,
}

impl PatchCache {
    /// Create a cache holding at most `capacity` patches; zero is unbounded.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::with_hasher(cap, RandomState::new()),
            None => LruCache::unbounded_with_hasher(RandomState::new()),
        };
        Self {
            entries,
            stats: CacheStats::default(),
        }
    }

    /// Fetch and mark as recently used, counting a hit or miss.
    pub fn lookup(&mut self, source: &str) -> Option<Patch> {
        match self.entries.get(source) {
            Some(patch) => {
                self.stats.hits += 1;
                tracing::trace!(bytes = source.len(), "patch cache hit");
                Some(patch.clone())
            }
            None => {
                self.stats.misses += 1;
                tracing::trace!(bytes = source.len(), "patch cache miss");
                None
            }
        }
    }

    /// Fetch without touching recency or counters.
    #[must_use]
    pub fn peek(&self, source: &str) -> Option<Patch> {
        self.entries.peek(source).cloned()
    }

    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains(source)
    }

    /// Store a freshly compiled patch.
    pub fn insert(&mut self, source: String, patch: Patch) {
        self.stats.compiles += 1;
        if let Some((evicted, _)) = self.entries.push(source, patch)
            && !self.entries.contains(&evicted)
        {
            self.stats.evictions += 1;
            tracing::debug!(
                bytes = evicted.len(),
                cached = self.entries.len(),
                "evicted patch"
            );
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bound, or `None` when unbounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        let cap = self.entries.cap().get();
        (cap != usize::MAX).then_some(cap)
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

//! Thin wrapper over [`lru::LruCache`] enforcing the embedding cache's
//! ordering invariant: every `get` moves its entry to the most-recent
//! position, and overflow evicts exactly the least-recent entry.

use std::num::NonZeroUsize;

use lru::LruCache;

/// A fixed-capacity, most-recently-used-ordered map of content hash to
/// embedding vector.
pub struct EmbeddingLru {
    inner: LruCache<String, Vec<f32>>,
}

impl EmbeddingLru {
    /// Creates a cache with room for `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Looks up `hash`, promoting it to most-recent on hit.
    pub fn get(&mut self, hash: &str) -> Option<Vec<f32>> {
        self.inner.get(hash).cloned()
    }

    /// Inserts or updates `hash`, evicting the least-recent entry if the
    /// cache is at capacity. Returns the evicted `(hash, vector)` pair, if
    /// any.
    pub fn put(&mut self, hash: String, vector: Vec<f32>) -> Option<(String, Vec<f32>)> {
        self.inner.put(hash, vector)
    }

    /// The id of the current most-recent entry, if any.
    #[must_use]
    pub fn most_recent(&self) -> Option<&String> {
        self.inner.iter().next().map(|(key, _)| key)
    }

    /// The id of the current least-recent entry, if any.
    #[must_use]
    pub fn least_recent(&self) -> Option<&String> {
        self.inner.iter().last().map(|(key, _)| key)
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Whether `hash` is present, without affecting recency order.
    #[must_use]
    pub fn contains(&self, hash: &str) -> bool {
        self.inner.contains(hash)
    }
}

//! Component C — Embedding Cache.
//!
//! Two-tier cache keyed by `exact(content)`: a durable persistent tier
//! (implemented by a storage backend) and a volatile in-memory LRU tier.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::embedder::Embedder;
use super::lru::EmbeddingLru;
use crate::dedup::hash::exact_hash;
use crate::error::Result;

/// A durably stored embedding plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// The model that produced it.
    pub model_name: String,
    /// When it was first computed.
    pub created_at: DateTime<Utc>,
    /// When it was last read.
    pub accessed_at: DateTime<Utc>,
}

/// The durable tier backing the embedding cache, implemented by a storage
/// backend crate (e.g. an embedded key-value store).
#[async_trait]
pub trait EmbeddingPersistentStore: Send + Sync {
    /// Fetches the record for `hash`, if present.
    async fn get(&self, hash: &str) -> Result<Option<EmbeddingRecord>>;

    /// Stores (or overwrites) the record for `hash`.
    async fn put(&self, hash: &str, record: EmbeddingRecord) -> Result<()>;

    /// Updates only `accessed_at` for an existing record.
    async fn touch(&self, hash: &str, accessed_at: DateTime<Utc>) -> Result<()>;

    /// Deletes records whose `accessed_at` is strictly older than
    /// `cutoff`, returning the number removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// The two-tier embedding cache.
pub struct EmbeddingCache<S: EmbeddingPersistentStore, E: Embedder> {
    persistent: Arc<S>,
    embedder: Arc<E>,
    lru: Mutex<EmbeddingLru>,
}

impl<S: EmbeddingPersistentStore, E: Embedder> EmbeddingCache<S, E> {
    /// Builds a cache over `persistent`, computing misses via `embedder`,
    /// with a volatile tier of `lru_capacity` entries.
    pub fn new(persistent: Arc<S>, embedder: Arc<E>, lru_capacity: usize) -> Self {
        Self {
            persistent,
            embedder,
            lru: Mutex::new(EmbeddingLru::new(lru_capacity)),
        }
    }

    /// Returns the embedding for `content`, computing and persisting it on
    /// a full miss.
    ///
    /// Ordering invariant: after this call returns, `hash(content)` is the
    /// LRU's most-recent entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::EmbedderUnavailable`] or
    /// [`crate::error::Error::CircuitOpen`] if a miss cannot be computed.
    pub async fn get(&self, content: &str, now: DateTime<Utc>) -> Result<Vec<f32>> {
        let hash = exact_hash(content);

        if let Some(vector) = self.lru.lock().get(&hash) {
            tracing::debug!(hash = %hash, "embedding cache lru hit");
            return Ok(vector);
        }

        if let Some(record) = self.persistent.get(&hash).await? {
            tracing::debug!(hash = %hash, "embedding cache durable hit");
            self.persistent.touch(&hash, now).await?;
            self.lru.lock().put(hash, record.vector.clone());
            return Ok(record.vector);
        }

        tracing::debug!(hash = %hash, "embedding cache miss, computing");
        let vector = self.embedder.encode(content).await?;
        let record = EmbeddingRecord {
            vector: vector.clone(),
            model_name: self.embedder.model_name().to_string(),
            created_at: now,
            accessed_at: now,
        };
        self.persistent.put(&hash, record).await?;
        self.lru.lock().put(hash, vector.clone());
        Ok(vector)
    }

    /// Computes embeddings for every content whose hash is not already
    /// persisted, in a single embedder call, and returns a map of newly
    /// computed `hash -> vector` entries only.
    pub async fn batch_compute(
        &self,
        contents: &[String],
        now: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<f32>>> {
        let mut hashes = Vec::with_capacity(contents.len());
        let mut missing_contents = Vec::new();
        let mut missing_hashes = Vec::new();

        for content in contents {
            let hash = exact_hash(content);
            hashes.push(hash.clone());
            if self.persistent.get(&hash).await?.is_none() {
                missing_contents.push(content.clone());
                missing_hashes.push(hash);
            }
        }

        if missing_contents.is_empty() {
            return Ok(HashMap::new());
        }

        let vectors = self.embedder.encode_batch(&missing_contents).await?;
        let mut newly_computed = HashMap::with_capacity(vectors.len());
        for (hash, vector) in missing_hashes.into_iter().zip(vectors) {
            let record = EmbeddingRecord {
                vector: vector.clone(),
                model_name: self.embedder.model_name().to_string(),
                created_at: now,
                accessed_at: now,
            };
            self.persistent.put(&hash, record).await?;
            self.lru.lock().put(hash.clone(), vector.clone());
            newly_computed.insert(hash, vector);
        }
        Ok(newly_computed)
    }

    /// Removes durable entries whose `accessed_at` is older than
    /// `now - days`.
    pub async fn cleanup(&self, days: i64, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - chrono::Duration::days(days);
        let removed = self.persistent.delete_older_than(cutoff).await?;
        tracing::info!(removed, days, "embedding cache cleanup");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct InMemoryPersistentStore {
        records: StdMutex<HashMap<String, EmbeddingRecord>>,
    }

    #[async_trait]
    impl EmbeddingPersistentStore for InMemoryPersistentStore {
        async fn get(&self, hash: &str) -> Result<Option<EmbeddingRecord>> {
            Ok(self.records.lock().unwrap().get(hash).cloned())
        }

        async fn put(&self, hash: &str, record: EmbeddingRecord) -> Result<()> {
            self.records.lock().unwrap().insert(hash.to_string(), record);
            Ok(())
        }

        async fn touch(&self, hash: &str, accessed_at: DateTime<Utc>) -> Result<()> {
            if let Some(record) = self.records.lock().unwrap().get_mut(hash) {
                record.accessed_at = accessed_at;
            }
            Ok(())
        }

        async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|_, record| record.accessed_at >= cutoff);
            Ok(before - records.len())
        }
    }

    struct CountingEmbedder {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn miss_then_hit_does_not_recompute() {
        let persistent = Arc::new(InMemoryPersistentStore::default());
        let embedder = Arc::new(CountingEmbedder {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let cache = EmbeddingCache::new(persistent, embedder.clone(), 1000);
        let now = Utc::now();

        cache.get("hello", now).await.unwrap();
        cache.get("hello", now).await.unwrap();

        assert_eq!(embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_compute_skips_already_persisted() {
        let persistent = Arc::new(InMemoryPersistentStore::default());
        let embedder = Arc::new(CountingEmbedder {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let cache = EmbeddingCache::new(persistent, embedder, 1000);
        let now = Utc::now();

        cache.get("already cached", now).await.unwrap();
        let result = cache
            .batch_compute(
                &["already cached".to_string(), "new one".to_string()],
                now,
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains_key(&exact_hash("new one")));
    }

    #[tokio::test]
    async fn cleanup_removes_stale_entries_only() {
        let persistent = Arc::new(InMemoryPersistentStore::default());
        let embedder = Arc::new(CountingEmbedder {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let cache = EmbeddingCache::new(persistent, embedder, 1000);
        let old = Utc::now() - chrono::Duration::days(40);
        let recent = Utc::now();

        cache.get("old content", old).await.unwrap();
        cache.get("recent content", recent).await.unwrap();

        let removed = cache.cleanup(30, recent).await.unwrap();
        assert_eq!(removed, 1);
    }
}

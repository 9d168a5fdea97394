//! Per-query result-id cache with TTL invalidation.
//!
//! Stores only the ordered list of result ids, not full records, so a
//! cache hit must still be hydrated through the Memory Store by the
//! caller.

use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::config::SearchCacheConfig;

/// A cached search result set.
#[derive(Debug, Clone)]
pub struct SearchCacheEntry {
    /// The original query text.
    pub query: String,
    /// Ordered result ids, most relevant first.
    pub result_ids: Vec<String>,
    /// Number of times this entry has been served.
    pub hits: u64,
    /// When it was last served.
    pub last_hit: DateTime<Utc>,
    /// When it was stored.
    pub created_at: DateTime<Utc>,
    /// When it expires.
    pub expires_at: DateTime<Utc>,
}

/// Computes the cache key for `(query, project_id)`, with an absent
/// project id treated as `"global"`.
#[must_use]
pub fn cache_key(query: &str, project_id: Option<&str>) -> String {
    let scope = project_id.unwrap_or("global");
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"|");
    hasher.update(scope.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// The per-query search result cache.
pub struct SearchCache {
    config: SearchCacheConfig,
    entries: Mutex<LruCache<String, SearchCacheEntry>>,
}

impl SearchCache {
    /// Builds a cache with the given sizing and TTL configuration.
    #[must_use]
    pub fn new(config: SearchCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.lru_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Looks up the cache entry for `(query, project_id)`. An expired
    /// entry is removed and treated as a miss. On hit, increments `hits`
    /// and updates `last_hit`.
    pub fn get(&self, query: &str, project_id: Option<&str>, now: DateTime<Utc>) -> Option<SearchCacheEntry> {
        let key = cache_key(query, project_id);
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&key)?;
        if entry.expires_at <= now {
            entries.pop(&key);
            return None;
        }
        entry.hits += 1;
        entry.last_hit = now;
        Some(entry.clone())
    }

    /// Stores `result_ids` for `(query, project_id)`, only when the
    /// result count falls within the configured bounds.
    pub fn put(
        &self,
        query: &str,
        project_id: Option<&str>,
        result_ids: Vec<String>,
        now: DateTime<Utc>,
    ) {
        if result_ids.len() < self.config.min_results || result_ids.len() > self.config.max_results {
            return;
        }
        let key = cache_key(query, project_id);
        let entry = SearchCacheEntry {
            query: query.to_string(),
            result_ids,
            hits: 0,
            last_hit: now,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(self.config.ttl_seconds),
        };
        self.entries.lock().put(key, entry);
    }

    /// Deletes the exact-key entry for `(query, project_id)`.
    pub fn invalidate(&self, query: &str, project_id: Option<&str>) {
        let key = cache_key(query, project_id);
        self.entries.lock().pop(&key);
    }

    /// Removes all expired entries, returning the number removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// The minimum hydrated-result count below which a hit is treated as
    /// a miss and must be recomputed.
    #[must_use]
    pub fn min_viable_hydrated_count(&self) -> usize {
        self.config.min_results
    }

    /// A snapshot of every live (not-yet-swept) entry, keyed by cache key,
    /// for checkpointing to the `search_cache` table.
    #[must_use]
    pub fn all_entries(&self) -> Vec<(String, SearchCacheEntry)> {
        self.entries
            .lock()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Rebuilds the cache from previously-checkpointed rows, e.g. on
    /// startup from the `search_cache` table. Entries already expired by
    /// `now` are skipped.
    pub fn load_entries(&self, rows: Vec<(String, SearchCacheEntry)>, now: DateTime<Utc>) {
        let mut entries = self.entries.lock();
        for (key, entry) in rows {
            if entry.expires_at > now {
                entries.put(key, entry);
            }
        }
    }
}

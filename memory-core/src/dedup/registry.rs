//! In-process registry mapping memory ids to their content hashes, plus
//! the dedup events log used for statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::hash::{self, ContentHash};
use crate::constants::defaults;

/// The level at which a duplicate was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupLevel {
    /// Byte-identical content.
    Exact,
    /// Case/whitespace/punctuation-equal content.
    Normalized,
    /// Embedding-bucket-equal content.
    Semantic,
}

/// Outcome of checking a piece of content against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    /// A duplicate was found at the given level, of the given id, with a
    /// heuristic confidence.
    Duplicate {
        /// The existing memory id this content duplicates.
        existing_id: String,
        /// The level at which the match occurred.
        level: DedupLevel,
        /// Heuristic confidence in the match.
        confidence: f64,
    },
    /// No duplicate was found at any level.
    Unique,
}

/// A single line in the dedup events log, recorded whenever a
/// [`DedupOutcome::Duplicate`] is produced.
#[derive(Debug, Clone)]
pub struct DedupEvent {
    /// The memory id the new content duplicated.
    pub existing_id: String,
    /// The level at which it was matched.
    pub level: DedupLevel,
    /// Heuristic confidence.
    pub confidence: f64,
    /// When the match was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Exact/normalized/semantic duplicate registry.
///
/// Deletion or archival of a memory does not deregister its hashes;
/// staleness is tolerated per the design (a stale registry entry only
/// ever causes a duplicate to be (correctly) flagged against content that
/// once existed).
#[derive(Debug, Default)]
pub struct ContentDedup {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<String, ContentHash>,
    exact_index: HashMap<String, String>,
    normalized_index: HashMap<String, String>,
    semantic_index: HashMap<String, String>,
    events: Vec<DedupEvent>,
}

impl ContentDedup {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `content` (and optionally its embedding) against the
    /// registry, in priority order: exact, then normalized, then
    /// semantic. Recording a match appends a [`DedupEvent`].
    pub fn check(&self, content: &str, embedding: Option<&[f32]>, now: DateTime<Utc>) -> DedupOutcome {
        let exact = hash::exact_hash(content);
        let normalized = hash::normalized_hash(content);

        let mut inner = self.inner.write();

        if let Some(existing_id) = inner.exact_index.get(&exact).cloned() {
            let outcome = DedupOutcome::Duplicate {
                existing_id: existing_id.clone(),
                level: DedupLevel::Exact,
                confidence: 1.0,
            };
            inner.events.push(DedupEvent {
                existing_id,
                level: DedupLevel::Exact,
                confidence: 1.0,
                recorded_at: now,
            });
            return outcome;
        }

        if let Some(existing_id) = inner.normalized_index.get(&normalized).cloned() {
            let outcome = DedupOutcome::Duplicate {
                existing_id: existing_id.clone(),
                level: DedupLevel::Normalized,
                confidence: 0.9,
            };
            inner.events.push(DedupEvent {
                existing_id,
                level: DedupLevel::Normalized,
                confidence: 0.9,
                recorded_at: now,
            });
            return outcome;
        }

        if let Some(embedding) = embedding {
            let semantic = hash::semantic_hash(embedding, defaults::SEMANTIC_HASH_BINS);
            if let Some(existing_id) = inner.semantic_index.get(&semantic).cloned() {
                let outcome = DedupOutcome::Duplicate {
                    existing_id: existing_id.clone(),
                    level: DedupLevel::Semantic,
                    confidence: 0.7,
                };
                inner.events.push(DedupEvent {
                    existing_id,
                    level: DedupLevel::Semantic,
                    confidence: 0.7,
                    recorded_at: now,
                });
                return outcome;
            }
        }

        DedupOutcome::Unique
    }

    /// Registers `id`'s hashes so future content can be checked against
    /// it. Idempotent for the same id.
    pub fn register(&self, id: &str, content: &str, embedding: Option<&[f32]>) {
        let exact = hash::exact_hash(content);
        let normalized = hash::normalized_hash(content);
        let semantic =
            embedding.map(|vector| hash::semantic_hash(vector, defaults::SEMANTIC_HASH_BINS));

        let mut inner = self.inner.write();
        inner.exact_index.insert(exact.clone(), id.to_string());
        inner
            .normalized_index
            .insert(normalized.clone(), id.to_string());
        if let Some(semantic) = &semantic {
            inner.semantic_index.insert(semantic.clone(), id.to_string());
        }
        inner.by_id.insert(
            id.to_string(),
            ContentHash {
                exact,
                normalized,
                semantic,
            },
        );
    }

    /// Returns the recorded hashes for `id`, if registered.
    #[must_use]
    pub fn hashes_for(&self, id: &str) -> Option<ContentHash> {
        self.inner.read().by_id.get(id).cloned()
    }

    /// A snapshot of all recorded dedup events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<DedupEvent> {
        self.inner.read().events.clone()
    }

    /// A snapshot of every registered `(id, ContentHash)` pair, for
    /// checkpointing to the `content_hashes` table.
    #[must_use]
    pub fn all_hashes(&self) -> Vec<(String, ContentHash)> {
        self.inner
            .read()
            .by_id
            .iter()
            .map(|(id, hash)| (id.clone(), hash.clone()))
            .collect()
    }

    /// Rebuilds the registry's indexes from previously-checkpointed
    /// `(id, ContentHash)` rows, e.g. on startup from the `content_hashes`
    /// table. Does not touch the events log.
    pub fn load_hashes(&self, rows: Vec<(String, ContentHash)>) {
        let mut inner = self.inner.write();
        for (id, hash) in rows {
            inner.exact_index.insert(hash.exact.clone(), id.clone());
            inner.normalized_index.insert(hash.normalized.clone(), id.clone());
            if let Some(semantic) = &hash.semantic {
                inner.semantic_index.insert(semantic.clone(), id.clone());
            }
            inner.by_id.insert(id, hash);
        }
    }

    /// Appends previously-checkpointed dedup events, e.g. on startup from
    /// the `dedup_events` table.
    pub fn load_events(&self, events: Vec<DedupEvent>) {
        self.inner.write().events.extend(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_exact_before_normalized() {
        let registry = ContentDedup::new();
        registry.register("m1", "Hello, World!", None);
        let now = Utc::now();

        let exact = registry.check("Hello, World!", None, now);
        assert!(matches!(
            exact,
            DedupOutcome::Duplicate { level: DedupLevel::Exact, confidence, .. } if (confidence - 1.0).abs() < 1e-9
        ));
    }

    #[test]
    fn normalized_match_when_not_byte_identical() {
        let registry = ContentDedup::new();
        registry.register("m1", "Hello, World!", None);
        let now = Utc::now();

        let outcome = registry.check("hello world", None, now);
        assert!(matches!(
            outcome,
            DedupOutcome::Duplicate { level: DedupLevel::Normalized, .. }
        ));
    }

    #[test]
    fn semantic_match_requires_embedding() {
        let registry = ContentDedup::new();
        let embedding = vec![0.1_f32, 0.5, 0.9];
        registry.register("m1", "some unique sentence", Some(&embedding));
        let now = Utc::now();

        let near_duplicate_embedding = vec![0.11_f32, 0.49, 0.90];
        let outcome = registry.check(
            "a completely different sentence",
            Some(&near_duplicate_embedding),
            now,
        );
        assert!(matches!(
            outcome,
            DedupOutcome::Duplicate { level: DedupLevel::Semantic, .. }
        ));
    }

    #[test]
    fn unique_content_is_not_flagged() {
        let registry = ContentDedup::new();
        registry.register("m1", "first thing", None);
        let outcome = registry.check("second thing", None, Utc::now());
        assert_eq!(outcome, DedupOutcome::Unique);
    }

    #[test]
    fn events_log_grows_on_each_match() {
        let registry = ContentDedup::new();
        registry.register("m1", "repeat me", None);
        let now = Utc::now();
        registry.check("repeat me", None, now);
        registry.check("repeat me", None, now);
        assert_eq!(registry.events().len(), 2);
    }
}

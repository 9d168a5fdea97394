//! `[SUPPLEMENT]` Entity extraction.
//!
//! Heuristic named-entity spotting over memory content, populated by the
//! Session Consolidator (component J) and consumed only as an optional
//! importance-scoring signal and `get_stats` metadata. Entities never
//! gate, veto, or rank search results.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The coarse kind of thing an extracted entity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A person's name.
    Person,
    /// A project or codebase name.
    Project,
    /// A tool, library, or service name.
    Tool,
    /// An abstract concept or technique.
    Concept,
    /// Anything not confidently classified above.
    Other,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntityKind::Person => "person",
            EntityKind::Project => "project",
            EntityKind::Tool => "tool",
            EntityKind::Concept => "concept",
            EntityKind::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// One entity mention found in a memory's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// The memory this mention was found in.
    pub memory_id: String,
    /// The entity's surface text.
    pub entity_text: String,
    /// Its coarse kind.
    pub entity_kind: EntityKind,
    /// Heuristic confidence in `[0, 1]`.
    pub confidence: f64,
}

static KNOWN_TOOLS: &[&str] = &[
    "rust", "python", "docker", "postgres", "redis", "kubernetes", "git", "sqlite", "cargo",
    "tokio", "react", "typescript",
];

static CAPITALIZED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-zA-Z0-9]{2,}\b").expect("static pattern is valid"));

/// Extracts a small set of candidate entities from `content` using
/// capitalization and a short list of known tool names as surface
/// signals. Deterministic and dependency-free: no LLM call is involved.
#[must_use]
pub fn extract(memory_id: &str, content: &str) -> Vec<ExtractedEntity> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    let lowered = content.to_lowercase();
    for tool in KNOWN_TOOLS {
        if lowered.contains(tool) && seen.insert((*tool).to_string()) {
            out.push(ExtractedEntity {
                memory_id: memory_id.to_string(),
                entity_text: (*tool).to_string(),
                entity_kind: EntityKind::Tool,
                confidence: 0.7,
            });
        }
    }

    for capture in CAPITALIZED_WORD.find_iter(content) {
        let word = capture.as_str();
        let key = word.to_lowercase();
        if lowered_is_sentence_start(content, capture.start()) {
            continue;
        }
        if seen.insert(key) {
            out.push(ExtractedEntity {
                memory_id: memory_id.to_string(),
                entity_text: word.to_string(),
                entity_kind: EntityKind::Other,
                confidence: 0.4,
            });
        }
    }

    out
}

/// Stores extracted entities per memory, backing an `entities` table
/// (`(memory_id, entity_text, entity_kind, confidence)`) consulted only
/// as `get_stats` metadata and an importance-scoring signal — never for
/// search ranking or GC eligibility.
#[derive(Default)]
pub struct EntityStore {
    by_memory: RwLock<HashMap<String, Vec<ExtractedEntity>>>,
}

impl EntityStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entities` for one memory, replacing any prior extraction.
    pub fn record(&self, memory_id: &str, entities: Vec<ExtractedEntity>) {
        self.by_memory.write().insert(memory_id.to_string(), entities);
    }

    /// The tracked entities for `memory_id`.
    #[must_use]
    pub fn entities_for(&self, memory_id: &str) -> Vec<ExtractedEntity> {
        self.by_memory.read().get(memory_id).cloned().unwrap_or_default()
    }

    /// A snapshot of every tracked `(memory_id, entity)` pair, for
    /// checkpointing to the `entities` table.
    #[must_use]
    pub fn all_entities(&self) -> Vec<ExtractedEntity> {
        self.by_memory.read().values().flat_map(|v| v.iter().cloned()).collect()
    }

    /// Counts of every distinct entity text across all tracked memories.
    #[must_use]
    pub fn entity_counts(&self) -> HashMap<String, u64> {
        let mut counts = HashMap::new();
        for entities in self.by_memory.read().values() {
            for entity in entities {
                *counts.entry(entity.entity_text.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Rebuilds the store from previously-checkpointed rows, e.g. on
    /// startup from the `entities` table.
    pub fn load_entities(&self, rows: Vec<ExtractedEntity>) {
        let mut by_memory = self.by_memory.write();
        for entity in rows {
            by_memory.entry(entity.memory_id.clone()).or_default().push(entity);
        }
    }
}

/// Whether the capitalized word at `start` opens a sentence (preceded
/// only by whitespace, or nothing) — such words are too likely to be
/// ordinary sentence-initial capitalization to count as entities.
fn lowered_is_sentence_start(content: &str, start: usize) -> bool {
    content[..start]
        .trim_end()
        .chars()
        .next_back()
        .is_none_or(|c| matches!(c, '.' | '!' | '?'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_tool_names() {
        let entities = extract("m1", "we migrated the cache from redis to postgres last week");
        let texts: Vec<&str> = entities.iter().map(|e| e.entity_text.as_str()).collect();
        assert!(texts.contains(&"redis"));
        assert!(texts.contains(&"postgres"));
    }

    #[test]
    fn skips_sentence_initial_capitalization() {
        let entities = extract("m1", "Fixed the bug. It was in the parser.");
        assert!(entities.is_empty());
    }

    #[test]
    fn finds_mid_sentence_proper_noun() {
        let entities = extract("m1", "we paired with Alice on the migration");
        assert!(entities.iter().any(|e| e.entity_text == "Alice"));
    }

    #[test]
    fn deduplicates_repeated_mentions() {
        let entities = extract("m1", "docker and docker compose and docker swarm");
        assert_eq!(entities.iter().filter(|e| e.entity_text == "docker").count(), 1);
    }

    #[test]
    fn store_tracks_entities_per_memory_and_counts_across_memories() {
        let store = EntityStore::new();
        store.record("m1", extract("m1", "we moved from redis to postgres"));
        store.record("m2", extract("m2", "still running postgres in prod"));

        assert_eq!(store.entities_for("m1").len(), 2);
        assert_eq!(store.entity_counts().get("postgres"), Some(&2));
        assert_eq!(store.all_entities().len(), 4);
    }
}

//! Component G — Reference Counter.
//!
//! Tracks, per memory, how many live references of each kind point at it,
//! so the lifecycle engine can veto archival of a still-referenced
//! memory.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::graph::RelationshipEdge;

/// The kind of thing holding a reference to a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    /// A relationship graph edge targets this memory.
    Relationship,
    /// A session chunk references this memory.
    Chunk,
    /// A decision record references this memory.
    Decision,
    /// A synthesis/summary references this memory.
    Synthesis,
}

impl std::fmt::Display for RefType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RefType::Relationship => "relationship",
            RefType::Chunk => "chunk",
            RefType::Decision => "decision",
            RefType::Synthesis => "synthesis",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for RefType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "relationship" => Ok(RefType::Relationship),
            "chunk" => Ok(RefType::Chunk),
            "decision" => Ok(RefType::Decision),
            "synthesis" => Ok(RefType::Synthesis),
            other => Err(format!("unknown ref type {other:?}")),
        }
    }
}

/// Per-memory reference counts, keyed by [`RefType`].
#[derive(Debug, Default)]
pub struct ReferenceCounter {
    counts: RwLock<HashMap<String, HashMap<RefType, u64>>>,
}

impl ReferenceCounter {
    /// An empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments `memory_id`'s count for `ref_type` by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRefType`] if `ref_type` cannot be parsed.
    pub fn increment(&self, memory_id: &str, ref_type: &str) -> Result<()> {
        let ref_type: RefType = ref_type.parse().map_err(Error::InvalidRefType)?;
        let mut counts = self.counts.write();
        *counts
            .entry(memory_id.to_string())
            .or_default()
            .entry(ref_type)
            .or_insert(0) += 1;
        Ok(())
    }

    /// Decrements `memory_id`'s count for `ref_type` by one, clamped at
    /// zero (never goes negative).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRefType`] if `ref_type` cannot be parsed.
    pub fn decrement(&self, memory_id: &str, ref_type: &str) -> Result<()> {
        let ref_type: RefType = ref_type.parse().map_err(Error::InvalidRefType)?;
        let mut counts = self.counts.write();
        if let Some(entry) = counts.get_mut(memory_id).and_then(|m| m.get_mut(&ref_type)) {
            *entry = entry.saturating_sub(1);
        }
        Ok(())
    }

    /// The total reference count across all ref types for `memory_id`.
    #[must_use]
    pub fn total(&self, memory_id: &str) -> u64 {
        self.counts
            .read()
            .get(memory_id)
            .map(|by_type| by_type.values().sum())
            .unwrap_or(0)
    }

    /// Whether `memory_id` has any live reference, used as an archival
    /// veto.
    #[must_use]
    pub fn is_protected(&self, memory_id: &str) -> bool {
        self.total(memory_id) > 0
    }

    /// Recomputes every memory's `relationship` count from scratch based
    /// on the current edge list. Other ref types are left untouched.
    pub fn bulk_update_from_relationships(&self, edges: &[RelationshipEdge]) {
        let mut relationship_counts: HashMap<String, u64> = HashMap::new();
        for edge in edges {
            *relationship_counts.entry(edge.to_id.clone()).or_insert(0) += 1;
        }

        let mut counts = self.counts.write();
        let all_ids: Vec<String> = counts.keys().cloned().chain(relationship_counts.keys().cloned()).collect();
        for id in all_ids {
            let new_count = relationship_counts.get(&id).copied().unwrap_or(0);
            counts
                .entry(id)
                .or_default()
                .insert(RefType::Relationship, new_count);
        }
    }

    /// A snapshot of every `(memory_id, ref_type, count)` row, for
    /// checkpointing to the `reference_counts` table.
    #[must_use]
    pub fn all_counts(&self) -> Vec<(String, RefType, u64)> {
        self.counts
            .read()
            .iter()
            .flat_map(|(id, by_type)| {
                by_type
                    .iter()
                    .map(move |(ref_type, count)| (id.clone(), *ref_type, *count))
            })
            .collect()
    }

    /// Rebuilds the counter from previously-checkpointed rows, e.g. on
    /// startup from the `reference_counts` table.
    pub fn load_counts(&self, rows: Vec<(String, RefType, u64)>) {
        let mut counts = self.counts.write();
        for (id, ref_type, count) in rows {
            counts.entry(id).or_default().insert(ref_type, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RelationshipType;

    #[test]
    fn decrement_never_goes_negative() {
        let counter = ReferenceCounter::new();
        counter.decrement("m1", "chunk").unwrap();
        assert_eq!(counter.total("m1"), 0);
    }

    #[test]
    fn increment_then_decrement_round_trips() {
        let counter = ReferenceCounter::new();
        counter.increment("m1", "chunk").unwrap();
        counter.increment("m1", "chunk").unwrap();
        counter.decrement("m1", "chunk").unwrap();
        assert_eq!(counter.total("m1"), 1);
    }

    #[test]
    fn is_protected_reflects_total() {
        let counter = ReferenceCounter::new();
        assert!(!counter.is_protected("m1"));
        counter.increment("m1", "decision").unwrap();
        assert!(counter.is_protected("m1"));
    }

    #[test]
    fn invalid_ref_type_is_rejected() {
        let counter = ReferenceCounter::new();
        assert!(counter.increment("m1", "bogus").is_err());
    }

    #[test]
    fn bulk_update_recomputes_relationship_counts_only() {
        let counter = ReferenceCounter::new();
        counter.increment("m1", "chunk").unwrap();
        counter.increment("m1", "relationship").unwrap();

        let edges = vec![RelationshipEdge {
            from_id: "m2".into(),
            to_id: "m1".into(),
            relationship_type: RelationshipType::Supports,
            strength: 1.0,
            valid_from: None,
            valid_to: None,
            auto_detected: false,
        }];
        counter.bulk_update_from_relationships(&edges);

        assert_eq!(counter.total("m1"), 2); // 1 chunk + 1 recomputed relationship
    }
}

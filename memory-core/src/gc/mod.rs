//! Component H — Generational GC.
//!
//! Age-based generations and archival-candidate selection. This module
//! only classifies; the Memory Store performs the actual archival, and
//! the Reference Counter (component G) and Relationship Graph (component
//! E) are consulted before a candidate is proposed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::GcConfig;

/// A GC generation: nursery, young, or tenured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Generation {
    /// Age < `gen0_max_days`. Collected daily.
    Nursery,
    /// `gen0_max_days` <= age < `gen1_max_days`. Collected weekly.
    Young,
    /// Age >= `gen1_max_days`. Collected monthly.
    Tenured,
}

impl Generation {
    /// The generation a memory of `age_days` belongs to, per the
    /// inclusive-lower, exclusive-upper boundaries (a memory exactly
    /// `gen0_max_days` old is already the next generation).
    #[must_use]
    pub fn for_age(age_days: i64, config: &GcConfig) -> Self {
        if age_days < config.gen0_max_days {
            Generation::Nursery
        } else if age_days < config.gen1_max_days {
            Generation::Young
        } else {
            Generation::Tenured
        }
    }

    /// Moves up one generation, capped at [`Generation::Tenured`].
    #[must_use]
    pub fn promoted(self) -> Self {
        match self {
            Generation::Nursery => Generation::Young,
            Generation::Young | Generation::Tenured => Generation::Tenured,
        }
    }
}

/// Per-memory generation bookkeeping: `(memory_id, generation,
/// promoted_at?, collection_survived_count, created_at)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationEntry {
    /// The memory this entry tracks.
    pub memory_id: String,
    /// Its current generation.
    pub generation: Generation,
    /// When it was last promoted, if ever.
    pub promoted_at: Option<DateTime<Utc>>,
    /// How many collection cycles it has survived in total.
    pub collection_survived_count: u64,
    /// When this entry was first created.
    pub created_at: DateTime<Utc>,
}

/// The facts about one memory a collection pass needs: everything the
/// collection rules in §4.H read, pre-joined from the Memory Store,
/// Access Log, Reference Counter, and Relationship Graph.
#[derive(Debug, Clone)]
pub struct GcCandidateFacts {
    /// The memory id.
    pub memory_id: String,
    /// Age in days at the time of collection.
    pub age_days: i64,
    /// Total access count recorded in the Access Log.
    pub access_count: u64,
    /// Current importance.
    pub importance: f64,
    /// Most recent access timestamp, if any.
    pub last_accessed: Option<DateTime<Utc>>,
    /// Whether the Relationship Graph has any edge touching this memory.
    pub has_relationship_links: bool,
    /// Whether the Reference Counter currently protects this memory
    /// (`total > 0`), which vetoes archival regardless of generation.
    pub is_protected: bool,
}

/// One collection pass's outcome: which ids to archive, which survived
/// and were promoted, and the event record.
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    /// Ids proposed for archival.
    pub collected: Vec<String>,
    /// Ids that survived and were promoted a generation.
    pub promoted: Vec<String>,
    /// The event record for this collection pass.
    pub event: GcEvent,
}

/// A collection-pass event: `(generation, collected_count,
/// promoted_count, total_in_generation, timestamp)`.
#[derive(Debug, Clone, Copy)]
pub struct GcEvent {
    /// The generation collected.
    pub generation: Generation,
    /// How many candidates were proposed for archival.
    pub collected_count: usize,
    /// How many candidates survived and were promoted.
    pub promoted_count: usize,
    /// Total candidates considered in this pass.
    pub total_in_generation: usize,
    /// When the pass ran.
    pub timestamp: DateTime<Utc>,
}

/// Runs one collection pass over `candidates`, all of which must already
/// belong to `generation` (callers filter by [`Generation::for_age`] or
/// by the tracked [`GenerationEntry::generation`] before calling). Ids
/// meeting the collection rule and not protected are collected; the rest
/// survive and are reported for promotion.
#[must_use]
pub fn collect_generation(
    candidates: &[GcCandidateFacts],
    generation: Generation,
    config: &GcConfig,
    now: DateTime<Utc>,
) -> CollectionOutcome {
    let mut collected = Vec::new();
    let mut promoted = Vec::new();

    for facts in candidates {
        let eligible = match generation {
            Generation::Nursery => facts.access_count == 0,
            Generation::Young => {
                facts.access_count < config.gen1_min_access
                    && facts.importance <= config.gen1_max_importance
            }
            Generation::Tenured => {
                facts.importance < config.gen2_max_importance
                    && !facts.has_relationship_links
                    && facts.last_accessed.is_none_or(|last| {
                        (now - last).num_days() >= config.gen2_access_stale_days
                    })
            }
        };

        if eligible && !facts.is_protected {
            collected.push(facts.memory_id.clone());
        } else {
            promoted.push(facts.memory_id.clone());
        }
    }

    CollectionOutcome {
        collected_count: collected.len(),
        promoted_count: promoted.len(),
        event: GcEvent {
            generation,
            collected_count: collected.len(),
            promoted_count: promoted.len(),
            total_in_generation: candidates.len(),
            timestamp: now,
        },
        collected,
        promoted,
    }
}

/// In-process tracker of [`GenerationEntry`] rows, one per memory.
#[derive(Default)]
pub struct GenerationTracker {
    entries: RwLock<HashMap<String, GenerationEntry>>,
    events: RwLock<Vec<GcEvent>>,
}

impl GenerationTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a brand-new memory at [`Generation::Nursery`].
    pub fn record_created(&self, memory_id: &str, now: DateTime<Utc>) {
        self.entries.write().entry(memory_id.to_string()).or_insert(GenerationEntry {
            memory_id: memory_id.to_string(),
            generation: Generation::Nursery,
            promoted_at: None,
            collection_survived_count: 0,
            created_at: now,
        });
    }

    /// The tracked entry for `memory_id`, if any.
    #[must_use]
    pub fn entry_for(&self, memory_id: &str) -> Option<GenerationEntry> {
        self.entries.read().get(memory_id).cloned()
    }

    /// Applies a [`CollectionOutcome`]: promotes every surviving id one
    /// generation (capped at [`Generation::Tenured`]) and appends the
    /// event to the event log.
    pub fn apply_outcome(&self, outcome: &CollectionOutcome, now: DateTime<Utc>) {
        let mut entries = self.entries.write();
        for id in &outcome.promoted {
            let entry = entries.entry(id.clone()).or_insert_with(|| GenerationEntry {
                memory_id: id.clone(),
                generation: Generation::Nursery,
                promoted_at: None,
                collection_survived_count: 0,
                created_at: now,
            });
            entry.generation = entry.generation.promoted();
            entry.promoted_at = Some(now);
            entry.collection_survived_count += 1;
        }
        self.events.write().push(outcome.event);
    }

    /// Every ids currently tracked at `generation`.
    #[must_use]
    pub fn ids_in_generation(&self, generation: Generation) -> Vec<String> {
        self.entries
            .read()
            .values()
            .filter(|e| e.generation == generation)
            .map(|e| e.memory_id.clone())
            .collect()
    }

    /// A snapshot of every recorded collection event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<GcEvent> {
        self.events.read().clone()
    }

    /// A snapshot of every tracked [`GenerationEntry`], for checkpointing
    /// to the `memory_generations` table.
    #[must_use]
    pub fn all_entries(&self) -> Vec<GenerationEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// Rebuilds the tracker's entries from previously-checkpointed rows,
    /// e.g. on startup from the `memory_generations` table.
    pub fn load_entries(&self, rows: Vec<GenerationEntry>) {
        let mut entries = self.entries.write();
        for entry in rows {
            entries.insert(entry.memory_id.clone(), entry);
        }
    }

    /// Appends previously-checkpointed collection events, e.g. on startup
    /// from the `gc_events` table.
    pub fn load_events(&self, events: Vec<GcEvent>) {
        self.events.write().extend(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GcConfig {
        GcConfig::default()
    }

    fn facts(id: &str) -> GcCandidateFacts {
        GcCandidateFacts {
            memory_id: id.into(),
            age_days: 1,
            access_count: 0,
            importance: 0.5,
            last_accessed: None,
            has_relationship_links: false,
            is_protected: false,
        }
    }

    #[test]
    fn boundary_seven_days_is_young_not_nursery() {
        assert_eq!(Generation::for_age(6, &config()), Generation::Nursery);
        assert_eq!(Generation::for_age(7, &config()), Generation::Young);
    }

    #[test]
    fn boundary_ninety_days_is_tenured() {
        assert_eq!(Generation::for_age(89, &config()), Generation::Young);
        assert_eq!(Generation::for_age(90, &config()), Generation::Tenured);
    }

    #[test]
    fn nursery_zero_access_is_candidate() {
        let f = facts("m1");
        let outcome = collect_generation(&[f], Generation::Nursery, &config(), Utc::now());
        assert_eq!(outcome.collected, vec!["m1".to_string()]);
    }

    #[test]
    fn gen1_survives_with_two_accesses_and_zero_importance() {
        let mut f = facts("m1");
        f.access_count = 2;
        f.importance = 0.0;
        let outcome = collect_generation(&[f], Generation::Young, &config(), Utc::now());
        assert!(outcome.collected.is_empty());
        assert_eq!(outcome.promoted, vec!["m1".to_string()]);
    }

    #[test]
    fn gen1_collected_with_one_access_and_half_importance() {
        let mut f = facts("m1");
        f.access_count = 1;
        f.importance = 0.5;
        let outcome = collect_generation(&[f], Generation::Young, &config(), Utc::now());
        assert_eq!(outcome.collected, vec!["m1".to_string()]);
    }

    #[test]
    fn gen2_protected_memory_is_never_collected() {
        let mut f = facts("m1");
        f.importance = 0.0;
        f.is_protected = true;
        let outcome = collect_generation(&[f], Generation::Tenured, &config(), Utc::now());
        assert!(outcome.collected.is_empty());
    }

    #[test]
    fn gen2_with_relationship_link_survives() {
        let mut f = facts("m1");
        f.importance = 0.1;
        f.has_relationship_links = true;
        let outcome = collect_generation(&[f], Generation::Tenured, &config(), Utc::now());
        assert!(outcome.collected.is_empty());
    }

    #[test]
    fn scenario_s5_tenured_memory_with_no_links_is_collected() {
        let now = Utc::now();
        let mut f = facts("m_old");
        f.age_days = 120;
        f.importance = 0.1;
        f.access_count = 0;
        f.last_accessed = None;
        let outcome = collect_generation(&[f], Generation::Tenured, &config(), now);
        assert_eq!(outcome.collected, vec!["m_old".to_string()]);
    }

    #[test]
    fn promotion_caps_at_tenured() {
        let tracker = GenerationTracker::new();
        let now = Utc::now();
        tracker.record_created("m1", now);
        let outcome = CollectionOutcome {
            collected: vec![],
            promoted: vec!["m1".into()],
            event: GcEvent {
                generation: Generation::Tenured,
                collected_count: 0,
                promoted_count: 1,
                total_in_generation: 1,
                timestamp: now,
            },
        };
        tracker.apply_outcome(&outcome, now);
        tracker.apply_outcome(&outcome, now);
        tracker.apply_outcome(&outcome, now);
        let entry = tracker.entry_for("m1").unwrap();
        assert_eq!(entry.generation, Generation::Tenured);
        assert_eq!(entry.collection_survived_count, 3);
    }
}

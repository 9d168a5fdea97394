//! `[SUPPLEMENT]` Emotional tagging.
//!
//! A lightweight heuristic valence/arousal annotator, backing the
//! glossary's "flashbulb memory" concept. The Lifecycle Engine's
//! reinforcement scheduler (component I) consults a memory's arousal to
//! decide how fast its next review interval grows; nothing in component H
//! (generational GC) reads this annotation.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// A heuristic valence/arousal annotation for one memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalTag {
    /// The memory this tag describes.
    pub memory_id: String,
    /// Positive/negative affect, in `[-1.0, 1.0]`.
    pub valence: f64,
    /// Intensity of affect, in `[0.0, 1.0]`.
    pub arousal: f64,
    /// Which surface signals contributed to this reading.
    pub signals: Vec<String>,
    /// When the tag was derived.
    pub created_at: DateTime<Utc>,
}

impl EmotionalTag {
    /// Whether this tag marks its memory as a "flashbulb memory":
    /// unusually high emotional arousal, which slows decay in the
    /// reinforcement scheduler.
    #[must_use]
    pub fn is_flashbulb(&self) -> bool {
        self.arousal >= defaults::FLASHBULB_AROUSAL_THRESHOLD
    }
}

static FRUSTRATION_WORDS: &[&str] = &[
    "ugh", "broken", "failing", "frustrated", "annoying", "stuck", "wrong", "error", "crash",
];
static SUCCESS_WORDS: &[&str] = &[
    "finally", "works", "solved", "fixed", "great", "excellent", "success", "nailed",
];
static CORRECTION_WORDS: &[&str] = &["actually", "correction", "mistake", "oops", "wait no"];

static EXCLAMATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!").expect("static pattern is valid"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("static pattern is valid"));

/// Derives an [`EmotionalTag`] from a memory's content using simple
/// surface heuristics: exclamation density, ALL-CAPS density, and
/// frustration/success/correction keyword markers.
///
/// This is a pure function over text, not a collaborator call: no LLM or
/// network dependency is involved.
#[must_use]
pub fn tag_content(memory_id: &str, content: &str, now: DateTime<Utc>) -> EmotionalTag {
    let lowered = content.to_lowercase();
    let words: Vec<&str> = WORD.find_iter(content).map(|m| m.as_str()).collect();
    let word_count = words.len().max(1) as f64;

    let exclamation_density = EXCLAMATION.find_iter(content).count() as f64 / word_count;
    let caps_words = words.iter().filter(|w| is_shouty(w)).count() as f64;
    let caps_density = caps_words / word_count;

    let mut signals = Vec::new();
    let frustration_hits = count_hits(&lowered, FRUSTRATION_WORDS);
    let success_hits = count_hits(&lowered, SUCCESS_WORDS);
    let correction_hits = count_hits(&lowered, CORRECTION_WORDS);

    if frustration_hits > 0 {
        signals.push("frustration".to_string());
    }
    if success_hits > 0 {
        signals.push("success".to_string());
    }
    if correction_hits > 0 {
        signals.push("correction".to_string());
    }
    if exclamation_density > 0.05 {
        signals.push("exclamation_density".to_string());
    }
    if caps_density > 0.05 {
        signals.push("caps_density".to_string());
    }

    let valence = ((success_hits as f64 - frustration_hits as f64 - 0.5 * correction_hits as f64)
        / 3.0)
        .clamp(-1.0, 1.0);

    let arousal = (exclamation_density * 4.0
        + caps_density * 3.0
        + (frustration_hits + success_hits) as f64 * 0.15)
        .clamp(0.0, 1.0);

    EmotionalTag {
        memory_id: memory_id.to_string(),
        valence,
        arousal,
        signals,
        created_at: now,
    }
}

/// Stores the most recent [`EmotionalTag`] per memory, backing the
/// `emotional_tags` table. One memory can only ever hold one live tag;
/// re-tagging (e.g. on content update) replaces it.
#[derive(Default)]
pub struct EmotionalTagStore {
    tags: RwLock<HashMap<String, EmotionalTag>>,
}

impl EmotionalTagStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tag`, replacing any prior tag for the same memory.
    pub fn record(&self, tag: EmotionalTag) {
        self.tags.write().insert(tag.memory_id.clone(), tag);
    }

    /// The tracked tag for `memory_id`, if any.
    #[must_use]
    pub fn tag_for(&self, memory_id: &str) -> Option<EmotionalTag> {
        self.tags.read().get(memory_id).cloned()
    }

    /// A snapshot of every tracked tag, for checkpointing to the
    /// `emotional_tags` table.
    #[must_use]
    pub fn all_tags(&self) -> Vec<EmotionalTag> {
        self.tags.read().values().cloned().collect()
    }

    /// Rebuilds the store from previously-checkpointed rows, e.g. on
    /// startup from the `emotional_tags` table.
    pub fn load_tags(&self, rows: Vec<EmotionalTag>) {
        let mut tags = self.tags.write();
        for tag in rows {
            tags.insert(tag.memory_id.clone(), tag);
        }
    }
}

fn is_shouty(word: &str) -> bool {
    word.len() >= 3 && word.chars().all(|c| c.is_ascii_uppercase())
}

fn count_hits(lowered: &str, markers: &[&str]) -> usize {
    markers.iter().filter(|m| lowered.contains(*m)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calm_content_is_not_flashbulb() {
        let tag = tag_content("m1", "the meeting is at 3pm tomorrow", Utc::now());
        assert!(!tag.is_flashbulb());
    }

    #[test]
    fn excited_success_content_raises_arousal_and_valence() {
        let tag = tag_content(
            "m1",
            "IT FINALLY WORKS!!! Fixed the deploy bug, great success!",
            Utc::now(),
        );
        assert!(tag.arousal > 0.3);
        assert!(tag.valence > 0.0);
        assert!(tag.signals.contains(&"success".to_string()));
    }

    #[test]
    fn frustrated_content_has_negative_valence() {
        let tag = tag_content("m1", "ugh this is broken and failing again, so annoying", Utc::now());
        assert!(tag.valence < 0.0);
        assert!(tag.signals.contains(&"frustration".to_string()));
    }

    #[test]
    fn high_arousal_threshold_marks_flashbulb() {
        let tag = EmotionalTag {
            memory_id: "m1".into(),
            valence: 0.5,
            arousal: 0.6,
            signals: vec![],
            created_at: Utc::now(),
        };
        assert!(tag.is_flashbulb());
    }

    #[test]
    fn store_tracks_most_recent_tag_per_memory() {
        let store = EmotionalTagStore::new();
        let first = tag_content("m1", "it is fine", Utc::now());
        store.record(first);
        let second = tag_content("m1", "IT FINALLY WORKS!!!", Utc::now());
        store.record(second.clone());

        let tracked = store.tag_for("m1").unwrap();
        assert_eq!(tracked.arousal, second.arousal);
        assert_eq!(store.all_tags().len(), 1);
    }
}

//! Component J — Session Consolidator.
//!
//! Reads a transcript, extracts candidate memories (via an [`LLM`]
//! collaborator when available, falling back to a heuristic extractor),
//! scores importance, runs each candidate through [`crate::dedup`], and
//! persists survivors via the Memory Store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreaker;
use crate::constants::defaults;
use crate::dedup::{ContentDedup, DedupOutcome};
use crate::emotional;
use crate::entities;
use crate::error::Result;
use crate::memory::{Memory, MemoryStore};

/// One message in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Who sent it, e.g. `"user"` or `"assistant"`.
    pub role: String,
    /// The message text.
    pub content: String,
}

/// A candidate memory pulled out of a transcript, before dedup/persist.
#[derive(Debug, Clone)]
pub struct CandidateMemory {
    /// The candidate's text.
    pub content: String,
    /// Heuristic or LLM-assigned importance, in `[0, 1]`.
    pub importance: f64,
    /// Tags assigned to the candidate.
    pub tags: Vec<String>,
}

/// The LLM collaborator interface: a single prompt/response call with a
/// caller-supplied deadline.
///
/// No real network-calling implementation lives in this crate — the
/// model is a collaborator, injected by the caller.
#[async_trait]
pub trait LLM: Send + Sync {
    /// Asks `prompt` of `model`, returning its text response or failing
    /// with [`crate::error::Error::LLMTimeout`] if `timeout` elapses
    /// first.
    async fn ask(&self, prompt: &str, model: &str, timeout: std::time::Duration) -> Result<String>;
}

/// Wraps an [`LLM`] with a circuit breaker, mirroring
/// [`crate::embeddings::GuardedEmbedder`].
pub struct GuardedLLM<L: LLM> {
    inner: L,
    breaker: Arc<CircuitBreaker>,
}

impl<L: LLM> GuardedLLM<L> {
    /// Wraps `inner` with `breaker`.
    pub fn new(inner: L, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }
}

#[async_trait]
impl<L: LLM> LLM for GuardedLLM<L> {
    async fn ask(&self, prompt: &str, model: &str, timeout: std::time::Duration) -> Result<String> {
        if !self.breaker.allow_request() {
            return Err(crate::error::Error::CircuitOpen(self.breaker.name().to_string()));
        }
        match self.inner.ask(prompt, model, timeout).await {
            Ok(text) => {
                self.breaker.record_success();
                Ok(text)
            }
            Err(err) => {
                self.breaker.record_failure();
                Err(err)
            }
        }
    }
}

/// Splits a transcript into heuristic candidate memories: one candidate
/// per user/assistant message pair that looks like a statement of fact
/// or decision (longer than a few words, not a question). Used when no
/// [`LLM`] is configured or the LLM call fails.
#[must_use]
pub fn extract_heuristic(transcript: &[TranscriptMessage]) -> Vec<CandidateMemory> {
    transcript
        .iter()
        .filter(|m| m.role == "user" || m.role == "assistant")
        .filter(|m| is_memorable(&m.content))
        .map(|m| CandidateMemory {
            content: m.content.trim().to_string(),
            importance: score_importance(&m.content),
            tags: Vec::new(),
        })
        .collect()
}

fn is_memorable(content: &str) -> bool {
    let trimmed = content.trim();
    let word_count = trimmed.split_whitespace().count();
    word_count >= 4 && !trimmed.ends_with('?')
}

/// Heuristic importance score in `[0, 1]`, informed by emotional arousal
/// and entity density: longer, entity-rich, emotionally salient content
/// scores higher.
#[must_use]
pub fn score_importance(content: &str) -> f64 {
    let tag = emotional::tag_content("candidate", content, Utc::now());
    let entity_count = entities::extract("candidate", content).len();

    let length_signal = (content.split_whitespace().count() as f64 / 40.0).min(1.0);
    let entity_signal = (entity_count as f64 / 3.0).min(1.0);
    let arousal_signal = tag.arousal;

    (0.4 * length_signal + 0.3 * entity_signal + 0.3 * arousal_signal).clamp(0.0, 1.0)
}

/// The result of one consolidation run.
#[derive(Debug, Clone)]
pub struct ConsolidationReport {
    /// How many candidates were extracted from the transcript.
    pub extracted_count: usize,
    /// How many candidates were persisted as new memories.
    pub saved_count: usize,
    /// How many candidates were rejected as duplicates.
    pub deduped_count: usize,
    /// `(count_of_high_importance / total) * quality_factor`.
    pub session_quality: f64,
    /// The memories actually persisted.
    pub saved_memories: Vec<Memory>,
    /// Every candidate extracted, saved or not.
    pub all_extracted: Vec<CandidateMemory>,
}

/// Consolidates a session transcript into persisted memories.
pub struct SessionConsolidator<'a> {
    store: &'a MemoryStore,
    dedup: &'a ContentDedup,
}

impl<'a> SessionConsolidator<'a> {
    /// Builds a consolidator over `store` and `dedup`.
    #[must_use]
    pub fn new(store: &'a MemoryStore, dedup: &'a ContentDedup) -> Self {
        Self { store, dedup }
    }

    /// Consolidates `transcript` using the heuristic extractor.
    ///
    /// Every candidate is checked against [`ContentDedup`] (exact and
    /// normalized levels only — no embedding is computed here); survivors
    /// are persisted via the Memory Store. Dedup-registration of
    /// survivors happens as they are saved, so later candidates in the
    /// same transcript are deduped against earlier ones too.
    pub async fn consolidate(
        &self,
        transcript: &[TranscriptMessage],
        project_id: Option<&str>,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ConsolidationReport> {
        let candidates = extract_heuristic(transcript);
        self.consolidate_candidates(candidates, project_id, session_id, now).await
    }

    /// Consolidates a pre-extracted candidate list (e.g. from an [`LLM`]
    /// caller), running the same dedup/persist/report pipeline as
    /// [`Self::consolidate`].
    pub async fn consolidate_candidates(
        &self,
        candidates: Vec<CandidateMemory>,
        project_id: Option<&str>,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ConsolidationReport> {
        let extracted_count = candidates.len();
        let mut saved_memories = Vec::new();
        let mut deduped_count = 0;

        for candidate in &candidates {
            let outcome = self.dedup.check(&candidate.content, None, now);
            if matches!(outcome, DedupOutcome::Duplicate { .. }) {
                deduped_count += 1;
                continue;
            }

            let scope = if project_id.is_some() {
                crate::memory::Scope::Project
            } else {
                crate::memory::Scope::Global
            };
            let memory = self
                .store
                .create(
                    candidate.content.clone(),
                    project_id.unwrap_or(defaults::UNSCOPED_PROJECT_ID).to_string(),
                    candidate.tags.iter().cloned().collect(),
                    candidate.importance,
                    scope,
                    session_id.map(str::to_string),
                    defaults::DEFAULT_CONFIDENCE,
                    now,
                )
                .await?;
            self.dedup.register(&memory.id, &candidate.content, None);
            saved_memories.push(memory);
        }

        let high_importance = candidates
            .iter()
            .filter(|c| c.importance >= defaults::HIGH_IMPORTANCE_THRESHOLD)
            .count();
        let session_quality = if extracted_count == 0 {
            0.0
        } else {
            (high_importance as f64 / extracted_count as f64) * defaults::SESSION_QUALITY_FACTOR
        };

        Ok(ConsolidationReport {
            extracted_count,
            saved_count: saved_memories.len(),
            deduped_count,
            session_quality,
            saved_memories,
            all_extracted: candidates,
        })
    }
}

//! Hybrid scoring: semantic similarity + normalized keyword + recency +
//! importance, combined with fixed weights.

use chrono::{DateTime, Utc};

use super::bm25;
use crate::config::RankingConfig;
use crate::memory::Memory;

/// Cosine similarity of two equal-length vectors. Returns 0.0 if either
/// vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Recency score: `max(0, 1 - age_days / window)`.
#[must_use]
pub fn recency(memory: &Memory, now: DateTime<Utc>, window_days: f64) -> f64 {
    let age_days = memory.age_days(now) as f64;
    (1.0 - age_days / window_days).max(0.0)
}

/// One candidate's per-signal and combined scores.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    /// The memory id this score belongs to.
    pub id: String,
    /// Cosine similarity between query and content embeddings.
    pub semantic: f64,
    /// Normalized keyword score.
    pub keyword: f64,
    /// Recency score.
    pub recency: f64,
    /// The memory's importance.
    pub importance: f64,
    /// The weighted combination of the four signals above.
    pub combined: f64,
    /// Last-updated timestamp, used as a tie-breaker.
    pub updated: DateTime<Utc>,
}

/// Scores every `(memory, query_embedding, content_embedding)` triple and
/// returns them sorted by `combined` descending, ties broken by more
/// recent `updated`, then by id ascending.
#[must_use]
pub fn rank(
    query: &str,
    candidates: &[(Memory, Vec<f32>)],
    query_embedding: &[f32],
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> Vec<ScoredMemory> {
    let documents: Vec<(String, String)> = candidates
        .iter()
        .map(|(memory, _)| (memory.id.clone(), memory.content.clone()))
        .collect();
    let keyword_scores = bm25::normalize(bm25::raw_scores(query, &documents));

    let mut scored: Vec<ScoredMemory> = candidates
        .iter()
        .map(|(memory, embedding)| {
            let semantic = cosine_similarity(query_embedding, embedding);
            let keyword = keyword_scores.get(&memory.id).copied().unwrap_or(0.0);
            let recency = recency(memory, now, config.recency_window_days);
            let importance = memory.importance;
            let combined = config.weight_semantic * semantic
                + config.weight_keyword * keyword
                + config.weight_recency * recency
                + config.weight_importance * importance;
            ScoredMemory {
                id: memory.id.clone(),
                semantic,
                keyword,
                recency,
                importance,
                combined,
                updated: memory.updated,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.updated.cmp(&a.updated))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored
}

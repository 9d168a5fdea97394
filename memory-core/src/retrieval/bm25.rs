//! BM25-style keyword scoring over tokenized content.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

const K1: f64 = 1.5;
const B: f64 = 0.75;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("static pattern is valid"));

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "will", "with",
];

/// Lowercases, splits `text` into alphanumeric tokens, and drops common
/// stopwords that carry no discriminative weight.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// Computes raw (un-normalized) BM25 scores for `query` against each of
/// `documents`, keyed by document id.
#[must_use]
pub fn raw_scores(query: &str, documents: &[(String, String)]) -> HashMap<String, f64> {
    let query_terms = tokenize(query);
    if query_terms.is_empty() || documents.is_empty() {
        return documents.iter().map(|(id, _)| (id.clone(), 0.0)).collect();
    }

    let tokenized: Vec<(String, Vec<String>)> = documents
        .iter()
        .map(|(id, content)| (id.clone(), tokenize(content)))
        .collect();

    let doc_count = tokenized.len() as f64;
    let avg_len = tokenized.iter().map(|(_, terms)| terms.len() as f64).sum::<f64>() / doc_count;

    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for term in &query_terms {
        let df = tokenized
            .iter()
            .filter(|(_, terms)| terms.iter().any(|t| t == term))
            .count();
        document_frequency.insert(term.as_str(), df);
    }

    let mut scores = HashMap::with_capacity(tokenized.len());
    for (id, terms) in &tokenized {
        let doc_len = terms.len() as f64;
        let mut score = 0.0;
        for term in &query_terms {
            let term_freq = terms.iter().filter(|t| *t == term).count() as f64;
            if term_freq == 0.0 {
                continue;
            }
            let df = *document_frequency.get(term.as_str()).unwrap_or(&0) as f64;
            let idf = ((doc_count - df + 0.5) / (df + 0.5) + 1.0).ln();
            let denom = term_freq + K1 * (1.0 - B + B * doc_len / avg_len.max(f64::EPSILON));
            score += idf * (term_freq * (K1 + 1.0)) / denom.max(f64::EPSILON);
        }
        scores.insert(id.clone(), score.max(0.0));
    }
    scores
}

/// Normalizes raw scores to `[0, 1]` by dividing by the maximum score in
/// the set. An all-zero input (including a stopword-only query) stays
/// all-zero.
#[must_use]
pub fn normalize(scores: HashMap<String, f64>) -> HashMap<String, f64> {
    let max = scores.values().copied().fold(0.0_f64, f64::max);
    if max <= f64::EPSILON {
        return scores.into_iter().map(|(id, _)| (id, 0.0)).collect();
    }
    scores.into_iter().map(|(id, score)| (id, score / max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits_on_punctuation() {
        assert_eq!(tokenize("Dark Mode, UI!"), vec!["dark", "mode", "ui"]);
    }

    #[test]
    fn normalized_scores_are_bounded_and_best_match_is_one() {
        let documents = vec![
            ("m1".to_string(), "dark mode user preference".to_string()),
            ("m2".to_string(), "light mode fallback".to_string()),
        ];
        let raw = raw_scores("dark mode", &documents);
        let normalized = normalize(raw);
        for value in normalized.values() {
            assert!(*value >= 0.0 && *value <= 1.0 + 1e-9);
        }
        assert!((normalized["m1"] - 1.0).abs() < 1e-9);
        assert!(normalized["m2"] < normalized["m1"]);
    }

    #[test]
    fn stopword_only_query_scores_zero() {
        let documents = vec![("m1".to_string(), "the quick brown fox".to_string())];
        let raw = raw_scores("the of and", &documents);
        let normalized = normalize(raw);
        assert_eq!(normalized["m1"], 0.0);
    }
}

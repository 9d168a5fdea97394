//! Human-readable explanation strings for search results.
//!
//! The exact wording is not part of any invariant; only that every result
//! carries a non-empty explanation.

use super::bm25;
use super::ranking::ScoredMemory;

/// Builds a short explanation of why `scored` matched `query`, e.g.
/// `"Strong semantic match 87%; keywords: dark, mode"`.
#[must_use]
pub fn explain(query: &str, content: &str, scored: &ScoredMemory) -> String {
    let semantic_pct = (scored.semantic.max(0.0) * 100.0).round() as i64;
    let semantic_label = match scored.semantic {
        s if s >= 0.8 => "Strong semantic match",
        s if s >= 0.5 => "Moderate semantic match",
        s if s > 0.0 => "Weak semantic match",
        _ => "No semantic match",
    };

    let query_terms = bm25::tokenize(query);
    let content_terms: std::collections::HashSet<String> =
        bm25::tokenize(content).into_iter().collect();
    let matched_keywords: Vec<&str> = query_terms
        .iter()
        .filter(|t| content_terms.contains(*t))
        .map(String::as_str)
        .collect();

    if matched_keywords.is_empty() {
        format!("{semantic_label} {semantic_pct}%")
    } else {
        format!(
            "{semantic_label} {semantic_pct}%; keywords: {}",
            matched_keywords.join(", ")
        )
    }
}

/// The generic explanation used when the normal explanation path cannot
/// complete (e.g. an LLM timeout in a hydration path).
#[must_use]
pub fn generic() -> String {
    "Matched by hybrid retrieval".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn scored(semantic: f64) -> ScoredMemory {
        ScoredMemory {
            id: "m1".into(),
            semantic,
            keyword: 0.5,
            recency: 0.5,
            importance: 0.5,
            combined: 0.5,
            updated: Utc::now(),
        }
    }

    #[test]
    fn explanation_is_never_empty() {
        let text = explain("dark mode", "dark mode user preference", &scored(0.9));
        assert!(!text.is_empty());
    }

    #[test]
    fn explanation_lists_matched_keywords() {
        let text = explain("dark mode", "dark mode user preference", &scored(0.9));
        assert!(text.contains("dark"));
        assert!(text.contains("mode"));
    }

    #[test]
    fn generic_explanation_is_never_empty() {
        assert!(!generic().is_empty());
    }
}

//! Content hashing: exact, normalized, and semantic (embedding-bucket).

use sha2::{Digest, Sha256};

/// The three hashes recorded for a piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    /// Hash of the byte-identical content.
    pub exact: String,
    /// Hash of the lowercased, punctuation-stripped, whitespace-collapsed
    /// content.
    pub normalized: String,
    /// Hash of the quantized embedding bucket, if an embedding was
    /// supplied.
    pub semantic: Option<String>,
}

/// Hashes raw byte content, producing a fixed-length hex digest.
#[must_use]
pub fn exact_hash(content: &str) -> String {
    hex_digest(content.as_bytes())
}

/// Normalizes text: lowercase, strip punctuation, collapse internal
/// whitespace to single spaces, trim ends.
#[must_use]
pub fn normalize(content: &str) -> String {
    let lowered = content.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hashes the normalized form of `content`.
#[must_use]
pub fn normalized_hash(content: &str) -> String {
    hex_digest(normalize(content).as_bytes())
}

/// Quantizes an embedding into `bins` equal-width buckets over its own
/// value range and hashes the resulting bucket-index vector.
///
/// Near-duplicate embeddings (small perturbations of the same vector)
/// land in the same buckets and therefore collide, which is exactly what
/// the semantic dedup tier relies on.
#[must_use]
pub fn semantic_hash(embedding: &[f32], bins: usize) -> String {
    if embedding.is_empty() || bins == 0 {
        return hex_digest(&[]);
    }
    let min = embedding.iter().copied().fold(f32::INFINITY, f32::min);
    let max = embedding.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = (max - min).max(f32::EPSILON);

    let mut bytes = Vec::with_capacity(embedding.len());
    for value in embedding {
        let normalized = ((value - min) / span).clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bucket = ((normalized * bins as f32) as usize).min(bins - 1);
        bytes.push(bucket as u8);
    }
    hex_digest(&bytes)
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_hash_is_deterministic() {
        assert_eq!(exact_hash("hello"), exact_hash("hello"));
        assert_ne!(exact_hash("hello"), exact_hash("Hello"));
    }

    #[test]
    fn normalize_collapses_case_and_punctuation() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("  hello   world  "), "hello world");
    }

    #[test]
    fn normalized_hash_matches_across_punctuation_variants() {
        assert_eq!(
            normalized_hash("Hello, World!"),
            normalized_hash("hello world")
        );
    }

    #[test]
    fn semantic_hash_collides_for_near_duplicate_vectors() {
        let a = vec![0.10_f32, 0.50, 0.91];
        let b = vec![0.11_f32, 0.49, 0.90];
        assert_eq!(semantic_hash(&a, 16), semantic_hash(&b, 16));
    }

    #[test]
    fn semantic_hash_differs_for_distant_vectors() {
        let a = vec![0.1_f32, 0.9, 0.1];
        let b = vec![0.9_f32, 0.1, 0.9];
        assert_ne!(semantic_hash(&a, 16), semantic_hash(&b, 16));
    }
}

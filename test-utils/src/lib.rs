//! Deterministic test collaborators and fixtures shared by memory-core's
//! integration tests, the storage-backend crates, and `demos`.
//!
//! Nothing here calls out to a network. [`MockEmbedder`] and [`MockLLM`]
//! are pure functions of their input so tests stay reproducible.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use memory_core::config::MemoryConfig;
use memory_core::consolidator::LLM;
use memory_core::embeddings::Embedder;
use memory_core::error::Result;

/// A deterministic stand-in for a real embedding model.
///
/// Encodes text by hashing its words into a fixed-dimension vector and
/// L2-normalizing it, so texts sharing many words land closer together
/// than unrelated ones, without ever calling out to a real model.
pub struct MockEmbedder {
    dimension: usize,
    model_name: String,
}

impl MockEmbedder {
    /// Builds a mock embedder producing `dimension`-length vectors.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: "mock-embedder-v1".to_string(),
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Ok(vector);
        }

        for word in &words {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();
            let bucket = (hash as usize) % self.dimension;
            let sign = if hash & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// A deterministic stand-in for a real LLM, used to exercise
/// consolidation code paths without a network dependency.
///
/// Every call echoes the prompt's first line prefixed with its
/// configured `reply_prefix`, unless `fail` is set, in which case every
/// call returns [`memory_core::error::Error::LLMTimeout`].
pub struct MockLLM {
    reply_prefix: String,
    fail: bool,
}

impl MockLLM {
    /// Builds a mock LLM that echoes prompts back prefixed with
    /// `reply_prefix`.
    #[must_use]
    pub fn new(reply_prefix: impl Into<String>) -> Self {
        Self {
            reply_prefix: reply_prefix.into(),
            fail: false,
        }
    }

    /// Builds a mock LLM whose every call fails with
    /// [`memory_core::error::Error::LLMTimeout`], for exercising
    /// fallback-to-heuristic paths.
    #[must_use]
    pub fn always_fails() -> Self {
        Self {
            reply_prefix: String::new(),
            fail: true,
        }
    }
}

impl Default for MockLLM {
    fn default() -> Self {
        Self::new("summary")
    }
}

#[async_trait]
impl LLM for MockLLM {
    async fn ask(&self, prompt: &str, _model: &str, timeout: Duration) -> Result<String> {
        if self.fail {
            return Err(memory_core::error::Error::LLMTimeout(timeout));
        }
        let first_line = prompt.lines().next().unwrap_or_default();
        Ok(format!("{}: {first_line}", self.reply_prefix))
    }
}

/// Builds a [`MemoryConfig`] rooted at `store_root`, otherwise matching
/// the specification's defaults. Intended for tests that need a fresh
/// store per run, typically backed by a [`tempfile::TempDir`].
#[must_use]
pub fn test_config(store_root: &Path) -> MemoryConfig {
    MemoryConfig {
        store_root: store_root.to_path_buf(),
        ..MemoryConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.encode("hello world").await.unwrap();
        let b = embedder.encode("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[tokio::test]
    async fn mock_embedder_empty_text_is_zero_vector() {
        let embedder = MockEmbedder::new(16);
        let vector = embedder.encode("").await.unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn mock_llm_echoes_first_line() {
        let llm = MockLLM::new("echo");
        let reply = llm.ask("first\nsecond", "mock-model", Duration::from_secs(1)).await.unwrap();
        assert_eq!(reply, "echo: first");
    }

    #[tokio::test]
    async fn mock_llm_always_fails_times_out() {
        let llm = MockLLM::always_fails();
        let result = llm.ask("x", "mock-model", Duration::from_millis(1)).await;
        assert!(matches!(result, Err(memory_core::error::Error::LLMTimeout(_))));
    }

    #[test]
    fn test_config_overrides_store_root_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        assert_eq!(config.store_root, dir.path());
        assert_eq!(config.ranking.weight_semantic, MemoryConfig::default().ranking.weight_semantic);
    }
}

//! The `Embedder` collaborator interface and its circuit-breaker wrapper.

use std::sync::Arc;

use async_trait::async_trait;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::{Error, Result};

/// A pure, deterministic (for a fixed model) text-to-vector function.
///
/// Implementations may block and may fail; failure is surfaced as
/// [`Error::EmbedderUnavailable`]. No real network-calling implementation
/// lives in this crate — the embedding model is a collaborator, injected
/// by the caller.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Encodes a single piece of text into a fixed-dimension vector.
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encodes many texts in a single call. The default implementation
    /// calls [`Self::encode`] once per text; implementations backed by a
    /// batching API should override this.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.encode(text).await?);
        }
        Ok(out)
    }

    /// The dimension this embedder produces.
    fn dimension(&self) -> usize;

    /// A stable name identifying the underlying model.
    fn model_name(&self) -> &str;
}

/// Wraps an [`Embedder`] with a circuit breaker: when open, calls are
/// short-circuited with [`Error::CircuitOpen`] instead of reaching the
/// inner embedder.
pub struct GuardedEmbedder<E: Embedder> {
    inner: E,
    breaker: Arc<CircuitBreaker>,
}

impl<E: Embedder> GuardedEmbedder<E> {
    /// Wraps `inner` with `breaker`.
    pub fn new(inner: E, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }
}

#[async_trait]
impl<E: Embedder> Embedder for GuardedEmbedder<E> {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        if !self.breaker.allow_request() {
            return Err(Error::CircuitOpen(self.breaker.name().to_string()));
        }
        match self.inner.encode(text).await {
            Ok(vector) => {
                self.breaker.record_success();
                Ok(vector)
            }
            Err(err) => {
                self.breaker.record_failure();
                Err(err)
            }
        }
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if !self.breaker.allow_request() {
            return Err(Error::CircuitOpen(self.breaker.name().to_string()));
        }
        match self.inner.encode_batch(texts).await {
            Ok(vectors) => {
                self.breaker.record_success();
                Ok(vectors)
            }
            Err(err) => {
                self.breaker.record_failure();
                Err(err)
            }
        }
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyEmbedder {
        calls: AtomicUsize,
        fail_first_n: usize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_n {
                Err(Error::EmbedderUnavailable("down".into()))
            } else {
                Ok(vec![0.1, 0.2, 0.3])
            }
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn opens_after_threshold_then_short_circuits() {
        let embedder = FlakyEmbedder {
            calls: AtomicUsize::new(0),
            fail_first_n: 10,
        };
        let breaker = CircuitBreaker::new(
            "embedder",
            CircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout_seconds: 600,
            },
        );
        let guarded = GuardedEmbedder::new(embedder, breaker);

        assert!(guarded.encode("a").await.is_err());
        assert!(guarded.encode("b").await.is_err());
        let result = guarded.encode("c").await;
        assert!(matches!(result, Err(Error::CircuitOpen(_))));
    }
}

//! Component C — Embedding Cache.

mod cache;
mod embedder;
mod lru;

pub use cache::{EmbeddingCache, EmbeddingPersistentStore, EmbeddingRecord};
pub use embedder::{Embedder, GuardedEmbedder};
pub use lru::EmbeddingLru;

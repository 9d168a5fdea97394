//! Common setup utilities for memory store benchmarks.

use std::sync::Arc;

use memory_core::clock::SystemClock;
use memory_core::system::MemorySystem;
use memory_storage_redb::RedbEmbeddingStore;
use test_utils::MockEmbedder;

/// A ready-to-use system backed by a temp redb embedding cache and the
/// deterministic mock embedder. The `TempDir` must outlive the system.
pub async fn setup_system(temp_dir: &tempfile::TempDir) -> MemorySystem<RedbEmbeddingStore, MockEmbedder> {
    let config = test_utils::test_config(temp_dir.path());
    let persistent =
        Arc::new(RedbEmbeddingStore::open(&temp_dir.path().join("embeddings.redb")).await.expect("open redb"));
    let embedder = Arc::new(MockEmbedder::new(config.embedding_cache.dimension));
    let clock = Arc::new(SystemClock);
    MemorySystem::open(config, persistent, embedder, clock).await.expect("open memory system")
}

/// A short, varied sentence so saved memories don't all dedup to one hash.
pub fn generate_memory_content(id: usize) -> String {
    format!("incident {id}: the deploy pipeline retried {id} times before the canary stabilized")
}

//! Saves a handful of memories and runs a hybrid search over them.
//!
//! Run with: `cargo run -p demos --example save_and_search`

use std::sync::Arc;

use memory_core::clock::SystemClock;
use memory_core::system::MemorySystem;
use memory_storage_redb::RedbEmbeddingStore;
use test_utils::MockEmbedder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_utils::test_config(dir.path());

    let persistent = Arc::new(RedbEmbeddingStore::open(&dir.path().join("embeddings.redb")).await?);
    let embedder = Arc::new(MockEmbedder::new(config.embedding_cache.dimension));
    let clock = Arc::new(SystemClock);
    let system = MemorySystem::open(config, persistent, embedder, clock).await?;

    system
        .save(
            "We migrated the embedded cache from sled to redb for crash safety.".to_string(),
            Some(["storage".to_string()].into()),
            Some(0.8),
            Some("infra".to_string()),
            None,
            None,
            false,
        )
        .await?;
    system
        .save(
            "The on-call rotation moves to a weekly cadence starting next sprint.".to_string(),
            Some(["process".to_string()].into()),
            Some(0.4),
            Some("infra".to_string()),
            None,
            None,
            false,
        )
        .await?;

    let results = system.search("redb crash safety", Some(5), Some("infra")).await?;
    for result in &results {
        println!("{:.3} {} — {}", result.score, result.memory.id, result.memory.content);
    }

    Ok(())
}

//! Consolidates a short conversation transcript into persisted memories.
//!
//! Run with: `cargo run -p demos --example consolidate_session`

use std::sync::Arc;

use memory_core::clock::SystemClock;
use memory_core::consolidator::TranscriptMessage;
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

    let transcript = vec![
        TranscriptMessage { role: "user".into(), content: "how do we roll back a bad deploy?".into() },
        TranscriptMessage {
            role: "assistant".into(),
            content: "We decided to keep the last three release artifacts so a rollback is a single redeploy command."
                .into(),
        },
    ];

    let report = system.consolidate_session(&transcript, Some("infra"), Some("standup-2026-07-30")).await?;
    println!(
        "extracted {} saved {} deduped {} quality {:.2}",
        report.extracted_count, report.saved_count, report.deduped_count, report.session_quality
    );
    for memory in &report.saved_memories {
        println!("  saved: {} — {}", memory.id, memory.content);
    }

    Ok(())
}

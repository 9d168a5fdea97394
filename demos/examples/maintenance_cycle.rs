//! Saves a low-importance memory, fast-forwards the clock past the
//! nursery generation's age ceiling, then runs maintenance to show it
//! collected by generational GC.
//!
//! Run with: `cargo run -p demos --example maintenance_cycle`

use std::sync::Arc;

use chrono::Duration;
use memory_core::clock::{Clock, FixedClock};
use memory_core::system::MemorySystem;
use memory_storage_redb::RedbEmbeddingStore;
use test_utils::MockEmbedder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_utils::test_config(dir.path());

    let persistent = Arc::new(RedbEmbeddingStore::open(&dir.path().join("embeddings.redb")).await?);
    let embedder = Arc::new(MockEmbedder::new(config.embedding_cache.dimension));
    let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let system = MemorySystem::open(config, persistent, Arc::clone(&embedder), clock_dyn).await?;

    let memory = system
        .save(
            "reminder: renew the staging TLS cert".to_string(),
            None,
            Some(0.2),
            None,
            None,
            None,
            false,
        )
        .await?;
    println!("saved {} at importance 0.2", memory.id);

    clock.advance(Duration::days(10));

    let report = system.run_maintenance(false).await?;
    println!(
        "maintenance: archived {} reviews_overdue {} duration_ms {}",
        report.archived_count, report.health.reviews_overdue, report.duration_ms
    );

    match system.get(&memory.id).await {
        Ok(found) => println!("still active: {}", found.status),
        Err(err) => println!("lookup after GC: {err}"),
    }

    Ok(())
}

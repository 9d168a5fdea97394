//! Exercises every external operation of `MemorySystem` end to end:
//! save, get, list, search, archive, stats, maintenance, and session
//! consolidation, backed by a real redb embedding store and the
//! deterministic mock embedder.

use std::sync::Arc;

use memory_core::clock::SystemClock;
use memory_core::consolidator::TranscriptMessage;
use memory_core::error::Error;
use memory_core::memory::MemoryFilter;
use memory_core::system::MemorySystem;
use memory_storage_redb::RedbEmbeddingStore;
use test_utils::MockEmbedder;

async fn open_system(dir: &std::path::Path) -> MemorySystem<RedbEmbeddingStore, MockEmbedder> {
    let config = test_utils::test_config(dir);
    let persistent = Arc::new(RedbEmbeddingStore::open(&dir.join("embeddings.redb")).await.unwrap());
    let embedder = Arc::new(MockEmbedder::new(config.embedding_cache.dimension));
    let clock = Arc::new(SystemClock);
    MemorySystem::open(config, persistent, embedder, clock).await.unwrap()
}

#[tokio::test]
async fn save_search_archive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let system = open_system(dir.path()).await;

    let memory = system
        .save(
            "We switched the queue from RabbitMQ to SQS for lower ops overhead.".to_string(),
            Some(["infra".to_string()].into()),
            Some(0.7),
            Some("platform".to_string()),
            Some("sess-1".to_string()),
            None,
            true,
        )
        .await
        .unwrap();
    assert_eq!(memory.project_id, "platform");

    let fetched = system.get(&memory.id).await.unwrap();
    assert_eq!(fetched.content, memory.content);

    let listed = system.list(&MemoryFilter::all().with_project("platform"), false).await.unwrap();
    assert_eq!(listed.len(), 1);

    let results = system.search("queue SQS", Some(5), Some("platform")).await.unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].memory.id, memory.id);

    let stats = system.get_stats().await.unwrap();
    assert_eq!(stats.total, 1);

    let archived = system.archive(&memory.id, "superseded").await.unwrap();
    assert!(archived);

    let err = system.get(&memory.id).await;
    assert!(matches!(err, Err(Error::NotFound(_))));

    let still_findable = system.list(&MemoryFilter::all(), true).await.unwrap();
    assert_eq!(still_findable.len(), 1);
}

#[tokio::test]
async fn save_rejects_duplicate_when_checking_contradictions() {
    let dir = tempfile::tempdir().unwrap();
    let system = open_system(dir.path()).await;
    let content = "Deploys now require two approvals before merge.".to_string();

    system.save(content.clone(), None, None, None, None, None, true).await.unwrap();
    let second = system.save(content, None, None, None, None, None, true).await;
    assert!(matches!(second, Err(Error::DuplicateRejected(_))));
}

#[tokio::test]
async fn consolidate_session_persists_heuristic_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let system = open_system(dir.path()).await;

    let transcript = vec![
        TranscriptMessage { role: "user".into(), content: "what's our release cadence?".into() },
        TranscriptMessage {
            role: "assistant".into(),
            content: "We ship every other Tuesday unless a release is held for a security fix.".into(),
        },
    ];
    let report = system.consolidate_session(&transcript, Some("platform"), Some("sess-2")).await.unwrap();
    assert_eq!(report.saved_count, 1);

    let stats = system.get_stats().await.unwrap();
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn maintenance_dry_run_does_not_mutate_state() {
    let dir = tempfile::tempdir().unwrap();
    let system = open_system(dir.path()).await;
    system.save("low importance note".to_string(), None, Some(0.1), None, None, None, false).await.unwrap();

    let report = system.run_maintenance(true).await.unwrap();
    assert_eq!(report.archived_count, 0);

    let stats = system.get_stats().await.unwrap();
    assert_eq!(stats.total, 1);
}

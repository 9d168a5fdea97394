//! Confirms a `TursoStore` snapshot survives closing and reopening the
//! same database file, the scenario the snapshot/reload seam exists for.

use memory_core::dedup::{ContentHash, DedupEvent, DedupLevel};
use memory_core::graph::{RelationshipEdge, RelationshipType};
use memory_core::refcount::RefType;
use memory_storage_turso::TursoStore;

#[tokio::test]
async fn edges_and_reference_counts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    {
        let store = TursoStore::open(&db_path).await.unwrap();
        store
            .save_edges(&[RelationshipEdge {
                from_id: "m1".into(),
                to_id: "m2".into(),
                relationship_type: RelationshipType::LedTo,
                strength: 0.8,
                valid_from: None,
                valid_to: None,
                auto_detected: false,
            }])
            .await
            .unwrap();
        store.save_reference_counts(&[("m2".to_string(), RefType::Relationship, 1)]).await.unwrap();
        store
            .save_content_hash(
                "m1",
                &ContentHash { exact: "exact-hash".into(), normalized: "norm-hash".into(), semantic: None },
            )
            .await
            .unwrap();
        store
            .append_dedup_event(&DedupEvent {
                existing_id: "m1".into(),
                level: DedupLevel::Exact,
                confidence: 1.0,
                recorded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
    }

    let reopened = TursoStore::open(&db_path).await.unwrap();
    let edges = reopened.load_edges().await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].from_id, "m1");

    let counts = reopened.load_reference_counts().await.unwrap();
    assert_eq!(counts, vec![("m2".to_string(), RefType::Relationship, 1)]);

    let hashes = reopened.load_content_hashes().await.unwrap();
    assert_eq!(hashes.len(), 1);

    let dedup_events = reopened.load_dedup_events().await.unwrap();
    assert_eq!(dedup_events.len(), 1);
}

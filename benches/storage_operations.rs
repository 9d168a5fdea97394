//! Benchmarks the raw persistence seam: saving and loading edges and
//! content hashes through `TursoStore`, independent of the in-memory
//! `MemorySystem` façade.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use memory_core::dedup::ContentHash;
use memory_core::graph::{RelationshipEdge, RelationshipType};
use memory_storage_turso::TursoStore;
use memory_benches::TokioExecutor;

fn edge(i: usize) -> RelationshipEdge {
    RelationshipEdge {
        from_id: format!("m{i}"),
        to_id: format!("m{}", i + 1),
        relationship_type: RelationshipType::LedTo,
        strength: 0.5,
        valid_from: None,
        valid_to: None,
        auto_detected: true,
    }
}

fn bench_save_edges(c: &mut Criterion) {
    c.bench_function("turso_save_edges_100", |b| {
        b.to_async(TokioExecutor).iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let edges: Vec<_> = (0..100).map(edge).collect();
                (dir, edges)
            },
            |(dir, edges)| async move {
                let store = TursoStore::open(&dir.path().join("bench.db")).await.unwrap();
                store.save_edges(&edges).await.unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_load_edges(c: &mut Criterion) {
    c.bench_function("turso_load_edges_100", |b| {
        b.to_async(TokioExecutor).iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let edges: Vec<_> = (0..100).map(edge).collect();
                let rt = tokio::runtime::Runtime::new().unwrap();
                let store = rt.block_on(async {
                    let store = TursoStore::open(&dir.path().join("bench.db")).await.unwrap();
                    store.save_edges(&edges).await.unwrap();
                    store
                });
                (dir, store)
            },
            |(dir, store)| async move {
                let _ = dir;
                store.load_edges().await.unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_save_content_hash(c: &mut Criterion) {
    c.bench_function("turso_save_content_hash", |b| {
        b.to_async(TokioExecutor).iter_batched(
            || tempfile::tempdir().unwrap(),
            |dir| async move {
                let store = TursoStore::open(&dir.path().join("bench.db")).await.unwrap();
                let hash = ContentHash {
                    exact: "exact-hash".into(),
                    normalized: "norm-hash".into(),
                    semantic: Some("semantic-bucket".into()),
                };
                store.save_content_hash("m1", &hash).await.unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_save_edges, bench_load_edges, bench_save_content_hash);
criterion_main!(benches);

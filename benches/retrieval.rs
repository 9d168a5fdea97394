//! Benchmarks hybrid retrieval: saving a corpus of memories, then
//! running searches against it, through the full `MemorySystem` façade
//! (embedding lookup, search cache, ranking).

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use memory_benches::benchmark_helpers::{generate_memory_content, setup_system};
use memory_benches::TokioExecutor;

const CORPUS_SIZE: usize = 50;

fn bench_search_cold(c: &mut Criterion) {
    c.bench_function("search_cold_50_memories", |b| {
        b.to_async(TokioExecutor).iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let system = setup_system(&dir).await;
                    for i in 0..CORPUS_SIZE {
                        system
                            .save(generate_memory_content(i), None, None, None, None, None, false)
                            .await
                            .unwrap();
                    }
                    (dir, system)
                })
            },
            |(dir, system)| async move {
                let _ = dir;
                system.search("deploy pipeline canary", Some(10), None).await.unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_search_warm_cache(c: &mut Criterion) {
    c.bench_function("search_warm_cache_50_memories", |b| {
        b.to_async(TokioExecutor).iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let system = setup_system(&dir).await;
                    for i in 0..CORPUS_SIZE {
                        system
                            .save(generate_memory_content(i), None, None, None, None, None, false)
                            .await
                            .unwrap();
                    }
                    system.search("deploy pipeline canary", Some(10), None).await.unwrap();
                    (dir, system)
                })
            },
            |(dir, system)| async move {
                let _ = dir;
                system.search("deploy pipeline canary", Some(10), None).await.unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_search_cold, bench_search_warm_cache);
criterion_main!(benches);

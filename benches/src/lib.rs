//! Benchmark suite for the personal memory store.

pub mod benchmark_helpers;

use criterion::async_executor::AsyncExecutor;
use std::future::Future;

/// Tokio-based executor for Criterion benchmarks.
///
/// Unlike `FuturesExecutor`, this provides a full tokio runtime, needed
/// when benchmarked code uses `tokio::spawn` or other runtime features.
pub struct TokioExecutor;

impl AsyncExecutor for TokioExecutor {
    fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
            .block_on(future)
    }
}

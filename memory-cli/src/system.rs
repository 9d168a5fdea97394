//! Builds the concrete [`MemorySystem`] this CLI exercises.
//!
//! No real embedding model ships in this workspace, so the CLI is wired
//! to [`test_utils::MockEmbedder`] — deterministic, offline, and
//! sufficient for keyword-weighted search and manual exercising. A
//! caller that wants a real model swaps this module out for one that
//! wires a network-backed `Embedder` instead.

use std::path::Path;
use std::sync::Arc;

use memory_core::clock::SystemClock;
use memory_core::config::MemoryConfig;
use memory_core::system::MemorySystem;
use memory_storage_redb::RedbEmbeddingStore;
use test_utils::MockEmbedder;

/// The concrete [`MemorySystem`] instantiation this CLI drives.
pub type CliMemorySystem = MemorySystem<RedbEmbeddingStore, MockEmbedder>;

/// Loads configuration (from `config_path`, falling back to defaults)
/// and opens a [`CliMemorySystem`] rooted at its `store_root`.
///
/// # Errors
///
/// Returns an error if the config file cannot be parsed, the store root
/// cannot be created, or the embedding store cannot be opened.
pub async fn open(config_path: Option<&Path>) -> anyhow::Result<CliMemorySystem> {
    let config = match config_path {
        Some(path) => MemoryConfig::load(path)?,
        None => MemoryConfig::default(),
    };

    std::fs::create_dir_all(&config.store_root)?;
    let embeddings_path = config.store_root.join("embeddings.redb");
    let persistent = Arc::new(RedbEmbeddingStore::open(&embeddings_path).await?);
    let embedder = Arc::new(MockEmbedder::new(config.embedding_cache.dimension));
    let clock = Arc::new(SystemClock);

    Ok(MemorySystem::open(config, persistent, embedder, clock).await?)
}

//! # Memory Storage - redb
//!
//! The durable tier of the Embedding Cache (component C): a redb-backed
//! implementation of [`memory_core::embeddings::EmbeddingPersistentStore`].
//!
//! redb was the teacher's cache-layer choice for exactly this shape of
//! problem — small, frequently-read binary blobs keyed by a short string —
//! so it stays narrowed to that one table rather than growing back into a
//! general-purpose store. Every other durable concern (memory records,
//! relationships, access logs, and so on) lives in `memory-storage-turso`.
//!
//! ```no_run
//! use memory_storage_redb::RedbEmbeddingStore;
//! use std::path::Path;
//!
//! # async fn example() -> memory_core::error::Result<()> {
//! let store = RedbEmbeddingStore::open(Path::new("./embeddings.redb")).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memory_core::embeddings::{EmbeddingPersistentStore, EmbeddingRecord};
use memory_core::error::{Error, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const EMBEDDINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("embeddings");

/// Maximum size of a single serialized embedding record (1MB).
///
/// Typical embedding dimensions (384-1536) * 4 bytes/f32 land well under
/// this; the limit exists to bound deserialization cost against a
/// corrupted or maliciously large payload.
pub const MAX_EMBEDDING_RECORD_SIZE: u64 = 1_000_000;

const DB_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

async fn with_db_timeout<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(DB_OPERATION_TIMEOUT, tokio::task::spawn_blocking(operation)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::Store(format!("task join error: {join_err}"))),
        Err(_) => Err(Error::Store(format!(
            "redb operation timed out after {DB_OPERATION_TIMEOUT:?}"
        ))),
    }
}

/// On-disk shape of an [`EmbeddingRecord`]. `EmbeddingRecord` itself does
/// not derive `Serialize`/`Deserialize` (it is an in-process value type),
/// so this mirrors its fields for postcard encoding.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEmbeddingRecord {
    vector: Vec<f32>,
    model_name: String,
    created_at: DateTime<Utc>,
    accessed_at: DateTime<Utc>,
}

impl From<EmbeddingRecord> for StoredEmbeddingRecord {
    fn from(record: EmbeddingRecord) -> Self {
        Self {
            vector: record.vector,
            model_name: record.model_name,
            created_at: record.created_at,
            accessed_at: record.accessed_at,
        }
    }
}

impl From<StoredEmbeddingRecord> for EmbeddingRecord {
    fn from(stored: StoredEmbeddingRecord) -> Self {
        Self {
            vector: stored.vector,
            model_name: stored.model_name,
            created_at: stored.created_at,
            accessed_at: stored.accessed_at,
        }
    }
}

/// The durable tier backing the Embedding Cache, implemented over a
/// single redb table keyed by content hash.
pub struct RedbEmbeddingStore {
    db: Arc<Database>,
}

impl RedbEmbeddingStore {
    /// Opens (creating if absent) a redb database at `path` and ensures
    /// the embeddings table exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database cannot be created/opened
    /// or the table cannot be initialized.
    pub async fn open(path: &Path) -> Result<Self> {
        let path_buf: PathBuf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf).map_err(|e| Error::Store(format!("opening redb database: {e}")))
        })
        .await?;
        let db = Arc::new(db);

        let init_db = Arc::clone(&db);
        with_db_timeout(move || {
            let write_txn = init_db
                .begin_write()
                .map_err(|e| Error::Store(format!("beginning write transaction: {e}")))?;
            {
                let _table = write_txn
                    .open_table(EMBEDDINGS_TABLE)
                    .map_err(|e| Error::Store(format!("opening embeddings table: {e}")))?;
            }
            write_txn.commit().map_err(|e| Error::Store(format!("committing transaction: {e}")))?;
            Ok(())
        })
        .await?;

        Ok(Self { db })
    }

    /// How many embeddings are currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on a redb failure.
    pub async fn len(&self) -> Result<usize> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let read_txn = db.begin_read().map_err(|e| Error::Store(format!("beginning read transaction: {e}")))?;
            let table = read_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(|e| Error::Store(format!("opening embeddings table: {e}")))?;
            let len = table.len().map_err(|e| Error::Store(format!("reading table length: {e}")))?;
            Ok(len as usize)
        })
        .await
    }

    /// Whether the store currently holds no embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on a redb failure.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl EmbeddingPersistentStore for RedbEmbeddingStore {
    async fn get(&self, hash: &str) -> Result<Option<EmbeddingRecord>> {
        let db = Arc::clone(&self.db);
        let hash = hash.to_string();

        with_db_timeout(move || {
            let read_txn = db.begin_read().map_err(|e| Error::Store(format!("beginning read transaction: {e}")))?;
            let table = read_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(|e| Error::Store(format!("opening embeddings table: {e}")))?;

            match table.get(hash.as_str()).map_err(|e| Error::Store(format!("reading {hash}: {e}")))? {
                Some(bytes) => {
                    let payload = bytes.value();
                    if payload.len() as u64 > MAX_EMBEDDING_RECORD_SIZE {
                        warn!(hash = %hash, size = payload.len(), "embedding record exceeds size limit, refusing to deserialize");
                        return Err(Error::CorruptRecord {
                            id: hash.clone(),
                            reason: "embedding record exceeds maximum size".to_string(),
                        });
                    }
                    let stored: StoredEmbeddingRecord = postcard::from_bytes(payload)
                        .map_err(|e| Error::CorruptRecord { id: hash.clone(), reason: e.to_string() })?;
                    Ok(Some(stored.into()))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn put(&self, hash: &str, record: EmbeddingRecord) -> Result<()> {
        let db = Arc::clone(&self.db);
        let hash = hash.to_string();
        let stored = StoredEmbeddingRecord::from(record);
        let bytes = postcard::to_allocvec(&stored).map_err(|e| Error::Store(format!("serializing embedding: {e}")))?;

        debug!(hash = %hash, bytes = bytes.len(), "persisting embedding");
        with_db_timeout(move || {
            let write_txn = db.begin_write().map_err(|e| Error::Store(format!("beginning write transaction: {e}")))?;
            {
                let mut table = write_txn
                    .open_table(EMBEDDINGS_TABLE)
                    .map_err(|e| Error::Store(format!("opening embeddings table: {e}")))?;
                table
                    .insert(hash.as_str(), bytes.as_slice())
                    .map_err(|e| Error::Store(format!("inserting {hash}: {e}")))?;
            }
            write_txn.commit().map_err(|e| Error::Store(format!("committing transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn touch(&self, hash: &str, accessed_at: DateTime<Utc>) -> Result<()> {
        let Some(mut record) = self.get(hash).await? else {
            return Ok(());
        };
        record.accessed_at = accessed_at;
        self.put(hash, record).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let db = Arc::clone(&self.db);

        with_db_timeout(move || {
            let write_txn = db.begin_write().map_err(|e| Error::Store(format!("beginning write transaction: {e}")))?;
            let mut removed = 0usize;
            {
                let mut table = write_txn
                    .open_table(EMBEDDINGS_TABLE)
                    .map_err(|e| Error::Store(format!("opening embeddings table: {e}")))?;

                let stale_keys: Vec<String> = table
                    .iter()
                    .map_err(|e| Error::Store(format!("iterating embeddings table: {e}")))?
                    .filter_map(|entry| {
                        let (key, value) = entry.ok()?;
                        let stored: StoredEmbeddingRecord = postcard::from_bytes(value.value()).ok()?;
                        (stored.accessed_at < cutoff).then(|| key.value().to_string())
                    })
                    .collect();

                for key in &stale_keys {
                    table.remove(key.as_str()).map_err(|e| Error::Store(format!("removing {key}: {e}")))?;
                    removed += 1;
                }
            }
            write_txn.commit().map_err(|e| Error::Store(format!("committing transaction: {e}")))?;
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(vector: Vec<f32>, accessed_at: DateTime<Utc>) -> EmbeddingRecord {
        EmbeddingRecord {
            vector,
            model_name: "test-model".to_string(),
            created_at: accessed_at,
            accessed_at,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = RedbEmbeddingStore::open(&dir.path().join("embeddings.redb")).await.unwrap();
        let now = Utc::now();

        store.put("hash-a", record(vec![0.1, 0.2, 0.3], now)).await.unwrap();
        let fetched = store.get("hash-a").await.unwrap().unwrap();
        assert_eq!(fetched.vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(fetched.model_name, "test-model");
    }

    #[tokio::test]
    async fn get_missing_hash_is_none() {
        let dir = tempdir().unwrap();
        let store = RedbEmbeddingStore::open(&dir.path().join("embeddings.redb")).await.unwrap();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_updates_accessed_at_without_changing_vector() {
        let dir = tempdir().unwrap();
        let store = RedbEmbeddingStore::open(&dir.path().join("embeddings.redb")).await.unwrap();
        let created = Utc::now();
        store.put("hash-a", record(vec![1.0], created)).await.unwrap();

        let later = created + chrono::Duration::days(1);
        store.touch("hash-a", later).await.unwrap();

        let fetched = store.get("hash-a").await.unwrap().unwrap();
        assert_eq!(fetched.vector, vec![1.0]);
        assert_eq!(fetched.accessed_at, later);
    }

    #[tokio::test]
    async fn delete_older_than_removes_only_stale_entries() {
        let dir = tempdir().unwrap();
        let store = RedbEmbeddingStore::open(&dir.path().join("embeddings.redb")).await.unwrap();
        let old = Utc::now() - chrono::Duration::days(100);
        let fresh = Utc::now();

        store.put("stale", record(vec![1.0], old)).await.unwrap();
        store.put("fresh", record(vec![2.0], fresh)).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(90);
        let removed = store.delete_older_than(cutoff).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.get("stale").await.unwrap().is_none());
        assert!(store.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn len_and_is_empty_track_inserts() {
        let dir = tempdir().unwrap();
        let store = RedbEmbeddingStore::open(&dir.path().join("embeddings.redb")).await.unwrap();
        assert!(store.is_empty().await.unwrap());

        store.put("hash-a", record(vec![1.0], Utc::now())).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(!store.is_empty().await.unwrap());
    }
}

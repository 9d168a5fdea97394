//! Turso/libSQL-backed durable tier for the auxiliary relational tables
//! named in spec §6: content hashes, dedup events, the relationship
//! graph, PageRank results, the access log, generation tracking, GC
//! events, review schedules, reference counts, the search cache,
//! circuit breaker state, emotional tags, and extracted entities.
//!
//! `memory-core`'s components each hold their working set in process
//! memory and expose a snapshot/reload seam (`all_*`/`load_*` pairs).
//! This crate is the other half of that seam: it persists a snapshot to
//! a local `libsql` database file and reloads it on startup, the same
//! narrow job `memory-storage-redb` does for the embedding cache's
//! durable tier.
//!
//! ```no_run
//! use memory_storage_turso::TursoStore;
//!
//! # async fn example() -> memory_core::error::Result<()> {
//! let store = TursoStore::open("./memory.db").await?;
//! store.save_edges(&[]).await?;
//! # Ok(())
//! # }
//! ```

mod schema;

use chrono::{DateTime, Utc};
use libsql::params;
use memory_core::access_log::{AccessEvent, AccessType};
use memory_core::circuit_breaker::{CircuitState, PersistedState};
use memory_core::dedup::{ContentHash, DedupEvent, DedupLevel};
use memory_core::emotional::EmotionalTag;
use memory_core::entities::{EntityKind, ExtractedEntity};
use memory_core::error::{Error, Result};
use memory_core::gc::{GcEvent, Generation, GenerationEntry};
use memory_core::graph::{PageRankRecord, RelationshipEdge, RelationshipType};
use memory_core::refcount::RefType;
use memory_core::reinforcement::{Grade, ReviewSchedule};
use memory_core::retrieval::SearchCacheEntry;
use std::str::FromStr;

fn store_err(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Store(format!("{context}: {err}"))
}

fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn from_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| store_err("parsing timestamp", e))
}

/// A `libsql`-backed handle to the auxiliary relational database.
///
/// `libsql::Connection` is cheap to clone and safe to use concurrently
/// (each statement is prepared independently), so this type holds one
/// and clones it per call rather than serializing access behind a lock.
pub struct TursoStore {
    db: libsql::Database,
}

impl TursoStore {
    /// Opens (creating if absent) a local `libsql` database at `path`
    /// and ensures every table this crate persists exists.
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let db = libsql::Builder::new_local(path.as_ref())
            .build()
            .await
            .map_err(|e| store_err("opening database", e))?;
        let store = Self { db };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Wraps an already-open `libsql::Database`, e.g. a shared in-memory
    /// instance used across tests.
    #[must_use]
    pub fn from_database(db: libsql::Database) -> Self {
        Self { db }
    }

    async fn conn(&self) -> Result<libsql::Connection> {
        self.db.connect().map_err(|e| store_err("connecting", e))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn().await?;
        for statement in schema::CREATE_TABLES {
            conn.execute(statement, ())
                .await
                .map_err(|e| store_err("creating schema", e))?;
        }
        Ok(())
    }

    // ---- content hashes / dedup events (component B) ----

    /// Replaces the persisted hash row for `memory_id`.
    pub async fn save_content_hash(&self, memory_id: &str, hash: &ContentHash) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO content_hashes (memory_id, exact_hash, normalized_hash, semantic_hash)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(memory_id) DO UPDATE SET
                exact_hash = excluded.exact_hash,
                normalized_hash = excluded.normalized_hash,
                semantic_hash = excluded.semantic_hash",
            params![
                memory_id.to_string(),
                hash.exact.clone(),
                hash.normalized.clone(),
                hash.semantic.clone(),
            ],
        )
        .await
        .map_err(|e| store_err("saving content hash", e))?;
        Ok(())
    }

    /// Loads every persisted `(memory_id, ContentHash)` pair.
    pub async fn load_content_hashes(&self) -> Result<Vec<(String, ContentHash)>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, exact_hash, normalized_hash, semantic_hash FROM content_hashes",
                (),
            )
            .await
            .map_err(|e| store_err("loading content hashes", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let exact: String = row.get(1).map_err(|e| store_err("reading column", e))?;
            let normalized: String = row.get(2).map_err(|e| store_err("reading column", e))?;
            let semantic: Option<String> = row.get(3).map_err(|e| store_err("reading column", e))?;
            out.push((
                memory_id,
                ContentHash {
                    exact,
                    normalized,
                    semantic,
                },
            ));
        }
        Ok(out)
    }

    /// Appends a dedup classification event.
    pub async fn append_dedup_event(&self, event: &DedupEvent) -> Result<()> {
        let conn = self.conn().await?;
        let level = match event.level {
            DedupLevel::Exact => "exact",
            DedupLevel::Normalized => "normalized",
            DedupLevel::Semantic => "semantic",
        };
        conn.execute(
            "INSERT INTO dedup_events (existing_id, level, confidence, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.existing_id.clone(),
                level.to_string(),
                event.confidence,
                to_rfc3339(event.recorded_at),
            ],
        )
        .await
        .map_err(|e| store_err("appending dedup event", e))?;
        Ok(())
    }

    /// Loads every persisted dedup event, oldest first.
    pub async fn load_dedup_events(&self) -> Result<Vec<DedupEvent>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT existing_id, level, confidence, recorded_at FROM dedup_events ORDER BY id",
                (),
            )
            .await
            .map_err(|e| store_err("loading dedup events", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let existing_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let level_str: String = row.get(1).map_err(|e| store_err("reading column", e))?;
            let confidence: f64 = row.get(2).map_err(|e| store_err("reading column", e))?;
            let recorded_at: String = row.get(3).map_err(|e| store_err("reading column", e))?;
            let level = match level_str.as_str() {
                "exact" => DedupLevel::Exact,
                "normalized" => DedupLevel::Normalized,
                _ => DedupLevel::Semantic,
            };
            out.push(DedupEvent {
                existing_id,
                level,
                confidence,
                recorded_at: from_rfc3339(&recorded_at)?,
            });
        }
        Ok(out)
    }

    // ---- relationship graph (component E) ----

    /// Upserts every edge in `edges`, keyed by `(from_id, to_id, type)`.
    pub async fn save_edges(&self, edges: &[RelationshipEdge]) -> Result<()> {
        let conn = self.conn().await?;
        for edge in edges {
            conn.execute(
                "INSERT INTO memory_relationships
                    (from_id, to_id, relationship_type, strength, valid_from, valid_to, auto_detected)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(from_id, to_id, relationship_type) DO UPDATE SET
                    strength = excluded.strength,
                    valid_from = excluded.valid_from,
                    valid_to = excluded.valid_to,
                    auto_detected = excluded.auto_detected",
                params![
                    edge.from_id.clone(),
                    edge.to_id.clone(),
                    edge.relationship_type.to_string(),
                    edge.strength,
                    edge.valid_from.map(to_rfc3339),
                    edge.valid_to.map(to_rfc3339),
                    i64::from(edge.auto_detected),
                ],
            )
            .await
            .map_err(|e| store_err("saving edge", e))?;
        }
        Ok(())
    }

    /// Loads every persisted relationship edge.
    pub async fn load_edges(&self) -> Result<Vec<RelationshipEdge>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT from_id, to_id, relationship_type, strength, valid_from, valid_to, auto_detected
                 FROM memory_relationships",
                (),
            )
            .await
            .map_err(|e| store_err("loading edges", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let from_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let to_id: String = row.get(1).map_err(|e| store_err("reading column", e))?;
            let rel_type: String = row.get(2).map_err(|e| store_err("reading column", e))?;
            let strength: f64 = row.get(3).map_err(|e| store_err("reading column", e))?;
            let valid_from: Option<String> = row.get(4).map_err(|e| store_err("reading column", e))?;
            let valid_to: Option<String> = row.get(5).map_err(|e| store_err("reading column", e))?;
            let auto_detected: i64 = row.get(6).map_err(|e| store_err("reading column", e))?;
            out.push(RelationshipEdge {
                from_id,
                to_id,
                relationship_type: RelationshipType::from_str(&rel_type)
                    .map_err(|e| store_err("parsing relationship type", e))?,
                strength,
                valid_from: valid_from.map(|s| from_rfc3339(&s)).transpose()?,
                valid_to: valid_to.map(|s| from_rfc3339(&s)).transpose()?,
                auto_detected: auto_detected != 0,
            });
        }
        Ok(out)
    }

    // ---- PageRank (component E) ----

    /// Replaces the persisted PageRank table with `rows`.
    pub async fn save_pagerank(&self, rows: &[PageRankRecord]) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute("DELETE FROM memory_pagerank", ())
            .await
            .map_err(|e| store_err("clearing pagerank", e))?;
        for row in rows {
            conn.execute(
                "INSERT INTO memory_pagerank (memory_id, score, in_degree, out_degree, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.memory_id.clone(),
                    row.score,
                    row.in_degree as i64,
                    row.out_degree as i64,
                    to_rfc3339(row.computed_at),
                ],
            )
            .await
            .map_err(|e| store_err("saving pagerank row", e))?;
        }
        Ok(())
    }

    /// Loads the persisted PageRank table.
    pub async fn load_pagerank(&self) -> Result<Vec<PageRankRecord>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, score, in_degree, out_degree, computed_at FROM memory_pagerank",
                (),
            )
            .await
            .map_err(|e| store_err("loading pagerank", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let score: f64 = row.get(1).map_err(|e| store_err("reading column", e))?;
            let in_degree: i64 = row.get(2).map_err(|e| store_err("reading column", e))?;
            let out_degree: i64 = row.get(3).map_err(|e| store_err("reading column", e))?;
            let computed_at: String = row.get(4).map_err(|e| store_err("reading column", e))?;
            out.push(PageRankRecord {
                memory_id,
                score,
                in_degree: in_degree as usize,
                out_degree: out_degree as usize,
                computed_at: from_rfc3339(&computed_at)?,
            });
        }
        Ok(out)
    }

    // ---- access log (component F) ----

    /// Appends one access event.
    pub async fn append_access_event(&self, event: &AccessEvent) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO memory_access_log
                (memory_id, access_type, timestamp, query_context, session_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.memory_id.clone(),
                event.access_type.to_string(),
                to_rfc3339(event.timestamp),
                event.query_context.clone(),
                event.session_id.clone(),
            ],
        )
        .await
        .map_err(|e| store_err("appending access event", e))?;
        Ok(())
    }

    /// Loads every persisted access event, oldest first.
    pub async fn load_access_events(&self) -> Result<Vec<AccessEvent>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, access_type, timestamp, query_context, session_id
                 FROM memory_access_log ORDER BY id",
                (),
            )
            .await
            .map_err(|e| store_err("loading access log", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let access_type: String = row.get(1).map_err(|e| store_err("reading column", e))?;
            let timestamp: String = row.get(2).map_err(|e| store_err("reading column", e))?;
            let query_context: Option<String> = row.get(3).map_err(|e| store_err("reading column", e))?;
            let session_id: Option<String> = row.get(4).map_err(|e| store_err("reading column", e))?;
            out.push(AccessEvent {
                memory_id,
                access_type: parse_access_type(&access_type)?,
                timestamp: from_rfc3339(&timestamp)?,
                query_context,
                session_id,
            });
        }
        Ok(out)
    }

    // ---- generations / GC (component H) ----

    /// Upserts one generation tracker entry.
    pub async fn save_generation_entry(&self, entry: &GenerationEntry) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO memory_generations
                (memory_id, generation, promoted_at, collection_survived_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(memory_id) DO UPDATE SET
                generation = excluded.generation,
                promoted_at = excluded.promoted_at,
                collection_survived_count = excluded.collection_survived_count",
            params![
                entry.memory_id.clone(),
                generation_to_i64(entry.generation),
                entry.promoted_at.map(to_rfc3339),
                entry.collection_survived_count as i64,
                to_rfc3339(entry.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("saving generation entry", e))?;
        Ok(())
    }

    /// Loads every tracked generation entry.
    pub async fn load_generation_entries(&self) -> Result<Vec<GenerationEntry>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, generation, promoted_at, collection_survived_count, created_at
                 FROM memory_generations",
                (),
            )
            .await
            .map_err(|e| store_err("loading generations", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let generation: i64 = row.get(1).map_err(|e| store_err("reading column", e))?;
            let promoted_at: Option<String> = row.get(2).map_err(|e| store_err("reading column", e))?;
            let survived: i64 = row.get(3).map_err(|e| store_err("reading column", e))?;
            let created_at: String = row.get(4).map_err(|e| store_err("reading column", e))?;
            out.push(GenerationEntry {
                memory_id,
                generation: generation_from_i64(generation),
                promoted_at: promoted_at.map(|s| from_rfc3339(&s)).transpose()?,
                collection_survived_count: survived as u64,
                created_at: from_rfc3339(&created_at)?,
            });
        }
        Ok(out)
    }

    /// Appends one GC collection-pass event.
    pub async fn append_gc_event(&self, event: &GcEvent) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO gc_events
                (generation, collected_count, promoted_count, total_in_generation, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                generation_to_i64(event.generation),
                event.collected_count as i64,
                event.promoted_count as i64,
                event.total_in_generation as i64,
                to_rfc3339(event.timestamp),
            ],
        )
        .await
        .map_err(|e| store_err("appending gc event", e))?;
        Ok(())
    }

    // ---- reinforcement scheduler (component I) ----

    /// Upserts one review schedule row.
    pub async fn save_review_schedule(&self, schedule: &ReviewSchedule) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO review_schedule
                (memory_id, interval_days, last_reviewed, due_at, review_count, is_flashbulb)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(memory_id) DO UPDATE SET
                interval_days = excluded.interval_days,
                last_reviewed = excluded.last_reviewed,
                due_at = excluded.due_at,
                review_count = excluded.review_count,
                is_flashbulb = excluded.is_flashbulb",
            params![
                schedule.memory_id.clone(),
                schedule.interval_days,
                schedule.last_reviewed.map(to_rfc3339),
                to_rfc3339(schedule.due_at),
                schedule.review_count as i64,
                i64::from(schedule.is_flashbulb),
            ],
        )
        .await
        .map_err(|e| store_err("saving review schedule", e))?;
        Ok(())
    }

    /// Loads every persisted review schedule.
    pub async fn load_review_schedules(&self) -> Result<Vec<ReviewSchedule>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, interval_days, last_reviewed, due_at, review_count, is_flashbulb
                 FROM review_schedule",
                (),
            )
            .await
            .map_err(|e| store_err("loading review schedules", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let interval_days: f64 = row.get(1).map_err(|e| store_err("reading column", e))?;
            let last_reviewed: Option<String> = row.get(2).map_err(|e| store_err("reading column", e))?;
            let due_at: String = row.get(3).map_err(|e| store_err("reading column", e))?;
            let review_count: i64 = row.get(4).map_err(|e| store_err("reading column", e))?;
            let is_flashbulb: i64 = row.get(5).map_err(|e| store_err("reading column", e))?;
            out.push(ReviewSchedule {
                memory_id,
                interval_days,
                last_reviewed: last_reviewed.map(|s| from_rfc3339(&s)).transpose()?,
                due_at: from_rfc3339(&due_at)?,
                review_count: review_count as u64,
                is_flashbulb: is_flashbulb != 0,
            });
        }
        Ok(out)
    }

    /// Appends one review-history row (grade, when).
    pub async fn append_review_history(
        &self,
        memory_id: &str,
        grade: Grade,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn().await?;
        let grade_str = match grade {
            Grade::Fail => "fail",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        };
        conn.execute(
            "INSERT INTO review_history (memory_id, grade, reviewed_at) VALUES (?1, ?2, ?3)",
            params![memory_id.to_string(), grade_str.to_string(), to_rfc3339(reviewed_at)],
        )
        .await
        .map_err(|e| store_err("appending review history", e))?;
        Ok(())
    }

    // ---- reference counter (component G) ----

    /// Replaces every persisted reference count with `rows`.
    pub async fn save_reference_counts(&self, rows: &[(String, RefType, u64)]) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute("DELETE FROM reference_counts", ())
            .await
            .map_err(|e| store_err("clearing reference counts", e))?;
        for (memory_id, ref_type, count) in rows {
            conn.execute(
                "INSERT INTO reference_counts (memory_id, ref_type, count) VALUES (?1, ?2, ?3)",
                params![memory_id.clone(), ref_type.to_string(), *count as i64],
            )
            .await
            .map_err(|e| store_err("saving reference count", e))?;
        }
        Ok(())
    }

    /// Loads every persisted reference count.
    pub async fn load_reference_counts(&self) -> Result<Vec<(String, RefType, u64)>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query("SELECT memory_id, ref_type, count FROM reference_counts", ())
            .await
            .map_err(|e| store_err("loading reference counts", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let ref_type: String = row.get(1).map_err(|e| store_err("reading column", e))?;
            let count: i64 = row.get(2).map_err(|e| store_err("reading column", e))?;
            let ref_type = RefType::from_str(&ref_type).map_err(|e| store_err("parsing ref type", e))?;
            out.push((memory_id, ref_type, count as u64));
        }
        Ok(out)
    }

    // ---- search cache (component D) ----

    /// Upserts one search cache row, keyed by its query hash.
    pub async fn save_search_cache_entry(
        &self,
        query_hash: &str,
        project_id: Option<&str>,
        entry: &SearchCacheEntry,
    ) -> Result<()> {
        let conn = self.conn().await?;
        let result_ids = serde_json::to_string(&entry.result_ids)?;
        conn.execute(
            "INSERT INTO search_cache
                (query_hash, query, project_id, result_ids, hits, last_hit, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(query_hash) DO UPDATE SET
                result_ids = excluded.result_ids,
                hits = excluded.hits,
                last_hit = excluded.last_hit,
                expires_at = excluded.expires_at",
            params![
                query_hash.to_string(),
                entry.query.clone(),
                project_id.map(str::to_string),
                result_ids,
                entry.hits as i64,
                to_rfc3339(entry.last_hit),
                to_rfc3339(entry.created_at),
                to_rfc3339(entry.expires_at),
            ],
        )
        .await
        .map_err(|e| store_err("saving search cache entry", e))?;
        Ok(())
    }

    /// Loads every persisted search cache row, keyed by query hash.
    pub async fn load_search_cache_entries(&self) -> Result<Vec<(String, SearchCacheEntry)>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT query_hash, query, result_ids, hits, last_hit, created_at, expires_at
                 FROM search_cache",
                (),
            )
            .await
            .map_err(|e| store_err("loading search cache", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let query_hash: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let query: String = row.get(1).map_err(|e| store_err("reading column", e))?;
            let result_ids: String = row.get(2).map_err(|e| store_err("reading column", e))?;
            let hits: i64 = row.get(3).map_err(|e| store_err("reading column", e))?;
            let last_hit: String = row.get(4).map_err(|e| store_err("reading column", e))?;
            let created_at: String = row.get(5).map_err(|e| store_err("reading column", e))?;
            let expires_at: String = row.get(6).map_err(|e| store_err("reading column", e))?;
            out.push((
                query_hash,
                SearchCacheEntry {
                    query,
                    result_ids: serde_json::from_str(&result_ids)?,
                    hits: hits as u64,
                    last_hit: from_rfc3339(&last_hit)?,
                    created_at: from_rfc3339(&created_at)?,
                    expires_at: from_rfc3339(&expires_at)?,
                },
            ));
        }
        Ok(out)
    }

    // ---- circuit breaker (§5) ----

    /// Persists a circuit breaker's state so it survives restart.
    pub async fn save_circuit_breaker_state(&self, state: &PersistedState) -> Result<()> {
        let conn = self.conn().await?;
        let state_str = match state.state {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        conn.execute(
            "INSERT INTO circuit_breaker_state (name, state, consecutive_failures, opened_at_unix)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                state = excluded.state,
                consecutive_failures = excluded.consecutive_failures,
                opened_at_unix = excluded.opened_at_unix",
            params![
                state.name.clone(),
                state_str.to_string(),
                i64::from(state.consecutive_failures),
                state.opened_at_unix,
            ],
        )
        .await
        .map_err(|e| store_err("saving circuit breaker state", e))?;
        Ok(())
    }

    /// Loads a persisted circuit breaker state by name, if any.
    pub async fn load_circuit_breaker_state(&self, name: &str) -> Result<Option<PersistedState>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT name, state, consecutive_failures, opened_at_unix
                 FROM circuit_breaker_state WHERE name = ?1",
                params![name.to_string()],
            )
            .await
            .map_err(|e| store_err("loading circuit breaker state", e))?;
        let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? else {
            return Ok(None);
        };
        let name: String = row.get(0).map_err(|e| store_err("reading column", e))?;
        let state_str: String = row.get(1).map_err(|e| store_err("reading column", e))?;
        let consecutive_failures: i64 = row.get(2).map_err(|e| store_err("reading column", e))?;
        let opened_at_unix: Option<i64> = row.get(3).map_err(|e| store_err("reading column", e))?;
        let state = match state_str.as_str() {
            "open" => CircuitState::Open,
            "half_open" => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        };
        Ok(Some(PersistedState {
            name,
            state,
            consecutive_failures: consecutive_failures as u32,
            opened_at_unix,
        }))
    }

    // ---- emotional tags / entities (§3 supplements) ----

    /// Upserts one emotional tag.
    pub async fn save_emotional_tag(&self, tag: &EmotionalTag) -> Result<()> {
        let conn = self.conn().await?;
        let signals = serde_json::to_string(&tag.signals)?;
        conn.execute(
            "INSERT INTO emotional_tags (memory_id, valence, arousal, signals, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(memory_id) DO UPDATE SET
                valence = excluded.valence,
                arousal = excluded.arousal,
                signals = excluded.signals",
            params![
                tag.memory_id.clone(),
                tag.valence,
                tag.arousal,
                signals,
                to_rfc3339(tag.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("saving emotional tag", e))?;
        Ok(())
    }

    /// Loads every persisted emotional tag.
    pub async fn load_emotional_tags(&self) -> Result<Vec<EmotionalTag>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, valence, arousal, signals, created_at FROM emotional_tags",
                (),
            )
            .await
            .map_err(|e| store_err("loading emotional tags", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let valence: f64 = row.get(1).map_err(|e| store_err("reading column", e))?;
            let arousal: f64 = row.get(2).map_err(|e| store_err("reading column", e))?;
            let signals: String = row.get(3).map_err(|e| store_err("reading column", e))?;
            let created_at: String = row.get(4).map_err(|e| store_err("reading column", e))?;
            out.push(EmotionalTag {
                memory_id,
                valence,
                arousal,
                signals: serde_json::from_str(&signals)?,
                created_at: from_rfc3339(&created_at)?,
            });
        }
        Ok(out)
    }

    /// Persists every entity extracted from one memory, replacing any
    /// prior rows for that memory.
    pub async fn save_entities(&self, memory_id: &str, entities: &[ExtractedEntity]) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "DELETE FROM entities WHERE memory_id = ?1",
            params![memory_id.to_string()],
        )
        .await
        .map_err(|e| store_err("clearing entities", e))?;
        for entity in entities {
            conn.execute(
                "INSERT INTO entities (memory_id, entity_text, entity_kind, confidence)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entity.memory_id.clone(),
                    entity.entity_text.clone(),
                    entity.entity_kind.to_string(),
                    entity.confidence,
                ],
            )
            .await
            .map_err(|e| store_err("saving entity", e))?;
        }
        Ok(())
    }

    /// Loads every persisted extracted entity.
    pub async fn load_entities(&self) -> Result<Vec<ExtractedEntity>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, entity_text, entity_kind, confidence FROM entities",
                (),
            )
            .await
            .map_err(|e| store_err("loading entities", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("reading row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("reading column", e))?;
            let entity_text: String = row.get(1).map_err(|e| store_err("reading column", e))?;
            let entity_kind: String = row.get(2).map_err(|e| store_err("reading column", e))?;
            let confidence: f64 = row.get(3).map_err(|e| store_err("reading column", e))?;
            out.push(ExtractedEntity {
                memory_id,
                entity_text,
                entity_kind: parse_entity_kind(&entity_kind),
                confidence,
            });
        }
        Ok(out)
    }
}

fn parse_access_type(s: &str) -> Result<AccessType> {
    Ok(match s {
        "search" => AccessType::Search,
        "direct" => AccessType::Direct,
        "briefing" => AccessType::Briefing,
        "consolidation" => AccessType::Consolidation,
        "maintenance" => AccessType::Maintenance,
        "hook" => AccessType::Hook,
        "predicted" => AccessType::Predicted,
        other => return Err(store_err("parsing access type", format!("unknown {other:?}"))),
    })
}

fn parse_entity_kind(s: &str) -> EntityKind {
    match s {
        "person" => EntityKind::Person,
        "project" => EntityKind::Project,
        "tool" => EntityKind::Tool,
        "concept" => EntityKind::Concept,
        _ => EntityKind::Other,
    }
}

fn generation_to_i64(generation: Generation) -> i64 {
    match generation {
        Generation::Nursery => 0,
        Generation::Young => 1,
        Generation::Tenured => 2,
    }
}

fn generation_from_i64(value: i64) -> Generation {
    match value {
        0 => Generation::Nursery,
        1 => Generation::Young,
        _ => Generation::Tenured,
    }
}

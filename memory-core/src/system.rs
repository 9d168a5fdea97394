//! The `MemorySystem` façade: wires components A–J together behind the
//! seven operations external callers use.
//!
//! Everything here is orchestration. Each method reads like the
//! specification's External Interfaces section because it is: collect
//! facts from the components that own them, delegate the actual rule to
//! that component, and persist the result through the Memory Store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::access_log::{AccessEvent, AccessLog, AccessType};
use crate::clock::Clock;
use crate::config::MemoryConfig;
use crate::consolidator::{ConsolidationReport, SessionConsolidator, TranscriptMessage};
use crate::constants::defaults;
use crate::dedup::{ContentDedup, DedupOutcome};
use crate::embeddings::{EmbeddingCache, EmbeddingPersistentStore, Embedder};
use crate::emotional::{self, EmotionalTagStore};
use crate::entities::EntityStore;
use crate::error::{Error, Result};
use crate::gc::{collect_generation, GcCandidateFacts, Generation, GenerationTracker};
use crate::graph::{PageRankTracker, RelationshipGraph};
use crate::memory::{Memory, MemoryFilter, MemoryStore, Scope};
use crate::refcount::ReferenceCounter;
use crate::reinforcement::ReinforcementScheduler;
use crate::retrieval::{self, SearchCache};

/// One ranked search hit: the hydrated record, its combined score, and a
/// human-readable explanation of why it ranked where it did.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched memory.
    pub memory: Memory,
    /// The combined hybrid score that placed it at this rank.
    pub score: f64,
    /// A plain-language explanation of the match.
    pub explanation: String,
}

/// Aggregate statistics over the active store, as returned by
/// [`MemorySystem::get_stats`].
#[derive(Debug, Clone)]
pub struct MemoryStats {
    /// Total active memory count.
    pub total: usize,
    /// Mean importance across active memories.
    pub avg_importance: f64,
    /// Counts of active memories falling in the `low` (<0.5), `medium`
    /// (0.5..0.8), and `high` (>=0.8) confidence bands.
    pub confidence_distribution: BTreeMap<String, u64>,
    /// How many active memories carry each tag.
    pub tag_counts: BTreeMap<String, u64>,
    /// How many active memories belong to each project id.
    pub project_counts: BTreeMap<String, u64>,
    /// How many times each extracted entity appears across active
    /// memories, supplementary metadata alongside `tag_counts`.
    pub entity_counts: BTreeMap<String, u64>,
}

/// Component health snapshot taken during a maintenance run.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceHealth {
    /// How many reinforcement schedules are currently overdue.
    pub reviews_overdue: usize,
    /// How many expired search cache entries were swept.
    pub search_cache_entries_swept: usize,
    /// How many stale embedding cache entries were pruned.
    pub embedding_cache_entries_pruned: usize,
}

/// The result of one [`MemorySystem::run_maintenance`] pass.
#[derive(Debug, Clone)]
pub struct MaintenanceReport {
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the run, in milliseconds.
    pub duration_ms: u64,
    /// Reinforcement schedules found overdue during this run.
    pub decay_count: usize,
    /// Memories actually archived (always zero when `dry_run`).
    pub archived_count: usize,
    /// Store statistics as of the end of the run.
    pub stats: MemoryStats,
    /// Component health snapshot.
    pub health: MaintenanceHealth,
}

/// The façade over every memory-store component.
///
/// Generic over the embedding cache's durable store and embedder
/// collaborator so a storage-backend crate and a model-serving crate can
/// each be swapped independently. Construct `E` already wrapped in
/// [`crate::embeddings::GuardedEmbedder`] if circuit-breaker protection
/// is wanted; `MemorySystem` does not wrap it a second time.
pub struct MemorySystem<S: EmbeddingPersistentStore, E: Embedder> {
    config: MemoryConfig,
    clock: Arc<dyn Clock>,
    store: MemoryStore,
    dedup: ContentDedup,
    embeddings: EmbeddingCache<S, E>,
    search_cache: SearchCache,
    graph: RelationshipGraph,
    pagerank: PageRankTracker,
    access_log: AccessLog,
    refcount: ReferenceCounter,
    generations: GenerationTracker,
    reinforcement: ReinforcementScheduler,
    emotional_tags: EmotionalTagStore,
    entities: EntityStore,
}

impl<S: EmbeddingPersistentStore, E: Embedder> MemorySystem<S, E> {
    /// Opens a memory system rooted at `config.store_root`, backed by
    /// `persistent` for durable embeddings and `embedder` for computing
    /// new ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the store root cannot be created.
    pub async fn open(
        config: MemoryConfig,
        persistent: Arc<S>,
        embedder: Arc<E>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let store = MemoryStore::open(config.store_root.clone()).await?;
        let embeddings = EmbeddingCache::new(persistent, embedder, config.embedding_cache.lru_capacity);
        let search_cache = SearchCache::new(config.search_cache);

        Ok(Self {
            clock,
            store,
            dedup: ContentDedup::new(),
            embeddings,
            search_cache,
            graph: RelationshipGraph::new(),
            pagerank: PageRankTracker::new(),
            access_log: AccessLog::new(),
            refcount: ReferenceCounter::new(),
            generations: GenerationTracker::new(),
            reinforcement: ReinforcementScheduler::new(),
            emotional_tags: EmotionalTagStore::new(),
            entities: EntityStore::new(),
            config,
        })
    }

    /// The relationship graph, for callers that want to add edges or walk
    /// the graph directly.
    #[must_use]
    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    /// The PageRank tracker over the relationship graph.
    #[must_use]
    pub fn pagerank(&self) -> &PageRankTracker {
        &self.pagerank
    }

    /// The access/retrieval log.
    #[must_use]
    pub fn access_log(&self) -> &AccessLog {
        &self.access_log
    }

    /// The reference counter.
    #[must_use]
    pub fn refcount(&self) -> &ReferenceCounter {
        &self.refcount
    }

    /// The generational GC tracker.
    #[must_use]
    pub fn generations(&self) -> &GenerationTracker {
        &self.generations
    }

    /// The spaced-repetition scheduler.
    #[must_use]
    pub fn reinforcement(&self) -> &ReinforcementScheduler {
        &self.reinforcement
    }

    /// The dedup registry.
    #[must_use]
    pub fn dedup(&self) -> &ContentDedup {
        &self.dedup
    }

    /// The emotional-tag store.
    #[must_use]
    pub fn emotional_tags(&self) -> &EmotionalTagStore {
        &self.emotional_tags
    }

    /// The extracted-entity store.
    #[must_use]
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// The underlying file-backed store, for callers that need
    /// lower-level access (e.g. `update`).
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Saves `content` as a new memory.
    ///
    /// `project_id: None` stores the memory as [`Scope::Global`];
    /// `Some` stores it as [`Scope::Project`]. When `check_contradictions`
    /// is true, an exact/normalized/semantic duplicate match rejects the
    /// save with [`Error::DuplicateRejected`]; when false, the dedup
    /// registry is still updated but a match does not block the write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRejected`] per the rule above, or
    /// whatever the Memory Store's `create` can fail with.
    #[allow(clippy::too_many_arguments)]
    pub async fn save(
        &self,
        content: String,
        tags: Option<BTreeSet<String>>,
        importance: Option<f64>,
        project_id: Option<String>,
        session_id: Option<String>,
        source_session_id: Option<String>,
        check_contradictions: bool,
    ) -> Result<Memory> {
        let now = self.clock.now();
        let tags = tags.unwrap_or_default();
        let importance = importance.unwrap_or(defaults::DEFAULT_IMPORTANCE).clamp(0.0, 1.0);

        let embedding = match self.embeddings.get(&content, now).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "embedder unavailable during save, dedup limited to exact/normalized levels"
                );
                None
            }
        };

        if check_contradictions {
            if let DedupOutcome::Duplicate { level, .. } =
                self.dedup.check(&content, embedding.as_deref(), now)
            {
                return Err(Error::DuplicateRejected(level));
            }
        }

        let scope = if project_id.is_some() { Scope::Project } else { Scope::Global };
        let memory = self
            .store
            .create(
                content.clone(),
                project_id.unwrap_or_else(|| defaults::UNSCOPED_PROJECT_ID.to_string()),
                tags,
                importance,
                scope,
                source_session_id,
                defaults::DEFAULT_CONFIDENCE,
                now,
            )
            .await?;

        self.dedup.register(&memory.id, &content, embedding.as_deref());
        self.generations.record_created(&memory.id, now);

        let emotional_tag = emotional::tag_content(&memory.id, &content, now);
        self.reinforcement.schedule_new(&memory.id, emotional_tag.is_flashbulb(), now);
        self.emotional_tags.record(emotional_tag);
        self.entities.record(&memory.id, crate::entities::extract(&memory.id, &content));

        tracing::debug!(id = %memory.id, session_id = ?session_id, "memory saved");
        Ok(memory)
    }

    /// Fetches a memory by id and records a [`AccessType::Direct`] access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::InvalidId`] per
    /// [`MemoryStore::get`].
    pub async fn get(&self, id: &str) -> Result<Memory> {
        let memory = self.store.get(id).await?;
        self.access_log.record(AccessEvent {
            memory_id: memory.id.clone(),
            access_type: AccessType::Direct,
            timestamp: self.clock.now(),
            query_context: None,
            session_id: None,
        });
        Ok(memory)
    }

    /// Enumerates memories matching `filter`.
    ///
    /// # Errors
    ///
    /// As [`MemoryStore::list`].
    pub async fn list(&self, filter: &MemoryFilter, include_archived: bool) -> Result<Vec<Memory>> {
        self.store.list(filter, include_archived).await
    }

    /// Runs a hybrid keyword/semantic search, serving from the search
    /// cache when a live, sufficiently-hydrated entry exists.
    ///
    /// `project_id: None` searches every scope; `Some` restricts to that
    /// project's own memories plus every [`Scope::Global`] memory.
    ///
    /// # Errors
    ///
    /// Returns an error only if the Memory Store itself fails; a down
    /// embedder degrades ranking to keyword-only rather than failing the
    /// search.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        project_id: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let now = self.clock.now();
        let top_k = top_k.unwrap_or(defaults::DEFAULT_SEARCH_TOP_K);

        if let Some(cached) = self.search_cache.get(query, project_id, now) {
            let mut hydrated = Vec::with_capacity(cached.result_ids.len());
            for id in &cached.result_ids {
                match self.store.get(id).await {
                    Ok(memory) => hydrated.push(memory),
                    Err(Error::NotFound(_)) => continue,
                    Err(err) => return Err(err),
                }
            }
            if hydrated.len() >= self.search_cache.min_viable_hydrated_count() {
                let explanation = retrieval::generic_explanation();
                let mut results = Vec::with_capacity(hydrated.len());
                for memory in hydrated {
                    self.access_log.record(AccessEvent {
                        memory_id: memory.id.clone(),
                        access_type: AccessType::Search,
                        timestamp: now,
                        query_context: Some(query.to_string()),
                        session_id: None,
                    });
                    results.push(SearchResult {
                        memory,
                        score: 1.0,
                        explanation: explanation.clone(),
                    });
                }
                return Ok(results);
            }
            tracing::debug!(query, "search cache hit under-hydrated, recomputing");
        }

        let candidates: Vec<Memory> = self
            .store
            .list(&MemoryFilter::all(), false)
            .await?
            .into_iter()
            .filter(|memory| visible_to(memory, project_id))
            .collect();

        let query_embedding = match self.embeddings.get(query, now).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!(error = %err, "embedder unavailable, degrading to keyword-only ranking");
                vec![0.0_f32; self.config.embedding_cache.dimension]
            }
        };

        let mut candidates_with_embeddings = Vec::with_capacity(candidates.len());
        for memory in candidates {
            let embedding = match self.embeddings.get(&memory.content, now).await {
                Ok(vector) => vector,
                Err(err) => {
                    tracing::warn!(
                        id = %memory.id,
                        error = %err,
                        "embedding unavailable for candidate, scoring semantic=0"
                    );
                    vec![0.0_f32; self.config.embedding_cache.dimension]
                }
            };
            candidates_with_embeddings.push((memory, embedding));
        }

        let ranked = retrieval::rank(
            query,
            &candidates_with_embeddings,
            &query_embedding,
            now,
            &self.config.ranking,
        );
        let memories_by_id: HashMap<String, Memory> =
            candidates_with_embeddings.into_iter().map(|(memory, _)| (memory.id.clone(), memory)).collect();

        let mut results = Vec::with_capacity(top_k.min(ranked.len()));
        for scored in ranked.into_iter().take(top_k) {
            let Some(memory) = memories_by_id.get(&scored.id) else {
                continue;
            };
            let explanation = retrieval::explain(query, &memory.content, &scored);
            self.access_log.record(AccessEvent {
                memory_id: memory.id.clone(),
                access_type: AccessType::Search,
                timestamp: now,
                query_context: Some(query.to_string()),
                session_id: None,
            });
            results.push(SearchResult {
                memory: memory.clone(),
                score: scored.combined,
                explanation,
            });
        }

        self.search_cache.put(
            query,
            project_id,
            results.iter().map(|r| r.memory.id.clone()).collect(),
            now,
        );

        Ok(results)
    }

    /// Archives a memory, vetoing the archival if the Reference Counter
    /// currently protects it.
    ///
    /// # Errors
    ///
    /// As [`MemoryStore::archive`].
    pub async fn archive(&self, id: &str, reason: &str) -> Result<bool> {
        if self.refcount.is_protected(id) {
            tracing::info!(id, "archive vetoed: memory is still referenced");
            return Ok(false);
        }
        self.store.archive(id, reason, self.clock.now()).await
    }

    /// Aggregate statistics over the active store.
    ///
    /// # Errors
    ///
    /// As [`MemoryStore::list`].
    pub async fn get_stats(&self) -> Result<MemoryStats> {
        let memories = self.store.list(&MemoryFilter::all(), false).await?;
        let total = memories.len();
        let avg_importance = if total == 0 {
            0.0
        } else {
            memories.iter().map(|m| m.importance).sum::<f64>() / total as f64
        };

        let mut confidence_distribution: BTreeMap<String, u64> = BTreeMap::new();
        let mut tag_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut project_counts: BTreeMap<String, u64> = BTreeMap::new();

        for memory in &memories {
            *confidence_distribution.entry(confidence_bucket(memory.confidence).to_string()).or_insert(0) += 1;
            for tag in &memory.tags {
                *tag_counts.entry(tag.clone()).or_insert(0) += 1;
            }
            *project_counts.entry(memory.project_id.clone()).or_insert(0) += 1;
        }

        let entity_counts: BTreeMap<String, u64> = self.entities.entity_counts().into_iter().collect();

        Ok(MemoryStats {
            total,
            avg_importance,
            confidence_distribution,
            tag_counts,
            project_counts,
            entity_counts,
        })
    }

    /// Runs one maintenance pass: generational GC over every memory,
    /// reinforcement-backlog reporting, and cache/embedding pruning.
    /// `dry_run` classifies candidates and computes the report without
    /// archiving anything or mutating tracked state.
    ///
    /// # Errors
    ///
    /// As [`MemoryStore::list`] and [`MemoryStore::archive`].
    pub async fn run_maintenance(&self, dry_run: bool) -> Result<MaintenanceReport> {
        let started = std::time::Instant::now();
        let now = self.clock.now();

        let active = self.store.list(&MemoryFilter::all(), false).await?;
        let mut archived_count = 0usize;

        for generation in [Generation::Nursery, Generation::Young, Generation::Tenured] {
            let mut facts = Vec::new();
            for memory in &active {
                self.generations.record_created(&memory.id, memory.created);
                let tracked_generation = self
                    .generations
                    .entry_for(&memory.id)
                    .map_or_else(|| Generation::for_age(memory.age_days(now), &self.config.gc), |entry| entry.generation);
                if tracked_generation != generation {
                    continue;
                }
                let summary = self.access_log.summary_for(&memory.id);
                facts.push(GcCandidateFacts {
                    memory_id: memory.id.clone(),
                    age_days: memory.age_days(now),
                    access_count: summary.total,
                    importance: memory.importance,
                    last_accessed: self.access_log.last_accessed(&memory.id),
                    has_relationship_links: self.graph.has_relationship_links(&memory.id),
                    is_protected: self.refcount.is_protected(&memory.id),
                });
            }
            if facts.is_empty() {
                continue;
            }

            let outcome = collect_generation(&facts, generation, &self.config.gc, now);
            if !dry_run {
                for id in &outcome.collected {
                    if self.store.archive(id, "generational gc", now).await? {
                        archived_count += 1;
                    }
                }
                self.generations.apply_outcome(&outcome, now);
            }
        }

        if !dry_run {
            self.pagerank.recompute(&self.graph.all_edges(), &self.config.pagerank, now);
        }

        let decay_count = self.reinforcement.overdue_count(now);
        let search_cache_entries_swept = if dry_run { 0 } else { self.search_cache.sweep(now) };
        let embedding_cache_entries_pruned = if dry_run {
            0
        } else {
            self.embeddings.cleanup(defaults::EMBEDDING_CACHE_MAX_AGE_DAYS, now).await?
        };

        let stats = self.get_stats().await?;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        Ok(MaintenanceReport {
            timestamp: now,
            duration_ms,
            decay_count,
            archived_count,
            stats,
            health: MaintenanceHealth {
                reviews_overdue: decay_count,
                search_cache_entries_swept,
                embedding_cache_entries_pruned,
            },
        })
    }

    /// Consolidates a session transcript into persisted memories via
    /// [`SessionConsolidator`], using the heuristic extractor.
    ///
    /// # Errors
    ///
    /// As [`SessionConsolidator::consolidate`].
    pub async fn consolidate_session(
        &self,
        transcript: &[TranscriptMessage],
        project_id: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<ConsolidationReport> {
        let now = self.clock.now();
        SessionConsolidator::new(&self.store, &self.dedup).consolidate(transcript, project_id, session_id, now).await
    }
}

fn confidence_bucket(confidence: f64) -> &'static str {
    if confidence < 0.5 {
        "low"
    } else if confidence < 0.8 {
        "medium"
    } else {
        "high"
    }
}

fn visible_to(memory: &Memory, project_id: Option<&str>) -> bool {
    match project_id {
        None => true,
        Some(pid) => memory.project_id == pid || memory.scope == Scope::Global,
    }
}

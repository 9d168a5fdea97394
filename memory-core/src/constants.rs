//! Global constants for memory-core.
//!
//! Centralizes the magic numbers and string constants named by the
//! specification so that defaults live in one place.

/// Default configuration values.
pub mod defaults {
    /// Volatile (in-memory) LRU tier capacity for the embedding cache.
    pub const EMBEDDING_LRU_CAPACITY: usize = 1000;
    /// Embedding vector dimension used when no model metadata is available.
    pub const EMBEDDING_DIMENSION: usize = 384;
    /// Number of equal-width bins used to quantize an embedding into a
    /// semantic hash bucket.
    pub const SEMANTIC_HASH_BINS: usize = 16;

    /// Search cache entry time-to-live, in seconds (24 hours).
    pub const SEARCH_CACHE_TTL_SECONDS: i64 = 24 * 60 * 60;
    /// Minimum result-set size eligible for search-cache storage.
    pub const SEARCH_CACHE_MIN_RESULTS: usize = 3;
    /// Maximum result-set size eligible for search-cache storage.
    pub const SEARCH_CACHE_MAX_RESULTS: usize = 100;
    /// Volatile search-cache capacity (distinct queries held in memory).
    pub const SEARCH_CACHE_LRU_CAPACITY: usize = 256;

    /// Hybrid ranking weight applied to semantic similarity.
    pub const WEIGHT_SEMANTIC: f64 = 0.5;
    /// Hybrid ranking weight applied to normalized keyword score.
    pub const WEIGHT_KEYWORD: f64 = 0.2;
    /// Hybrid ranking weight applied to recency.
    pub const WEIGHT_RECENCY: f64 = 0.2;
    /// Hybrid ranking weight applied to importance.
    pub const WEIGHT_IMPORTANCE: f64 = 0.1;
    /// Recency half-life window, in days, used by `recency()`.
    pub const RECENCY_WINDOW_DAYS: f64 = 365.0;

    /// PageRank damping factor.
    pub const PAGERANK_DAMPING: f64 = 0.85;
    /// PageRank maximum iteration count.
    pub const PAGERANK_MAX_ITERATIONS: usize = 20;
    /// PageRank convergence tolerance.
    pub const PAGERANK_TOLERANCE: f64 = 1e-6;

    /// Gini coefficient at or above which a cluster is flagged imbalanced.
    pub const GINI_IMBALANCE_THRESHOLD: f64 = 0.7;
    /// Default "never accessed" staleness window, in days.
    pub const NEVER_ACCESSED_DAYS: i64 = 30;

    /// Generation 0 (nursery) age ceiling, in days.
    pub const GEN_0_MAX_DAYS: i64 = 7;
    /// Generation 1 (young) age ceiling, in days.
    pub const GEN_1_MAX_DAYS: i64 = 90;
    /// Generation 1 minimum access count required to survive.
    pub const GEN_1_MIN_ACCESS: u64 = 2;
    /// Generation 1 importance ceiling at or under which a memory is collected.
    pub const GEN_1_MAX_IMPORTANCE: f64 = 0.5;
    /// Generation 2 importance ceiling (strict) for collection eligibility.
    pub const GEN_2_MAX_IMPORTANCE: f64 = 0.15;
    /// Generation 2 access staleness window, in days.
    pub const GEN_2_ACCESS_STALE_DAYS: i64 = 60;

    /// Initial spaced-repetition review interval, in days.
    pub const INITIAL_REVIEW_INTERVAL_DAYS: i64 = 1;
    /// Minimum review interval, in days, regardless of grade.
    pub const MIN_REVIEW_INTERVAL_DAYS: i64 = 1;
    /// Flashbulb (high-arousal) memories grow their review interval by this
    /// multiplier instead of the default doubling.
    pub const FLASHBULB_INTERVAL_MULTIPLIER: f64 = 1.5;
    /// Arousal at or above which a memory is considered "flashbulb".
    pub const FLASHBULB_AROUSAL_THRESHOLD: f64 = 0.6;

    /// Circuit breaker: consecutive failures before opening.
    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
    /// Circuit breaker: recovery timeout before probing half-open, seconds.
    pub const CIRCUIT_RECOVERY_TIMEOUT_SECONDS: u64 = 600;

    /// Session quality scaling factor applied to the high-importance ratio.
    pub const SESSION_QUALITY_FACTOR: f64 = 1.0;
    /// Importance at or above which a candidate memory counts as "high".
    pub const HIGH_IMPORTANCE_THRESHOLD: f64 = 0.7;

    /// Default schema version stamped on newly created memories.
    pub const SCHEMA_VERSION: u32 = 1;

    /// Project id stamped on memories saved with no project scope given.
    pub const UNSCOPED_PROJECT_ID: &str = "unscoped";
    /// Confidence assigned to memories saved without an explicit value.
    pub const DEFAULT_CONFIDENCE: f64 = 1.0;
    /// Importance assigned to memories saved without an explicit value.
    pub const DEFAULT_IMPORTANCE: f64 = 0.5;
    /// Default number of results `MemorySystem::search` returns when the
    /// caller does not specify `top_k`.
    pub const DEFAULT_SEARCH_TOP_K: usize = 10;
    /// Embedding cache durable-tier entries older than this are pruned
    /// during a maintenance run.
    pub const EMBEDDING_CACHE_MAX_AGE_DAYS: i64 = 90;
}

/// Error messages shared across components.
pub mod errors {
    pub const MEMORY_NOT_FOUND: &str = "memory not found";
    pub const SCHEDULE_NOT_FOUND: &str = "no review schedule for this memory";
    pub const INVALID_ID: &str = "memory id failed sanitization or path-safety checks";
    pub const CORRUPT_RECORD: &str = "memory record header could not be parsed";
}

/// Log message prefixes, matching the component letters in the design.
pub mod logging {
    pub const STORE: &str = "[store]";
    pub const DEDUP: &str = "[dedup]";
    pub const EMBEDDING: &str = "[embedding]";
    pub const RETRIEVAL: &str = "[retrieval]";
    pub const GRAPH: &str = "[graph]";
    pub const ACCESS_LOG: &str = "[access-log]";
    pub const REFCOUNT: &str = "[refcount]";
    pub const GC: &str = "[gc]";
    pub const REINFORCEMENT: &str = "[reinforcement]";
    pub const CONSOLIDATOR: &str = "[consolidator]";
}

/// Filesystem layout constants.
pub mod paths {
    pub const ARCHIVED_DIR: &str = "archived";
    pub const MEMORY_FILE_EXTENSION: &str = ".md";
    pub const ARCHIVE_MANIFEST_SUFFIX: &str = "-archive.md";
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let total = defaults::WEIGHT_SEMANTIC
            + defaults::WEIGHT_KEYWORD
            + defaults::WEIGHT_RECENCY
            + defaults::WEIGHT_IMPORTANCE;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn generation_boundaries_are_ordered() {
        assert!(defaults::GEN_0_MAX_DAYS < defaults::GEN_1_MAX_DAYS);
    }

    #[test]
    fn cache_bounds_are_ordered() {
        assert!(defaults::SEARCH_CACHE_MIN_RESULTS <= defaults::SEARCH_CACHE_MAX_RESULTS);
    }
}

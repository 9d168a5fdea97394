//! Runtime configuration for a memory store instance.
//!
//! Loaded from a TOML file or constructed with defaults matching the
//! specification; every field may be overridden independently.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::error::{Error, Result};

/// Top-level configuration for a [`crate::system::MemorySystem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Root directory holding active and archived memory files.
    pub store_root: PathBuf,
    /// Hybrid ranking weights.
    pub ranking: RankingConfig,
    /// Embedding cache sizing.
    pub embedding_cache: EmbeddingCacheConfig,
    /// Search cache sizing and TTL.
    pub search_cache: SearchCacheConfig,
    /// Circuit breaker thresholds shared by the embedder and LLM wrappers.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Generational GC parameters.
    pub gc: GcConfig,
    /// PageRank parameters.
    pub pagerank: PageRankConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("./memories"),
            ranking: RankingConfig::default(),
            embedding_cache: EmbeddingCacheConfig::default(),
            search_cache: SearchCacheConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            gc: GcConfig::default(),
            pagerank: PageRankConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Loads configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| Error::Configuration(format!("parsing {}: {e}", path.display())))
    }
}

/// Hybrid retrieval scoring weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Weight applied to semantic cosine similarity.
    pub weight_semantic: f64,
    /// Weight applied to normalized keyword score.
    pub weight_keyword: f64,
    /// Weight applied to recency.
    pub weight_recency: f64,
    /// Weight applied to importance.
    pub weight_importance: f64,
    /// Recency half-life window, in days.
    pub recency_window_days: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weight_semantic: defaults::WEIGHT_SEMANTIC,
            weight_keyword: defaults::WEIGHT_KEYWORD,
            weight_recency: defaults::WEIGHT_RECENCY,
            weight_importance: defaults::WEIGHT_IMPORTANCE,
            recency_window_days: defaults::RECENCY_WINDOW_DAYS,
        }
    }
}

/// Embedding cache tier sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingCacheConfig {
    /// Volatile LRU tier capacity.
    pub lru_capacity: usize,
    /// Embedding vector dimension.
    pub dimension: usize,
    /// Semantic-hash quantization bin count.
    pub semantic_hash_bins: usize,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            lru_capacity: defaults::EMBEDDING_LRU_CAPACITY,
            dimension: defaults::EMBEDDING_DIMENSION,
            semantic_hash_bins: defaults::SEMANTIC_HASH_BINS,
        }
    }
}

/// Search cache sizing and eligibility bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCacheConfig {
    /// Entry time-to-live, in seconds.
    pub ttl_seconds: i64,
    /// Minimum result-set size eligible for caching.
    pub min_results: usize,
    /// Maximum result-set size eligible for caching.
    pub max_results: usize,
    /// Volatile cache capacity (distinct queries).
    pub lru_capacity: usize,
}

impl Default for SearchCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: defaults::SEARCH_CACHE_TTL_SECONDS,
            min_results: defaults::SEARCH_CACHE_MIN_RESULTS,
            max_results: defaults::SEARCH_CACHE_MAX_RESULTS,
            lru_capacity: defaults::SEARCH_CACHE_LRU_CAPACITY,
        }
    }
}

/// Circuit breaker thresholds for embedder/LLM collaborators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Seconds to wait before probing a half-open request.
    pub recovery_timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            recovery_timeout_seconds: defaults::CIRCUIT_RECOVERY_TIMEOUT_SECONDS,
        }
    }
}

/// Generational garbage collection thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Generation 0 age ceiling, in days.
    pub gen0_max_days: i64,
    /// Generation 1 age ceiling, in days.
    pub gen1_max_days: i64,
    /// Generation 1 minimum access count required to survive.
    pub gen1_min_access: u64,
    /// Generation 1 importance ceiling for collection eligibility.
    pub gen1_max_importance: f64,
    /// Generation 2 importance ceiling for collection eligibility.
    pub gen2_max_importance: f64,
    /// Generation 2 access staleness window, in days.
    pub gen2_access_stale_days: i64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            gen0_max_days: defaults::GEN_0_MAX_DAYS,
            gen1_max_days: defaults::GEN_1_MAX_DAYS,
            gen1_min_access: defaults::GEN_1_MIN_ACCESS,
            gen1_max_importance: defaults::GEN_1_MAX_IMPORTANCE,
            gen2_max_importance: defaults::GEN_2_MAX_IMPORTANCE,
            gen2_access_stale_days: defaults::GEN_2_ACCESS_STALE_DAYS,
        }
    }
}

/// PageRank algorithm parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Damping factor.
    pub damping: f64,
    /// Maximum iteration count.
    pub max_iterations: usize,
    /// Convergence tolerance.
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: defaults::PAGERANK_DAMPING,
            max_iterations: defaults::PAGERANK_MAX_ITERATIONS,
            tolerance: defaults::PAGERANK_TOLERANCE,
        }
    }
}

//! DDL for the auxiliary relational database described in spec §6.
//!
//! One `libsql` (local-file SQLite-compatible) database backs every
//! durable table the core's in-process components can snapshot to and
//! reload from. Primary keys and uniqueness constraints mirror the data
//! model in spec §3/§4 exactly.

/// Executed once per fresh database to create every table this crate
/// knows how to persist. Idempotent: safe to run against an
/// already-initialized database.
pub const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS content_hashes (
        memory_id TEXT PRIMARY KEY,
        exact_hash TEXT NOT NULL,
        normalized_hash TEXT NOT NULL,
        semantic_hash TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dedup_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        existing_id TEXT NOT NULL,
        level TEXT NOT NULL,
        confidence REAL NOT NULL,
        recorded_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS memory_relationships (
        from_id TEXT NOT NULL,
        to_id TEXT NOT NULL,
        relationship_type TEXT NOT NULL,
        strength REAL NOT NULL,
        valid_from TEXT,
        valid_to TEXT,
        auto_detected INTEGER NOT NULL,
        PRIMARY KEY (from_id, to_id, relationship_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS memory_pagerank (
        memory_id TEXT PRIMARY KEY,
        score REAL NOT NULL,
        in_degree INTEGER NOT NULL,
        out_degree INTEGER NOT NULL,
        computed_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS memory_access_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        memory_id TEXT NOT NULL,
        access_type TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        query_context TEXT,
        session_id TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS memory_generations (
        memory_id TEXT PRIMARY KEY,
        generation INTEGER NOT NULL,
        promoted_at TEXT,
        collection_survived_count INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS gc_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        generation INTEGER NOT NULL,
        collected_count INTEGER NOT NULL,
        promoted_count INTEGER NOT NULL,
        total_in_generation INTEGER NOT NULL,
        timestamp TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_schedule (
        memory_id TEXT PRIMARY KEY,
        interval_days REAL NOT NULL,
        last_reviewed TEXT,
        due_at TEXT NOT NULL,
        review_count INTEGER NOT NULL,
        is_flashbulb INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS review_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        memory_id TEXT NOT NULL,
        grade TEXT NOT NULL,
        reviewed_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reference_counts (
        memory_id TEXT NOT NULL,
        ref_type TEXT NOT NULL,
        count INTEGER NOT NULL,
        PRIMARY KEY (memory_id, ref_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS search_cache (
        query_hash TEXT PRIMARY KEY,
        query TEXT NOT NULL,
        project_id TEXT,
        result_ids TEXT NOT NULL,
        hits INTEGER NOT NULL,
        last_hit TEXT NOT NULL,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS circuit_breaker_state (
        name TEXT PRIMARY KEY,
        state TEXT NOT NULL,
        consecutive_failures INTEGER NOT NULL,
        opened_at_unix INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS emotional_tags (
        memory_id TEXT PRIMARY KEY,
        valence REAL NOT NULL,
        arousal REAL NOT NULL,
        signals TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS entities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        memory_id TEXT NOT NULL,
        entity_text TEXT NOT NULL,
        entity_kind TEXT NOT NULL,
        confidence REAL NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS schema_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        schema_version INTEGER NOT NULL,
        applied_at TEXT NOT NULL
    )
    "#,
];

//! The `Memory` record and its supporting enums.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Visibility class of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Visible only within its `project_id`.
    Project,
    /// Shareable across projects.
    Global,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Project => write!(f, "project"),
            Scope::Global => write!(f, "global"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Scope::Project),
            "global" => Ok(Scope::Global),
            other => Err(format!("unknown scope {other:?}")),
        }
    }
}

/// Lifecycle status of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Stored in the active directory, fully retrievable and searchable.
    Active,
    /// Moved to the archived directory; still retrievable by id.
    Archived,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Active => write!(f, "active"),
            Status::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "archived" => Ok(Status::Archived),
            other => Err(format!("unknown status {other:?}")),
        }
    }
}

/// The authoritative record for a single memory.
///
/// One `Memory` corresponds to exactly one on-disk record, reachable by
/// `id` whether it is active or archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Opaque, filesystem-safe, stable id.
    pub id: String,
    /// UTF-8 body text.
    pub content: String,
    /// Creation timestamp; never changes after the first write.
    pub created: DateTime<Utc>,
    /// Last-modified timestamp; bumped on every `update`.
    pub updated: DateTime<Utc>,
    /// Grouping tag.
    pub project_id: String,
    /// Visibility class.
    pub scope: Scope,
    /// Lifecycle status.
    pub status: Status,
    /// Importance in `[0.0, 1.0]`.
    pub importance: f64,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Free-form tags. Order is preserved for display but carries no
    /// semantic meaning.
    pub tags: BTreeSet<String>,
    /// Opaque provenance identifier, set at creation and never changed.
    pub source_session_id: Option<String>,
    /// Schema version stamped at creation.
    pub schema_version: u32,
    /// Header fields this build does not recognize, preserved verbatim
    /// across reads and writes so older and newer schema versions can
    /// interoperate.
    #[serde(default)]
    pub unknown_fields: std::collections::BTreeMap<String, String>,
}

impl Memory {
    /// Builds a brand-new active memory with the given content and
    /// metadata, stamping `created` and `updated` to `now`.
    #[must_use]
    pub fn new(
        id: String,
        content: String,
        project_id: String,
        scope: Scope,
        importance: f64,
        confidence: f64,
        tags: BTreeSet<String>,
        source_session_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content,
            created: now,
            updated: now,
            project_id,
            scope,
            status: Status::Active,
            importance,
            confidence,
            tags,
            source_session_id,
            schema_version: defaults::SCHEMA_VERSION,
            unknown_fields: std::collections::BTreeMap::new(),
        }
    }

    /// Age in whole days at `now`.
    #[must_use]
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created).num_days().max(0)
    }

    /// `#archived` marker tag, added when a memory is archived.
    pub const ARCHIVED_TAG: &'static str = "archived";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_round_trips_through_string() {
        assert_eq!("project".parse::<Scope>().unwrap(), Scope::Project);
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert!("bogus".parse::<Scope>().is_err());
    }

    #[test]
    fn status_round_trips_through_string() {
        assert_eq!("active".parse::<Status>().unwrap(), Status::Active);
        assert_eq!("archived".parse::<Status>().unwrap(), Status::Archived);
        assert!("bogus".parse::<Status>().is_err());
    }

    #[test]
    fn new_memory_has_matching_created_and_updated() {
        let now = Utc::now();
        let memory = Memory::new(
            "id-1".into(),
            "hello".into(),
            "proj".into(),
            Scope::Project,
            0.5,
            0.5,
            BTreeSet::new(),
            None,
            now,
        );
        assert_eq!(memory.created, memory.updated);
        assert_eq!(memory.status, Status::Active);
    }
}

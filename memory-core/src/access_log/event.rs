//! The `AccessEvent` data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a memory was accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Returned as a search result.
    Search,
    /// Fetched directly by id.
    Direct,
    /// Surfaced in a briefing/summary.
    Briefing,
    /// Touched during session consolidation.
    Consolidation,
    /// Touched during a maintenance run.
    Maintenance,
    /// Touched by a hook script.
    Hook,
    /// Surfaced by a predictive recommendation.
    Predicted,
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AccessType::Search => "search",
            AccessType::Direct => "direct",
            AccessType::Briefing => "briefing",
            AccessType::Consolidation => "consolidation",
            AccessType::Maintenance => "maintenance",
            AccessType::Hook => "hook",
            AccessType::Predicted => "predicted",
        };
        write!(f, "{label}")
    }
}

/// A single recorded access to a memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    /// The memory accessed.
    pub memory_id: String,
    /// How it was accessed.
    pub access_type: AccessType,
    /// When the access occurred.
    pub timestamp: DateTime<Utc>,
    /// The query text, if access was via search.
    pub query_context: Option<String>,
    /// The originating session, if known.
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_type_display_matches_wire_label() {
        assert_eq!(AccessType::Search.to_string(), "search");
        assert_eq!(AccessType::Predicted.to_string(), "predicted");
    }
}

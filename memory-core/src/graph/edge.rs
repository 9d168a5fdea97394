//! The `RelationshipEdge` data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of relationship an edge expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// The source memory led to the target.
    LedTo,
    /// The source memory causally produced the target.
    Causal,
    /// The source memory contradicts the target.
    Contradicts,
    /// The source memory supports the target.
    Supports,
    /// The source memory references the target.
    References,
    /// The source memory requires the target.
    Requires,
    /// A generic, otherwise-unclassified relation.
    RelatedTo,
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RelationshipType::LedTo => "led_to",
            RelationshipType::Causal => "causal",
            RelationshipType::Contradicts => "contradicts",
            RelationshipType::Supports => "supports",
            RelationshipType::References => "references",
            RelationshipType::Requires => "requires",
            RelationshipType::RelatedTo => "related_to",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "led_to" => Ok(RelationshipType::LedTo),
            "causal" => Ok(RelationshipType::Causal),
            "contradicts" => Ok(RelationshipType::Contradicts),
            "supports" => Ok(RelationshipType::Supports),
            "references" => Ok(RelationshipType::References),
            "requires" => Ok(RelationshipType::Requires),
            "related_to" => Ok(RelationshipType::RelatedTo),
            other => Err(format!("unknown relationship type {other:?}")),
        }
    }
}

/// A typed, optionally time-bounded directed edge between two memories.
///
/// `(from_id, to_id, type)` is unique: adding an edge with a triple that
/// already exists replaces the prior weight/strength/validity rather than
/// creating a parallel edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// The source memory id.
    pub from_id: String,
    /// The target memory id.
    pub to_id: String,
    /// The relationship kind.
    pub relationship_type: RelationshipType,
    /// Strength/weight in `[0, 1]`.
    pub strength: f64,
    /// When the edge becomes valid; `None` means always-valid from the
    /// start of time.
    pub valid_from: Option<DateTime<Utc>>,
    /// When the edge stops being valid; `None` means open-ended.
    pub valid_to: Option<DateTime<Utc>>,
    /// Whether the edge was inferred automatically rather than supplied
    /// explicitly.
    pub auto_detected: bool,
}

impl RelationshipEdge {
    /// The uniqueness key for this edge.
    #[must_use]
    pub fn key(&self) -> (String, String, RelationshipType) {
        (self.from_id.clone(), self.to_id.clone(), self.relationship_type)
    }

    /// Whether this edge is valid at `timestamp`, treating `valid_to =
    /// None` as `+infinity` and `valid_from = None` as `-infinity`.
    #[must_use]
    pub fn valid_at(&self, timestamp: DateTime<Utc>) -> bool {
        let after_start = self.valid_from.is_none_or(|from| from <= timestamp);
        let before_end = self.valid_to.is_none_or(|to| timestamp <= to);
        after_start && before_end
    }
}

//! Component F — Access & Retrieval Log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::event::{AccessEvent, AccessType};
use crate::constants::defaults;

/// Per-memory access counts, total and broken down by type.
#[derive(Debug, Clone, Default)]
pub struct AccessSummary {
    /// Total access count across all types.
    pub total: u64,
    /// Count broken down by access type.
    pub by_type: HashMap<AccessType, u64>,
}

/// Result of a retrieval-imbalance check over a cluster of memory ids.
#[derive(Debug, Clone)]
pub struct GiniReport {
    /// The Gini coefficient of access counts within the cluster.
    pub gini: f64,
    /// Whether `gini` met or exceeded the imbalance threshold.
    pub imbalanced: bool,
    /// The median-split bottom half, reported only when `imbalanced`.
    pub neglected: Vec<String>,
}

/// An append-only log of [`AccessEvent`]s.
#[derive(Default)]
pub struct AccessLog {
    events: RwLock<Vec<AccessEvent>>,
}

impl AccessLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event`.
    pub fn record(&self, event: AccessEvent) {
        self.events.write().push(event);
    }

    /// A snapshot of every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AccessEvent> {
        self.events.read().clone()
    }

    /// Appends previously-checkpointed events, e.g. on startup from the
    /// `memory_access_log` table. Callers are responsible for ordering;
    /// this does not re-sort.
    pub fn load_events(&self, events: Vec<AccessEvent>) {
        self.events.write().extend(events);
    }

    /// The access-frequency summary for `memory_id`.
    #[must_use]
    pub fn summary_for(&self, memory_id: &str) -> AccessSummary {
        let events = self.events.read();
        let mut summary = AccessSummary::default();
        for event in events.iter().filter(|e| e.memory_id == memory_id) {
            summary.total += 1;
            *summary.by_type.entry(event.access_type).or_insert(0) += 1;
        }
        summary
    }

    /// The timestamp of the most recent access to `memory_id`, if any.
    #[must_use]
    pub fn last_accessed(&self, memory_id: &str) -> Option<DateTime<Utc>> {
        self.events
            .read()
            .iter()
            .filter(|e| e.memory_id == memory_id)
            .map(|e| e.timestamp)
            .max()
    }

    /// Returns the subset of `candidate_ids` whose most recent access is
    /// older than `days` days before `now`, or absent entirely.
    #[must_use]
    pub fn never_accessed(&self, candidate_ids: &[String], now: DateTime<Utc>, days: i64) -> Vec<String> {
        let cutoff = now - chrono::Duration::days(days);
        candidate_ids
            .iter()
            .filter(|id| match self.last_accessed(id) {
                Some(last) => last < cutoff,
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Computes the Gini coefficient of access counts across `cluster`,
    /// flagging imbalance at or above `threshold` and, when imbalanced,
    /// reporting the median-split bottom half as neglected.
    #[must_use]
    pub fn retrieval_imbalance(&self, cluster: &[String], threshold: f64) -> GiniReport {
        let mut counts: Vec<(String, u64)> = cluster
            .iter()
            .map(|id| (id.clone(), self.summary_for(id).total))
            .collect();

        let gini = gini_coefficient(&counts.iter().map(|(_, count)| *count as f64).collect::<Vec<_>>());
        let imbalanced = gini >= threshold;

        let neglected = if imbalanced {
            counts.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            let half = counts.len().div_ceil(2);
            counts.into_iter().take(half).map(|(id, _)| id).collect()
        } else {
            Vec::new()
        };

        GiniReport {
            gini,
            imbalanced,
            neglected,
        }
    }
}

/// The default Gini imbalance threshold.
#[must_use]
pub fn default_imbalance_threshold() -> f64 {
    defaults::GINI_IMBALANCE_THRESHOLD
}

fn gini_coefficient(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = values.iter().sum();
    if sum <= f64::EPSILON {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut weighted_sum = 0.0;
    for (i, value) in sorted.iter().enumerate() {
        weighted_sum += (2.0 * (i as f64 + 1.0) - n as f64 - 1.0) * value;
    }
    weighted_sum / (n as f64 * sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, ts: DateTime<Utc>) -> AccessEvent {
        AccessEvent {
            memory_id: id.into(),
            access_type: AccessType::Search,
            timestamp: ts,
            query_context: None,
            session_id: None,
        }
    }

    #[test]
    fn summary_counts_by_type() {
        let log = AccessLog::new();
        let now = Utc::now();
        log.record(event("m1", now));
        log.record(AccessEvent {
            access_type: AccessType::Direct,
            ..event("m1", now)
        });
        let summary = log.summary_for("m1");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.by_type[&AccessType::Search], 1);
        assert_eq!(summary.by_type[&AccessType::Direct], 1);
    }

    #[test]
    fn never_accessed_includes_absent_and_stale() {
        let log = AccessLog::new();
        let now = Utc::now();
        log.record(event("recent", now));
        log.record(event("stale", now - chrono::Duration::days(40)));

        let result = log.never_accessed(
            &["recent".into(), "stale".into(), "absent".into()],
            now,
            30,
        );
        assert!(result.contains(&"stale".to_string()));
        assert!(result.contains(&"absent".to_string()));
        assert!(!result.contains(&"recent".to_string()));
    }

    #[test]
    fn gini_is_zero_for_uniform_access() {
        let log = AccessLog::new();
        let now = Utc::now();
        for id in ["a", "b", "c"] {
            log.record(event(id, now));
        }
        let report = log.retrieval_imbalance(&["a".into(), "b".into(), "c".into()], 0.7);
        assert!(report.gini < 1e-9);
        assert!(!report.imbalanced);
    }

    #[test]
    fn gini_flags_heavy_imbalance_and_reports_neglected() {
        let log = AccessLog::new();
        let now = Utc::now();
        for _ in 0..20 {
            log.record(event("popular", now));
        }
        // "neglected" and "also-neglected" get zero accesses.
        let report = log.retrieval_imbalance(
            &["popular".into(), "neglected".into(), "also-neglected".into()],
            0.7,
        );
        assert!(report.imbalanced);
        assert!(report.neglected.contains(&"neglected".to_string()));
        assert!(report.neglected.contains(&"also-neglected".to_string()));
        assert!(!report.neglected.contains(&"popular".to_string()));
    }
}

//! PageRank over the relationship graph: a structural-importance score
//! used as a secondary retrieval signal.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::edge::RelationshipEdge;
use crate::config::PageRankConfig;

/// A node's PageRank result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRankScore {
    /// The normalized score.
    pub score: f64,
    /// Incoming edge count.
    pub in_degree: usize,
    /// Outgoing edge count.
    pub out_degree: usize,
}

/// A persisted PageRank row: `(memory_id, pagerank, in_degree,
/// out_degree, computed_at)`.
#[derive(Debug, Clone)]
pub struct PageRankRecord {
    /// The memory this score belongs to.
    pub memory_id: String,
    /// The normalized score.
    pub score: f64,
    /// Incoming edge count at computation time.
    pub in_degree: usize,
    /// Outgoing edge count at computation time.
    pub out_degree: usize,
    /// When this score was computed.
    pub computed_at: DateTime<Utc>,
}

/// Holds the most recently computed PageRank scores and serializes
/// recomputation: only one recompute may run at a time, matching the
/// single-writer requirement over the underlying graph snapshot.
#[derive(Default)]
pub struct PageRankTracker {
    recompute_lock: Mutex<()>,
    scores: parking_lot::RwLock<HashMap<String, PageRankRecord>>,
}

impl PageRankTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes PageRank over `edges` and replaces the tracked scores.
    /// Blocks until any concurrent recompute finishes rather than running
    /// two recomputations in parallel.
    pub fn recompute(&self, edges: &[RelationshipEdge], config: &PageRankConfig, now: DateTime<Utc>) {
        let _guard = self.recompute_lock.lock();
        let computed = compute_pagerank(edges, config);
        let mut scores = self.scores.write();
        scores.clear();
        for (memory_id, score) in computed {
            scores.insert(
                memory_id.clone(),
                PageRankRecord {
                    memory_id,
                    score: score.score,
                    in_degree: score.in_degree,
                    out_degree: score.out_degree,
                    computed_at: now,
                },
            );
        }
    }

    /// The most recently computed score for `memory_id`, if any.
    #[must_use]
    pub fn score_for(&self, memory_id: &str) -> Option<PageRankRecord> {
        self.scores.read().get(memory_id).cloned()
    }

    /// A snapshot of every tracked score, for checkpointing to the
    /// `memory_pagerank` table.
    #[must_use]
    pub fn all_scores(&self) -> Vec<PageRankRecord> {
        self.scores.read().values().cloned().collect()
    }

    /// Rebuilds the tracker from previously-checkpointed rows, e.g. on
    /// startup from the `memory_pagerank` table.
    pub fn load_scores(&self, rows: Vec<PageRankRecord>) {
        let mut scores = self.scores.write();
        for row in rows {
            scores.insert(row.memory_id.clone(), row);
        }
    }
}

/// Computes PageRank over `edges`, treating each as directed `from -> to`,
/// dropping self-loops, merging duplicate `(from, to)` pairs, and
/// ignoring edge weights.
///
/// Returns an empty map for an empty edge set.
#[must_use]
pub fn compute_pagerank(
    edges: &[RelationshipEdge],
    config: &PageRankConfig,
) -> HashMap<String, PageRankScore> {
    let mut deduped: HashSet<(String, String)> = HashSet::new();
    for edge in edges {
        if edge.from_id != edge.to_id {
            deduped.insert((edge.from_id.clone(), edge.to_id.clone()));
        }
    }

    let mut nodes: HashSet<String> = HashSet::new();
    for edge in edges {
        nodes.insert(edge.from_id.clone());
        nodes.insert(edge.to_id.clone());
    }
    if nodes.is_empty() {
        return HashMap::new();
    }

    let mut out_edges: HashMap<String, Vec<String>> = HashMap::new();
    let mut in_degree: HashMap<String, usize> = HashMap::new();
    for node in &nodes {
        out_edges.entry(node.clone()).or_default();
        in_degree.entry(node.clone()).or_insert(0);
    }
    for (from, to) in &deduped {
        out_edges.entry(from.clone()).or_default().push(to.clone());
        *in_degree.entry(to.clone()).or_insert(0) += 1;
    }

    let n = nodes.len() as f64;
    let mut scores: HashMap<String, f64> = nodes.iter().map(|node| (node.clone(), 1.0 / n)).collect();

    for _ in 0..config.max_iterations {
        let dangling_mass: f64 = nodes
            .iter()
            .filter(|node| out_edges[*node].is_empty())
            .map(|node| scores[node])
            .sum();

        let mut next_scores: HashMap<String, f64> = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            let base = (1.0 - config.damping) / nodes.len() as f64;
            let dangling_contribution = config.damping * dangling_mass / nodes.len() as f64;
            next_scores.insert(node.clone(), base + dangling_contribution);
        }
        for (from, targets) in &out_edges {
            if targets.is_empty() {
                continue;
            }
            let share = config.damping * scores[from] / targets.len() as f64;
            for target in targets {
                *next_scores.get_mut(target).expect("target is a known node") += share;
            }
        }

        let max_delta = nodes
            .iter()
            .map(|node| (next_scores[node] - scores[node]).abs())
            .fold(0.0, f64::max);

        scores = next_scores;
        if max_delta < config.tolerance {
            break;
        }
    }

    let sum: f64 = scores.values().sum();
    if sum > f64::EPSILON {
        for value in scores.values_mut() {
            *value /= sum;
        }
    }

    nodes
        .into_iter()
        .map(|node| {
            let score = scores[&node];
            let in_degree = in_degree[&node];
            let out_degree = out_edges[&node].len();
            (
                node,
                PageRankScore {
                    score,
                    in_degree,
                    out_degree,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::RelationshipType;

    fn edge(from: &str, to: &str) -> RelationshipEdge {
        RelationshipEdge {
            from_id: from.into(),
            to_id: to.into(),
            relationship_type: RelationshipType::RelatedTo,
            strength: 1.0,
            valid_from: None,
            valid_to: None,
            auto_detected: false,
        }
    }

    fn config() -> PageRankConfig {
        PageRankConfig::default()
    }

    #[test]
    fn empty_edge_set_returns_empty_map() {
        assert!(compute_pagerank(&[], &config()).is_empty());
    }

    #[test]
    fn triangle_is_uniform() {
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let result = compute_pagerank(&edges, &config());
        for score in result.values() {
            assert!((score.score - 1.0 / 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn four_cycle_is_uniform() {
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "d"), edge("d", "a")];
        let result = compute_pagerank(&edges, &config());
        for score in result.values() {
            assert!((score.score - 0.25).abs() < 1e-4);
        }
    }

    #[test]
    fn symmetric_two_node_cycle_splits_evenly() {
        let edges = vec![edge("a", "b"), edge("b", "a")];
        let result = compute_pagerank(&edges, &config());
        assert!((result["a"].score - 0.5).abs() < 1e-4);
        assert!((result["b"].score - 0.5).abs() < 1e-4);
    }

    #[test]
    fn star_hub_dominates_equal_leaves() {
        let edges = vec![edge("a", "h"), edge("b", "h"), edge("c", "h"), edge("d", "h")];
        let result = compute_pagerank(&edges, &config());
        let hub = result["h"].score;
        let leaves = [result["a"].score, result["b"].score, result["c"].score, result["d"].score];
        for leaf in leaves {
            assert!(hub > leaf);
            assert!((leaf - leaves[0]).abs() < 1e-9);
        }
    }

    #[test]
    fn scores_sum_to_one() {
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a"), edge("a", "c")];
        let result = compute_pagerank(&edges, &config());
        let sum: f64 = result.values().map(|s| s.score).sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }

    #[test]
    fn single_self_loop_is_dropped_leaving_isolated_node_score_one() {
        let edges = vec![edge("a", "a")];
        let result = compute_pagerank(&edges, &config());
        assert!((result["a"].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn tracker_recompute_replaces_prior_scores() {
        let tracker = PageRankTracker::new();
        let now = Utc::now();
        tracker.recompute(&[edge("a", "b"), edge("b", "a")], &config(), now);
        let a = tracker.score_for("a").unwrap();
        assert!((a.score - 0.5).abs() < 1e-4);

        tracker.recompute(&[edge("a", "b"), edge("b", "c"), edge("c", "a")], &config(), now);
        assert!(tracker.score_for("a").unwrap().score < 0.5);
        assert_eq!(tracker.all_scores().len(), 3);
    }

    #[test]
    fn repeated_compute_on_unchanged_edges_is_stable() {
        let edges = vec![edge("a", "b"), edge("b", "a")];
        let first = compute_pagerank(&edges, &config());
        let second = compute_pagerank(&edges, &config());
        for key in first.keys() {
            assert!((first[key].score - second[key].score).abs() < 1e-6);
        }
    }
}

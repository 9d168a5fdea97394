//! The relationship graph: a directed multigraph over memory ids with
//! forward and reverse adjacency for O(degree) in/out queries.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::edge::{RelationshipEdge, RelationshipType};

/// Which direction to traverse from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Only edges where the node is the source.
    Out,
    /// Only edges where the node is the target.
    In,
    /// Both directions.
    Both,
}

/// The result of [`RelationshipGraph::get_memory_graph`]: the set of
/// nodes and edges reached within the requested depth.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    /// Every memory id reached, including the starting id.
    pub nodes: Vec<String>,
    /// Every distinct edge traversed.
    pub edges: Vec<RelationshipEdge>,
}

/// A directed multigraph of typed relationships between memories.
#[derive(Default)]
pub struct RelationshipGraph {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    forward: HashMap<String, Vec<RelationshipEdge>>,
    reverse: HashMap<String, Vec<RelationshipEdge>>,
}

impl RelationshipGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `edge`, replacing any existing edge with the same
    /// `(from_id, to_id, type)` key rather than creating a parallel one.
    pub fn add_edge(&self, edge: RelationshipEdge) {
        let mut inner = self.inner.write();
        let key = edge.key();

        if let Some(existing) = inner.forward.entry(edge.from_id.clone()).or_default().iter_mut().find(|e| e.key() == key) {
            *existing = edge.clone();
        } else {
            inner.forward.entry(edge.from_id.clone()).or_default().push(edge.clone());
        }

        if let Some(existing) = inner.reverse.entry(edge.to_id.clone()).or_default().iter_mut().find(|e| e.key() == key) {
            *existing = edge;
        } else {
            inner.reverse.entry(edge.to_id.clone()).or_default().push(edge);
        }
    }

    /// Loads many edges at once, e.g. rebuilding adjacency from a
    /// durable table on startup.
    pub fn load_edges(&self, edges: Vec<RelationshipEdge>) {
        for edge in edges {
            self.add_edge(edge);
        }
    }

    /// A snapshot of every edge currently held, deduplicated.
    #[must_use]
    pub fn all_edges(&self) -> Vec<RelationshipEdge> {
        let inner = self.inner.read();
        inner.forward.values().flatten().cloned().collect()
    }

    /// Returns edges touching `id`, optionally filtered by type and
    /// direction.
    #[must_use]
    pub fn get_related(
        &self,
        id: &str,
        type_filter: Option<RelationshipType>,
        direction: Direction,
    ) -> Vec<RelationshipEdge> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            out.extend(inner.forward.get(id).into_iter().flatten().cloned());
        }
        if matches!(direction, Direction::In | Direction::Both) {
            out.extend(inner.reverse.get(id).into_iter().flatten().cloned());
        }
        if let Some(filter) = type_filter {
            out.retain(|e| e.relationship_type == filter);
        }
        out
    }

    /// BFS outward from `id` up to `max_depth` hops, deduplicating edges
    /// and walking whichever endpoint is not the current node (so the
    /// traversal follows edges in either direction).
    #[must_use]
    pub fn get_memory_graph(
        &self,
        id: &str,
        max_depth: usize,
        type_filter: Option<RelationshipType>,
    ) -> MemoryGraph {
        let inner = self.inner.read();
        let mut visited_nodes = HashSet::new();
        let mut visited_edges = HashSet::new();
        let mut edges = Vec::new();
        let mut queue = VecDeque::new();

        visited_nodes.insert(id.to_string());
        queue.push_back((id.to_string(), 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let mut touching: Vec<&RelationshipEdge> = inner
                .forward
                .get(&current)
                .into_iter()
                .flatten()
                .chain(inner.reverse.get(&current).into_iter().flatten())
                .collect();
            touching.sort_by(|a, b| a.key().cmp(&b.key()));
            touching.dedup_by(|a, b| a.key() == b.key());

            for edge in touching {
                if let Some(filter) = type_filter {
                    if edge.relationship_type != filter {
                        continue;
                    }
                }
                if visited_edges.insert(edge.key()) {
                    edges.push(edge.clone());
                }
                let neighbor = if edge.from_id == current {
                    &edge.to_id
                } else {
                    &edge.from_id
                };
                if visited_nodes.insert(neighbor.clone()) {
                    queue.push_back((neighbor.clone(), depth + 1));
                }
            }
        }

        let mut nodes: Vec<String> = visited_nodes.into_iter().collect();
        nodes.sort();
        MemoryGraph { nodes, edges }
    }

    /// BFS over outgoing `causal` edges from `from` to `to`, returning
    /// the shortest node sequence, or `None` if unreachable within
    /// `max_depth` hops.
    #[must_use]
    pub fn find_causal_chain(&self, from: &str, to: &str, max_depth: usize) -> Option<Vec<String>> {
        if from == to {
            return Some(vec![from.to_string()]);
        }
        let inner = self.inner.read();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(from.to_string());
        queue.push_back(vec![from.to_string()]);

        while let Some(path) = queue.pop_front() {
            if path.len() - 1 >= max_depth {
                continue;
            }
            let current = path.last().expect("path is never empty");
            for edge in inner.forward.get(current).into_iter().flatten() {
                if edge.relationship_type != RelationshipType::Causal {
                    continue;
                }
                if !visited.insert(edge.to_id.clone()) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(edge.to_id.clone());
                if edge.to_id == to {
                    return Some(next_path);
                }
                queue.push_back(next_path);
            }
        }
        None
    }

    /// Edges of type `contradicts` touching `id` in either direction.
    #[must_use]
    pub fn detect_contradictions(&self, id: &str) -> Vec<RelationshipEdge> {
        self.get_related(id, Some(RelationshipType::Contradicts), Direction::Both)
    }

    /// Edges touching `id` that are valid at `timestamp`.
    #[must_use]
    pub fn edges_at(&self, id: &str, timestamp: DateTime<Utc>) -> Vec<RelationshipEdge> {
        self.get_related(id, None, Direction::Both)
            .into_iter()
            .filter(|e| e.valid_at(timestamp))
            .collect()
    }

    /// Whether `id` has at least one relationship edge touching it in
    /// either direction, used by the lifecycle engine's gen-2 collection
    /// rule.
    #[must_use]
    pub fn has_relationship_links(&self, id: &str) -> bool {
        let inner = self.inner.read();
        inner.forward.get(id).is_some_and(|edges| !edges.is_empty())
            || inner.reverse.get(id).is_some_and(|edges| !edges.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, relationship_type: RelationshipType) -> RelationshipEdge {
        RelationshipEdge {
            from_id: from.into(),
            to_id: to.into(),
            relationship_type,
            strength: 0.8,
            valid_from: None,
            valid_to: None,
            auto_detected: false,
        }
    }

    #[test]
    fn readding_same_triple_replaces_rather_than_duplicates() {
        let graph = RelationshipGraph::new();
        graph.add_edge(edge("a", "b", RelationshipType::Supports));
        let mut updated = edge("a", "b", RelationshipType::Supports);
        updated.strength = 0.2;
        graph.add_edge(updated);

        let related = graph.get_related("a", None, Direction::Out);
        assert_eq!(related.len(), 1);
        assert!((related[0].strength - 0.2).abs() < 1e-9);
    }

    #[test]
    fn get_memory_graph_walks_both_directions() {
        let graph = RelationshipGraph::new();
        graph.add_edge(edge("a", "b", RelationshipType::Supports));
        graph.add_edge(edge("c", "a", RelationshipType::References));

        let result = graph.get_memory_graph("a", 2, None);
        assert!(result.nodes.contains(&"b".to_string()));
        assert!(result.nodes.contains(&"c".to_string()));
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn find_causal_chain_returns_shortest_path() {
        let graph = RelationshipGraph::new();
        graph.add_edge(edge("a", "b", RelationshipType::Causal));
        graph.add_edge(edge("b", "c", RelationshipType::Causal));

        let chain = graph.find_causal_chain("a", "c", 5).unwrap();
        assert_eq!(chain, vec!["a", "b", "c"]);
    }

    #[test]
    fn find_causal_chain_ignores_non_causal_edges() {
        let graph = RelationshipGraph::new();
        graph.add_edge(edge("a", "b", RelationshipType::Supports));
        assert!(graph.find_causal_chain("a", "b", 5).is_none());
    }

    #[test]
    fn detect_contradictions_finds_either_direction() {
        let graph = RelationshipGraph::new();
        graph.add_edge(edge("a", "b", RelationshipType::Contradicts));
        assert_eq!(graph.detect_contradictions("b").len(), 1);
    }

    #[test]
    fn has_relationship_links_reflects_either_direction() {
        let graph = RelationshipGraph::new();
        assert!(!graph.has_relationship_links("a"));
        graph.add_edge(edge("a", "b", RelationshipType::Supports));
        assert!(graph.has_relationship_links("a"));
        assert!(graph.has_relationship_links("b"));
    }
}

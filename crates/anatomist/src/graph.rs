//! # Graph Assembler
//!
//! Merges per-file nodes and edges into one directed graph keyed by node id.
//!
//! - A node whose id already exists is ignored (first writer wins).
//! - An edge with a missing endpoint is dropped.
//! - Repeated `(source, target, kind)` edges collapse into one.
//!
//! All three are counted in [`AssemblyStats`].

use common::{EdgeKind, GraphEdge, GraphNode, GraphSummary};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// What the assembler had to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub duplicate_nodes: usize,
    pub duplicate_edges: usize,
    pub dangling_edges: usize,
}

/// The assembled logic graph. Read-only once handed to detectors.
#[derive(Debug, Default)]
pub struct LogicGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    edge_keys: HashSet<(NodeIndex, NodeIndex, EdgeKind)>,
    stats: AssemblyStats,
}

impl LogicGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. Returns `false` (and counts a duplicate) if the id exists.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.index.contains_key(&node.id) {
            self.stats.duplicate_nodes += 1;
            return false;
        }
        let id = node.id.clone();
        let ix = self.graph.add_node(node);
        self.index.insert(id, ix);
        true
    }

    /// Adds an edge. Returns `false` if it was dangling or a duplicate.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let (Some(&source), Some(&target)) = (self.index.get(&edge.source_id), self.index.get(&edge.target_id)) else {
            self.stats.dangling_edges += 1;
            return false;
        };
        if !self.edge_keys.insert((source, target, edge.kind)) {
            self.stats.duplicate_edges += 1;
            return false;
        }
        self.graph.add_edge(source, target, edge);
        true
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&ix| &self.graph[ix])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.graph.edge_weights()
    }

    pub fn out_edges<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.directed_edges(id, Direction::Outgoing)
    }

    pub fn in_edges<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.directed_edges(id, Direction::Incoming)
    }

    fn directed_edges<'a>(&'a self, id: &str, dir: Direction) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.index
            .get(id)
            .copied()
            .into_iter()
            .flat_map(move |ix| self.graph.edges_directed(ix, dir).map(|e| e.weight()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> AssemblyStats {
        self.stats
    }

    /// The underlying petgraph, for algorithms that work on indices.
    pub fn inner(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    /// Isolated nodes, weak components and density. `cycles` is left at zero
    /// for the cycle detector to fill in.
    pub fn summary(&self) -> GraphSummary {
        let n = self.graph.node_count();
        let isolated_nodes = self
            .graph
            .node_indices()
            .filter(|&ix| self.graph.neighbors_undirected(ix).next().is_none())
            .count();
        let density = if n > 1 {
            self.graph.edge_count() as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };
        GraphSummary {
            isolated_nodes,
            weak_components: petgraph::algo::connected_components(&self.graph),
            density,
            cycles: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ModuleMeta, NodeMetadata};

    fn node(name: &str) -> GraphNode {
        GraphNode::new(
            "m.py",
            name,
            1,
            0,
            NodeMetadata::Module(ModuleMeta {
                module: name.to_string(),
                is_package: false,
            }),
        )
    }

    fn edge(a: &GraphNode, b: &GraphNode, kind: EdgeKind) -> GraphEdge {
        GraphEdge::new(a.id.clone(), b.id.clone(), kind, 0.9)
    }

    #[test]
    fn test_duplicate_node_first_writer_wins() {
        let mut graph = LogicGraph::new();
        assert!(graph.add_node(node("a")));
        assert!(!graph.add_node(node("a")));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.stats().duplicate_nodes, 1);
    }

    #[test]
    fn test_dangling_edge_dropped() {
        let mut graph = LogicGraph::new();
        let a = node("a");
        graph.add_node(a.clone());
        assert!(!graph.add_edge(edge(&a, &node("ghost"), EdgeKind::Calls)));
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.stats().dangling_edges, 1);
    }

    #[test]
    fn test_parallel_edges_collapse_per_kind() {
        let mut graph = LogicGraph::new();
        let (a, b) = (node("a"), node("b"));
        graph.add_node(a.clone());
        graph.add_node(b.clone());

        assert!(graph.add_edge(edge(&a, &b, EdgeKind::Calls)));
        assert!(!graph.add_edge(edge(&a, &b, EdgeKind::Calls)));
        assert!(graph.add_edge(edge(&a, &b, EdgeKind::Imports)));
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.stats().duplicate_edges, 1);
    }

    #[test]
    fn test_directed_views() {
        let mut graph = LogicGraph::new();
        let (a, b, c) = (node("a"), node("b"), node("c"));
        for n in [&a, &b, &c] {
            graph.add_node(n.clone());
        }
        graph.add_edge(edge(&a, &b, EdgeKind::Calls));
        graph.add_edge(edge(&c, &b, EdgeKind::Inherits));

        assert_eq!(graph.out_edges(&a.id).count(), 1);
        assert_eq!(graph.in_edges(&b.id).count(), 2);
        assert_eq!(graph.in_edges(&a.id).count(), 0);
        assert_eq!(graph.out_edges("missing").count(), 0);
        assert_eq!(graph.node(&b.id).map(|n| n.name.as_str()), Some("b"));
        assert_eq!(graph.nodes().count(), graph.node_count());
        assert_eq!(graph.edges().count(), graph.edge_count());
    }

    #[test]
    fn test_summary() {
        let mut graph = LogicGraph::new();
        let (a, b, c) = (node("a"), node("b"), node("c"));
        for n in [&a, &b, &c] {
            graph.add_node(n.clone());
        }
        graph.add_edge(edge(&a, &b, EdgeKind::Calls));

        let summary = graph.summary();
        assert_eq!(summary.isolated_nodes, 1);
        assert_eq!(summary.weak_components, 2);
        assert!((summary.density - 1.0 / 6.0).abs() < 1e-9);
        assert_eq!(LogicGraph::new().summary().density, 0.0);
    }
}

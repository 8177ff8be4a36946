//! Directed graph used for the cumulative and the snapshot-only view.

use crate::edge::{Edge, NodeId};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

/// A simple directed graph keyed by node id.
///
/// Repeated `(src, trg)` pairs collapse into one edge. Node and edge
/// iteration follow insertion order, which keeps exports deterministic.
#[derive(Debug, Clone, Default)]
pub struct StreamGraph {
    inner: DiGraphMap<NodeId, ()>,
}

impl StreamGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with estimated capacity.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            inner: DiGraphMap::with_capacity(nodes, edges),
        }
    }

    /// Build a graph from a list of edges.
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(*edge);
        }
        graph
    }

    /// Add an edge. Returns `true` if it was not present before.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.inner.add_edge(edge.src, edge.trg, ()).is_none()
    }

    /// Whether the edge is present.
    pub fn contains_edge(&self, edge: Edge) -> bool {
        self.inner.contains_edge(edge.src, edge.trg)
    }

    /// Whether the node is present.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.inner.contains_node(node)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Remove every node and edge.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// All nodes.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.nodes()
    }

    /// All edges.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.inner.all_edges().map(|(src, trg, _)| Edge::new(src, trg))
    }

    /// Sources of the edges pointing at `node`.
    pub fn in_neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.neighbors_directed(node, Direction::Incoming)
    }

    /// Targets of the edges leaving `node`.
    pub fn out_neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.neighbors_directed(node, Direction::Outgoing)
    }

    /// In-degree of a node (0 when absent).
    pub fn in_degree(&self, node: NodeId) -> usize {
        if !self.inner.contains_node(node) {
            return 0;
        }
        self.in_neighbors(node).count()
    }

    /// Out-degree of a node (0 when absent).
    pub fn out_degree(&self, node: NodeId) -> usize {
        if !self.inner.contains_node(node) {
            return 0;
        }
        self.out_neighbors(node).count()
    }

    /// Merge every edge of `other` into this graph.
    pub fn extend_from(&mut self, other: &StreamGraph) {
        for edge in other.edges() {
            self.add_edge(edge);
        }
    }

    /// The underlying petgraph map, for advanced graph operations.
    pub fn as_graphmap(&self) -> &DiGraphMap<NodeId, ()> {
        &self.inner
    }
}

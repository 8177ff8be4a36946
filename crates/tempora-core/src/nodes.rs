//! Dense node index.

use crate::edge::NodeId;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Fixed mapping from node ids to dense positions.
///
/// Built once from the known node universe; positions never change for the
/// lifetime of the index.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    positions: HashMap<NodeId, usize>,
    nodes: Vec<NodeId>,
}

impl NodeIndex {
    /// Index a node universe. Duplicates keep their first position.
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut index = Self::default();
        for node in nodes {
            if let std::collections::hash_map::Entry::Vacant(slot) = index.positions.entry(node) {
                slot.insert(index.nodes.len());
                index.nodes.push(node);
            }
        }
        index
    }

    /// Position of a node.
    pub fn position(&self, node: NodeId) -> Result<usize> {
        self.positions
            .get(&node)
            .copied()
            .ok_or(Error::UnknownNode(node))
    }

    /// Node stored at a position.
    pub fn node(&self, position: usize) -> NodeId {
        self.nodes[position]
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the universe is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Release the backing storage.
    pub fn clear(&mut self) {
        self.positions = HashMap::new();
        self.nodes = Vec::new();
    }
}

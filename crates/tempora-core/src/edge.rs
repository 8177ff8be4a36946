//! Edge and time primitives.

use serde::{Deserialize, Serialize};

/// Node identifier as it appears in the input stream.
pub type NodeId = u64;

/// Event time: epoch seconds in epoch mode, running edge index in index mode.
pub type Timestamp = i64;

/// Dense id of a stored edge, assigned on first sight and never reused.
pub type EdgeId = usize;

/// A directed edge.
///
/// Identity is structural: the same `(src, trg)` pair can be replayed at a
/// different time than its original occurrence and still maps to the same
/// stored edge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID.
    pub src: NodeId,
    /// Target node ID.
    pub trg: NodeId,
}

impl Edge {
    /// Create a new edge.
    pub fn new(src: NodeId, trg: NodeId) -> Self {
        Self { src, trg }
    }

    /// Whether the edge starts and ends at the same node.
    pub fn is_loop(&self) -> bool {
        self.src == self.trg
    }
}

impl From<(NodeId, NodeId)> for Edge {
    fn from((src, trg): (NodeId, NodeId)) -> Self {
        Self::new(src, trg)
    }
}

/// A raw stream record: `(time, src, trg)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Time when the edge occurred.
    pub time: Timestamp,
    /// Source node ID.
    pub src: NodeId,
    /// Target node ID.
    pub trg: NodeId,
}

impl EdgeRecord {
    /// Create a new record.
    pub fn new(time: Timestamp, src: NodeId, trg: NodeId) -> Self {
        Self { time, src, trg }
    }

    /// The structural edge of this record.
    pub fn edge(&self) -> Edge {
        Edge::new(self.src, self.trg)
    }
}

impl PartialOrd for EdgeRecord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeRecord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.src.cmp(&other.src))
            .then_with(|| self.trg.cmp(&other.trg))
    }
}

/// Elapsed time between two events as the kernel input.
#[allow(clippy::cast_precision_loss)]
pub fn elapsed(now: Timestamp, then: Timestamp) -> f64 {
    (now - then) as f64
}

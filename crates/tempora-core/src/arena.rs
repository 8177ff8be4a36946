//! Indexed storage for per-edge state.
//!
//! Decayed-indegree style measures keep, for every edge that ever fired, its
//! last activation time and one weight per parameter variant. Edges are keyed
//! structurally by `(src, trg)` and receive a dense id the first time they are
//! seen. Replayed or predicted edges may not be part of the original stream,
//! so the arena needs room beyond the declared edge set.
//!
//! Two capacity policies exist:
//!
//! | Policy | Behavior when full |
//! |--------|-------------------|
//! | `Fixed { ratio }` | capacity `ceil(known * ratio)`, overflow is a fatal [`Error::EdgeCapacityExceeded`] |
//! | `Growable` | amortized growth, never fails |
//!
//! The fixed policy never grows and never overwrites an existing slot.

use crate::edge::{Edge, EdgeId, NodeId, Timestamp};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Default over-allocation factor for [`CapacityPolicy::Fixed`].
pub const DEFAULT_STORAGE_RATIO: f64 = 1.8;

/// How the arena treats edges beyond its initial size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Pre-sized to `ceil(known_edges * ratio)` slots; overflow is fatal.
    Fixed { ratio: f64 },
    /// Grows as needed.
    Growable,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self::Fixed {
            ratio: DEFAULT_STORAGE_RATIO,
        }
    }
}

/// Per-edge state: ids, last activation and a weight row per edge.
#[derive(Debug, Clone)]
pub struct EdgeArena {
    ids: HashMap<Edge, EdgeId>,
    edges: Vec<Edge>,
    last_activation: Vec<Timestamp>,
    /// Row-major, `width` weights per edge.
    weights: Vec<f64>,
    width: usize,
    fired: Vec<bool>,
    /// Fired in-edges per target node.
    incoming: HashMap<NodeId, SmallVec<[EdgeId; 8]>>,
    capacity: Option<usize>,
    min_time: Timestamp,
}

impl EdgeArena {
    /// Create an arena pre-registering `known` edges.
    ///
    /// Known edges get ids in order of first occurrence but only count as
    /// in-edges once they fire. Every edge starts with last activation
    /// `min_time` and zero weights.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn new(
        known: &[Edge],
        width: usize,
        policy: CapacityPolicy,
        min_time: Timestamp,
    ) -> Result<Self> {
        let mut ids = HashMap::with_capacity(known.len());
        let mut edges = Vec::with_capacity(known.len());
        for &edge in known {
            if let std::collections::hash_map::Entry::Vacant(slot) = ids.entry(edge) {
                slot.insert(edges.len());
                edges.push(edge);
            }
        }

        let capacity = match policy {
            CapacityPolicy::Fixed { ratio } => {
                if !(ratio.is_finite() && ratio >= 1.0) {
                    return Err(Error::invalid(format!(
                        "storage ratio must be >= 1.0, got {ratio}"
                    )));
                }
                Some((edges.len() as f64 * ratio).ceil() as usize)
            }
            CapacityPolicy::Growable => None,
        };
        let slots = capacity.unwrap_or(edges.len());

        let mut last_activation = Vec::with_capacity(slots);
        last_activation.resize(edges.len(), min_time);
        let mut weights = Vec::with_capacity(slots * width);
        weights.resize(edges.len() * width, 0.0);
        let mut fired = Vec::with_capacity(slots);
        fired.resize(edges.len(), false);

        Ok(Self {
            ids,
            edges,
            last_activation,
            weights,
            width,
            fired,
            incoming: HashMap::new(),
            capacity,
            min_time,
        })
    }

    /// Number of edges holding an id.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether no edge holds an id.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Maximum number of edges, `None` when growable.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Id of an edge, if assigned.
    pub fn id_of(&self, edge: Edge) -> Option<EdgeId> {
        self.ids.get(&edge).copied()
    }

    /// Mark an edge as fired, assigning an id if it has none.
    ///
    /// The first firing registers the edge as an in-edge of its target.
    pub fn activate(&mut self, edge: Edge) -> Result<EdgeId> {
        let id = match self.ids.get(&edge) {
            Some(&id) => id,
            None => self.insert(edge)?,
        };
        if !self.fired[id] {
            self.fired[id] = true;
            self.incoming.entry(edge.trg).or_default().push(id);
        }
        Ok(id)
    }

    fn insert(&mut self, edge: Edge) -> Result<EdgeId> {
        if let Some(capacity) = self.capacity {
            if self.edges.len() >= capacity {
                return Err(Error::EdgeCapacityExceeded { capacity });
            }
        }
        let id = self.edges.len();
        self.ids.insert(edge, id);
        self.edges.push(edge);
        self.last_activation.push(self.min_time);
        self.weights.extend(std::iter::repeat(0.0).take(self.width));
        self.fired.push(false);
        Ok(id)
    }

    /// Fired in-edges of a node.
    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        self.incoming.get(&node).map(SmallVec::as_slice).unwrap_or(&[])
    }

    /// The edge stored under an id.
    pub fn edge(&self, id: EdgeId) -> Edge {
        self.edges[id]
    }

    /// Last activation time of an edge.
    pub fn last_activation(&self, id: EdgeId) -> Timestamp {
        self.last_activation[id]
    }

    /// Weight row of an edge.
    pub fn weights(&self, id: EdgeId) -> &[f64] {
        &self.weights[id * self.width..(id + 1) * self.width]
    }

    /// Store a firing: new weights and activation time.
    pub fn record(&mut self, id: EdgeId, time: Timestamp, weights: &[f64]) {
        debug_assert_eq!(weights.len(), self.width);
        self.last_activation[id] = time;
        self.weights[id * self.width..(id + 1) * self.width].copy_from_slice(weights);
    }

    /// Release the backing storage.
    pub fn clear(&mut self) {
        self.ids = HashMap::new();
        self.edges = Vec::new();
        self.last_activation = Vec::new();
        self.weights = Vec::new();
        self.fired = Vec::new();
        self.incoming = HashMap::new();
    }
}

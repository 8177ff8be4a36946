//! Grouping of raw stream records by exact timestamp.

use crate::edge::{Edge, EdgeRecord, NodeId, Timestamp};
use std::collections::{BTreeMap, HashSet};

/// An edge stream grouped by timestamp.
///
/// Records sharing a timestamp keep their input order; timestamps are
/// visited in ascending order.
#[derive(Debug, Clone, Default)]
pub struct EdgeStream {
    by_time: BTreeMap<Timestamp, Vec<Edge>>,
    timestamps: Vec<Timestamp>,
    edge_count: usize,
}

impl EdgeStream {
    /// Index raw records.
    pub fn from_records(records: impl IntoIterator<Item = EdgeRecord>) -> Self {
        let mut by_time: BTreeMap<Timestamp, Vec<Edge>> = BTreeMap::new();
        let mut edge_count = 0;
        for record in records {
            by_time.entry(record.time).or_default().push(record.edge());
            edge_count += 1;
        }
        let timestamps = by_time.keys().copied().collect::<Vec<_>>();
        tracing::debug!(
            edges = edge_count,
            epochs = timestamps.len(),
            "indexed edge stream"
        );
        Self {
            by_time,
            timestamps,
            edge_count,
        }
    }

    /// Drop every record earlier than `min_time`.
    pub fn since(self, min_time: Timestamp) -> Self {
        let records = self
            .iter()
            .filter(|(t, _)| *t >= min_time)
            .map(|(t, e)| EdgeRecord::new(t, e.src, e.trg))
            .collect::<Vec<_>>();
        Self::from_records(records)
    }

    /// Sorted distinct timestamps.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Edges observed at exactly `time`, in input order.
    pub fn edges_at(&self, time: Timestamp) -> &[Edge] {
        self.by_time.get(&time).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of records (duplicates included).
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Whether the stream holds no record.
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Every record in stream order.
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &Edge)> + '_ {
        self.by_time
            .iter()
            .flat_map(|(t, edges)| edges.iter().map(move |e| (*t, e)))
    }

    /// Sorted node universe (sources and targets).
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = self
            .iter()
            .flat_map(|(_, e)| [e.src, e.trg])
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        nodes.sort_unstable();
        nodes
    }

    /// Distinct edges in order of first occurrence.
    pub fn distinct_edges(&self) -> Vec<Edge> {
        let mut seen = HashSet::new();
        self.iter()
            .filter_map(|(_, e)| seen.insert(*e).then_some(*e))
            .collect()
    }

    /// `(first, last)` timestamp, if any.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }
}

impl FromIterator<EdgeRecord> for EdgeStream {
    fn from_iter<I: IntoIterator<Item = EdgeRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EdgeStream {
        EdgeStream::from_records([
            EdgeRecord::new(300, 2, 3),
            EdgeRecord::new(100, 0, 1),
            EdgeRecord::new(100, 1, 2),
            EdgeRecord::new(200, 0, 1),
        ])
    }

    #[test]
    fn test_grouping() {
        let s = sample();
        assert_eq!(s.timestamps(), &[100, 200, 300]);
        assert_eq!(s.edge_count(), 4);
        assert_eq!(s.edges_at(100), &[Edge::new(0, 1), Edge::new(1, 2)]);
        assert!(s.edges_at(150).is_empty());
        assert_eq!(s.time_range(), Some((100, 300)));
    }

    #[test]
    fn test_stream_order() {
        let times: Vec<_> = sample().iter().map(|(t, _)| t).collect();
        assert_eq!(times, vec![100, 100, 200, 300]);
    }

    #[test]
    fn test_nodes_and_distinct_edges() {
        let s = sample();
        assert_eq!(s.nodes(), vec![0, 1, 2, 3]);
        assert_eq!(
            s.distinct_edges(),
            vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 3)]
        );
    }

    #[test]
    fn test_since() {
        let s = sample().since(200);
        assert_eq!(s.timestamps(), &[200, 300]);
        assert_eq!(s.edge_count(), 2);
    }
}

//! Prediction replay: hypothetical scores for the next interval.
//!
//! At a boundary an [`EdgeSimulator`] takes the candidate edges predicted for
//! the next interval, applies them to *copies* of the live computers at
//! `boundary + delta`, and exports the copies' scores as the next snapshot
//! under `predictions/{id}`. The live computers and graphs are never touched.
//!
//! | Order | Id | Replay sequence | Rating passed to `update` |
//! |-------|----|-----------------|---------------------------|
//! | `Descending` | `{name}` | highest rating first | none |
//! | `Ascending` | `reverse_{name}` | lowest rating first | none |
//! | `RatingWeighted` | `ranked_{name}` | highest rating first | `rating / max_rating` |
//! | `ReverseRatingWeighted` | `reverseranked_{name}` | lowest rating first | `rating / max_rating` |
//!
//! With `top_k` only the `k` best rated candidates are replayed and the id
//! gains a `_first_{k}` suffix.

use crate::error::Result;
use crate::sink::{ExportScope, ScopedLookup, SnapshotSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tempora_core::formats::predictions::{
    read_prediction_file, read_predictions, PredictionRecord,
};
use tempora_core::{Error, NodeId, StreamGraph, Timestamp};
use tempora_rank::{GraphContext, RankComputer, SnapshotContext};

/// Order in which predicted edges are replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOrder {
    #[default]
    Descending,
    Ascending,
    RatingWeighted,
    ReverseRatingWeighted,
}

impl ReplayOrder {
    fn id_prefix(self) -> &'static str {
        match self {
            Self::Descending => "",
            Self::Ascending => "reverse_",
            Self::RatingWeighted => "ranked_",
            Self::ReverseRatingWeighted => "reverseranked_",
        }
    }

    fn reversed(self) -> bool {
        matches!(self, Self::Ascending | Self::ReverseRatingWeighted)
    }

    fn weighted(self) -> bool {
        matches!(self, Self::RatingWeighted | Self::ReverseRatingWeighted)
    }
}

/// Candidate edges grouped by the interval they are predicted for.
#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    by_interval: BTreeMap<usize, Vec<PredictionRecord>>,
}

impl PredictionTable {
    pub fn from_records(records: impl IntoIterator<Item = PredictionRecord>) -> Self {
        let mut by_interval: BTreeMap<usize, Vec<PredictionRecord>> = BTreeMap::new();
        for record in records {
            by_interval.entry(record.interval).or_default().push(record);
        }
        // stable: equal ratings keep file order
        for rows in by_interval.values_mut() {
            rows.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        }
        Self { by_interval }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::from_records(read_predictions(reader)?))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::from_records(read_prediction_file(path)?))
    }

    /// Candidates of one interval, best rated first.
    pub fn interval(&self, interval: usize) -> &[PredictionRecord] {
        self.by_interval
            .get(&interval)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every node mentioned by a candidate, sorted.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = self
            .by_interval
            .values()
            .flatten()
            .flat_map(|r| [r.edge.src, r.edge.trg])
            .collect::<Vec<_>>();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Total number of candidates.
    pub fn len(&self) -> usize {
        self.by_interval.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_interval.is_empty()
    }
}

/// Replays predicted edges onto copies of the live computers.
#[derive(Debug, Clone)]
pub struct EdgeSimulator {
    id: String,
    order: ReplayOrder,
    delta: Timestamp,
    top_k: Option<usize>,
    predictions: PredictionTable,
}

impl EdgeSimulator {
    /// `delta` is the offset of the replay time from the boundary.
    pub fn new(
        name: &str,
        order: ReplayOrder,
        predictions: PredictionTable,
        delta: Timestamp,
        top_k: Option<usize>,
    ) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(Error::invalid(format!("invalid replay name {name:?}")).into());
        }
        if delta < 0 {
            return Err(Error::invalid(format!("replay delta must be >= 0, got {delta}")).into());
        }
        if top_k == Some(0) {
            return Err(Error::invalid("top_k must be positive").into());
        }
        let mut id = format!("{}{name}", order.id_prefix());
        if let Some(k) = top_k {
            id.push_str(&format!("_first_{k}"));
        }
        Ok(Self {
            id,
            order,
            delta,
            top_k,
            predictions,
        })
    }

    /// Output scope id, e.g. `ranked_lr_first_10`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn order(&self) -> ReplayOrder {
        self.order
    }

    pub fn scope(&self) -> ExportScope {
        ExportScope::Prediction(self.id.clone())
    }

    /// Replay the candidates of interval `index + 1` after boundary `index`.
    ///
    /// Returns `false` when there is nothing to replay.
    pub fn simulate(
        &self,
        index: usize,
        boundary: Timestamp,
        live: &[Box<dyn RankComputer>],
        total: &StreamGraph,
        sink: &mut dyn SnapshotSink,
    ) -> Result<bool> {
        let next = index + 1;
        let mut rows = self.predictions.interval(next).to_vec();
        if let Some(k) = self.top_k {
            rows.truncate(k);
        }
        if rows.is_empty() {
            tracing::warn!(
                simulator = %self.id,
                interval = next,
                "no predicted edges, replay skipped"
            );
            return Ok(false);
        }
        let max_rating = rows
            .iter()
            .map(|r| r.rating)
            .fold(f64::NEG_INFINITY, f64::max);
        if self.order.weighted() && max_rating <= 0.0 {
            return Err(Error::invalid(format!(
                "rating-weighted replay needs a positive maximum rating, \
                 interval {next} has {max_rating}"
            ))
            .into());
        }
        if self.order.reversed() {
            rows.reverse();
        }

        let time = boundary + self.delta;
        let mut copies = live.iter().map(|c| c.copy()).collect::<Vec<_>>();
        let mut total = total.clone();
        let mut snapshot = StreamGraph::new();
        for row in &rows {
            total.add_edge(row.edge);
            snapshot.add_edge(row.edge);
            let rating = self.order.weighted().then(|| row.rating / max_rating);
            let ctx = GraphContext {
                total: &total,
                snapshot: &snapshot,
            };
            for copy in &mut copies {
                copy.update(row.edge, time, &ctx, rating)?;
            }
        }

        let scope = self.scope();
        let ctx = SnapshotContext {
            index: next,
            time,
            total: &total,
            snapshot: &snapshot,
        };
        for copy in &mut copies {
            for table in copy.save_snapshot(&ctx)? {
                sink.write(&scope, next, &table)?;
            }
        }
        let lookup = ScopedLookup {
            sink: &*sink,
            scope: &scope,
        };
        for copy in &mut copies {
            copy.after_export(next, &lookup)?;
            copy.clear();
        }
        tracing::info!(
            simulator = %self.id,
            interval = next,
            replay_time = time,
            edges = rows.len(),
            "replay exported"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use approx::assert_relative_eq;
    use tempora_core::{DecayKernel, Edge, NodeIndex};
    use tempora_rank::{
        TemporalKatz, TemporalKatzParams, TemporalPageRank, TemporalPageRankParams,
    };

    fn katz(nodes: &[NodeId]) -> (String, Box<dyn RankComputer>) {
        let kernel = DecayKernel::constant(1.0).unwrap();
        let params = vec![TemporalKatzParams::new(1.0, kernel).unwrap()];
        let tk = TemporalKatz::new(NodeIndex::new(nodes.iter().copied()), params).unwrap();
        let label = tk.labels().remove(0);
        let boxed: Box<dyn RankComputer> = Box::new(tk);
        (label, boxed)
    }

    /// Replay interval 1 against fresh computers and return the sink.
    fn replay(simulator: &EdgeSimulator, live: &[Box<dyn RankComputer>]) -> MemorySink {
        let mut sink = MemorySink::new();
        let replayed = simulator
            .simulate(0, 100, live, &StreamGraph::new(), &mut sink)
            .unwrap();
        assert!(replayed);
        sink
    }

    fn record(interval: usize, src: NodeId, trg: NodeId, rating: f64) -> PredictionRecord {
        PredictionRecord {
            interval,
            edge: Edge::new(src, trg),
            rating,
        }
    }

    #[test]
    fn test_ids() {
        let id = |order, top_k| {
            EdgeSimulator::new("lr", order, PredictionTable::default(), 0, top_k)
                .unwrap()
                .id()
                .to_string()
        };
        assert_eq!(id(ReplayOrder::Descending, None), "lr");
        assert_eq!(id(ReplayOrder::Ascending, None), "reverse_lr");
        assert_eq!(id(ReplayOrder::RatingWeighted, Some(10)), "ranked_lr_first_10");
        assert_eq!(id(ReplayOrder::ReverseRatingWeighted, None), "reverseranked_lr");

        let t = PredictionTable::default;
        assert!(EdgeSimulator::new("lr", ReplayOrder::Descending, t(), -1, None).is_err());
        assert!(EdgeSimulator::new("lr", ReplayOrder::Descending, t(), 0, Some(0)).is_err());
    }

    #[test]
    fn test_interval_sorted_stable() {
        let table = PredictionTable::from_records(vec![
            record(1, 1, 2, 0.5),
            record(1, 3, 4, 0.9),
            record(1, 5, 6, 0.5),
            record(2, 7, 8, 0.1),
        ]);
        let edges = table.interval(1).iter().map(|r| r.edge).collect::<Vec<_>>();
        assert_eq!(edges, vec![Edge::new(3, 4), Edge::new(1, 2), Edge::new(5, 6)]);
        assert!(table.interval(3).is_empty());
        assert_eq!(table.len(), 4);
        assert_eq!(table.nodes(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_order_changes_walks() {
        // 1->2 before 2->3 opens the walk 1->2->3, the reverse order does not
        let table = || {
            PredictionTable::from_records(vec![record(1, 1, 2, 0.9), record(1, 2, 3, 0.5)])
        };
        let (label, tk) = katz(&[1, 2, 3]);
        let live = vec![tk];

        let descending =
            EdgeSimulator::new("lr", ReplayOrder::Descending, table(), 0, None).unwrap();
        let sink = replay(&descending, &live);
        let scores = sink.get(&descending.scope(), &label, 1).unwrap();
        assert_eq!(scores.get(2), Some(1.0));
        assert_eq!(scores.get(3), Some(2.0));

        let ascending =
            EdgeSimulator::new("lr", ReplayOrder::Ascending, table(), 0, None).unwrap();
        let sink = replay(&ascending, &live);
        let scores = sink.get(&ascending.scope(), &label, 1).unwrap();
        assert_eq!(scores.get(2), Some(1.0));
        assert_eq!(scores.get(3), Some(1.0));
    }

    #[test]
    fn test_top_k_keeps_best_rated() {
        let table = PredictionTable::from_records(vec![
            record(1, 2, 3, 0.5),
            record(1, 1, 2, 0.9),
            record(1, 3, 1, 0.1),
        ]);
        let (label, tk) = katz(&[1, 2, 3]);
        let simulator =
            EdgeSimulator::new("lr", ReplayOrder::Descending, table, 0, Some(1)).unwrap();
        let sink = replay(&simulator, &[tk]);

        let scope = ExportScope::Prediction("lr_first_1".into());
        let scores = sink.get(&scope, &label, 1).unwrap();
        assert_eq!(scores.get(2), Some(1.0));
        assert_eq!(scores.get(1), None);
        assert_eq!(scores.get(3), None);
    }

    #[test]
    fn test_rating_weighted_normalizes() {
        let table =
            PredictionTable::from_records(vec![record(1, 1, 2, 0.8), record(1, 3, 4, 0.4)]);
        let p = TemporalPageRankParams::new(0.85, 0.1).unwrap();
        let tpr = TemporalPageRank::new(NodeIndex::new([1, 2, 3, 4]), vec![p]).unwrap();
        let label = tpr.labels().remove(0);
        let simulator =
            EdgeSimulator::new("lr", ReplayOrder::RatingWeighted, table, 0, None).unwrap();
        let live: Vec<Box<dyn RankComputer>> = vec![Box::new(tpr)];
        let sink = replay(&simulator, &live);

        let scores = sink.get(&simulator.scope(), &label, 1).unwrap();
        // 1->2 replays with rating 0.8 / 0.8 = 1, 3->4 with 0.4 / 0.8 = 0.5
        assert_relative_eq!(scores.get(1).unwrap(), 0.15);
        assert_relative_eq!(scores.get(2).unwrap(), 0.15 * 0.85);
        assert_relative_eq!(scores.get(3).unwrap(), 0.5 * 0.15);
        assert_relative_eq!(scores.get(4).unwrap(), 0.5 * 0.15 * 0.85);
    }

    #[test]
    fn test_empty_interval_skipped() {
        let (_, tk) = katz(&[1, 2]);
        let table = PredictionTable::default();
        let simulator =
            EdgeSimulator::new("lr", ReplayOrder::Descending, table, 0, None).unwrap();
        let mut sink = MemorySink::new();
        let replayed = simulator
            .simulate(0, 100, &[tk], &StreamGraph::new(), &mut sink)
            .unwrap();
        assert!(!replayed);
        assert!(sink.is_empty());
    }
}

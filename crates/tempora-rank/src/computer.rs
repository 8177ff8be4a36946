//! The rank computer interface shared by every measure.
//!
//! A computer owns per-node (and sometimes per-edge) state for one or more
//! parameter variants of a measure. The simulator feeds it edges in
//! non-decreasing time order through [`RankComputer::update`] and asks for
//! the current scores at every boundary through
//! [`RankComputer::save_snapshot`]. Scores are returned in memory; writing
//! them anywhere is the caller's job.

use std::fmt;
use tempora_core::{Edge, Error, NodeId, Result, ScoreMap, StreamGraph, Timestamp};

/// Graphs visible to a computer while an edge is applied.
///
/// The edge being applied is already part of both graphs.
#[derive(Debug, Clone, Copy)]
pub struct GraphContext<'a> {
    /// Every edge applied so far.
    pub total: &'a StreamGraph,
    /// Edges applied since the last boundary.
    pub snapshot: &'a StreamGraph,
}

/// Everything a computer sees at a boundary.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotContext<'a> {
    /// Snapshot (interval) index of the export.
    pub index: usize,
    /// Boundary time; scores are decayed to this time.
    pub time: Timestamp,
    /// Every edge applied so far.
    pub total: &'a StreamGraph,
    /// Edges of the interval that just closed.
    pub snapshot: &'a StreamGraph,
}

/// Scores of one parameter variant at one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    /// Canonical label of the parameter variant.
    pub label: String,
    /// File prefix of the measure (`tk`, `tpr`, ...).
    pub prefix: &'static str,
    rows: Vec<(NodeId, f64)>,
}

impl ScoreTable {
    /// Build a table keeping rows with a strictly positive score, sorted by node id.
    pub fn new(label: impl Into<String>, prefix: &'static str, rows: Vec<(NodeId, f64)>) -> Self {
        let mut rows = rows
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .collect::<Vec<_>>();
        rows.sort_unstable_by_key(|(node, _)| *node);
        Self {
            label: label.into(),
            prefix,
            rows,
        }
    }

    /// Rows sorted by node id.
    pub fn rows(&self) -> &[(NodeId, f64)] {
        &self.rows
    }

    /// Score of a node, if exported.
    pub fn get(&self, node: NodeId) -> Option<f64> {
        self.rows
            .binary_search_by_key(&node, |(n, _)| *n)
            .ok()
            .map(|i| self.rows[i].1)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `"{label}/{prefix}"`, the key other computers use to refer to this table.
    pub fn part(&self) -> String {
        format!("{}/{}", self.label, self.prefix)
    }
}

/// Read access to tables exported earlier in the same scope.
///
/// `part` is `"{label}/{prefix}"`, e.g. `"tk_b0.50_Const(1.00)/tk"`.
pub trait ScoreLookup {
    fn scores(&self, part: &str, index: usize) -> Result<ScoreMap>;
}

/// A stateful centrality engine driven by an edge stream.
pub trait RankComputer: fmt::Debug {
    /// Short measure name used in logs.
    fn name(&self) -> &'static str;

    /// Canonical labels of every table this computer exports.
    fn labels(&self) -> Vec<String>;

    /// Apply one edge at `time`.
    ///
    /// `rating`, when given, blends the freshly computed values with the
    /// previously stored ones: `rating * new + (1 - rating) * old`. The Katz
    /// computers validate it but count walks unweighted.
    fn update(
        &mut self,
        edge: Edge,
        time: Timestamp,
        graphs: &GraphContext<'_>,
        rating: Option<f64>,
    ) -> Result<()>;

    /// Current scores, one table per exported label.
    fn save_snapshot(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<ScoreTable>>;

    /// Hook run once all computers have exported snapshot `index`.
    fn after_export(&mut self, _index: usize, _scores: &dyn ScoreLookup) -> Result<()> {
        Ok(())
    }

    /// Fully independent deep copy.
    fn copy(&self) -> Box<dyn RankComputer>;

    /// Drop backing storage. The computer must not be used afterwards.
    fn clear(&mut self);
}

/// Validate an optional replay rating.
pub(crate) fn check_rating(rating: Option<f64>) -> Result<()> {
    match rating {
        Some(r) if !(0.0..=1.0).contains(&r) => Err(Error::invalid(format!(
            "rating must be from interval [0,1], got {r}"
        ))),
        _ => Ok(()),
    }
}

/// `rating * new + (1 - rating) * old`, or `new` without a rating.
#[inline]
pub(crate) fn blend(rating: Option<f64>, new: f64, old: f64) -> f64 {
    match rating {
        Some(r) => r * new + (1.0 - r) * old,
        None => new,
    }
}

/// Reject events earlier than a node's last activation.
pub(crate) fn check_time(node: NodeId, last: Option<Timestamp>, time: Timestamp) -> Result<()> {
    match last {
        Some(last) if time < last => Err(Error::TimeRegression { node, last, time }),
        _ => Ok(()),
    }
}

/// Offset of `param` in row `row` of a row-major `width`-column score array.
pub(crate) fn row_slot(row: usize, param: usize, width: usize) -> Result<usize> {
    if param >= width {
        return Err(Error::invalid(format!(
            "parameter index {param} out of range for {width} parameter sets"
        )));
    }
    Ok(row * width + param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_table_filters_and_sorts() {
        let table = ScoreTable::new("x", "p", vec![(5, 1.0), (2, 0.0), (1, 3.0), (9, -1.0)]);
        assert_eq!(table.rows(), &[(1, 3.0), (5, 1.0)]);
        assert_eq!(table.get(5), Some(1.0));
        assert_eq!(table.get(2), None);
        assert_eq!(table.part(), "x/p");
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(None, 4.0, 2.0), 4.0);
        assert_eq!(blend(Some(0.5), 4.0, 2.0), 3.0);
        assert_eq!(blend(Some(0.0), 4.0, 2.0), 2.0);
        assert!(check_rating(Some(1.5)).is_err());
        assert!(check_rating(Some(1.0)).is_ok());
    }

    #[test]
    fn test_check_time() {
        assert!(check_time(1, None, 0).is_ok());
        assert!(check_time(1, Some(5), 5).is_ok());
        assert!(matches!(
            check_time(1, Some(5), 4),
            Err(Error::TimeRegression { node: 1, last: 5, time: 4 })
        ));
    }
}

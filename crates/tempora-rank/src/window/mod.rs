//! Window-aggregated static measures.
//!
//! These measures ignore individual edge events. At every boundary the graph
//! of the last `lookback` intervals is rebuilt from the retained snapshot
//! batches (or the cumulative graph is used when `lookback == 0`) and the
//! measure is recomputed from scratch. They are the baselines the incremental
//! measures are compared against.
//!
//! Parameter variants are independent at a boundary and are computed in
//! parallel with rayon; no computer state is shared between them.

pub mod measures;

use crate::computer::{GraphContext, RankComputer, ScoreTable, SnapshotContext};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tempora_core::{Edge, Error, Result, StreamGraph, Timestamp};

/// The static measure to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "measure", rename_all = "snake_case")]
pub enum StaticMeasure {
    /// Power-iteration PageRank.
    #[serde(rename = "pagerank")]
    PageRank {
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
    },
    Indegree,
    Harmonic,
    /// Reciprocal out-degree weighted indegree.
    NegativeBeta,
}

fn default_alpha() -> f64 {
    0.85
}

fn default_max_iter() -> usize {
    100
}

impl StaticMeasure {
    /// File prefix of exported tables.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::PageRank { .. } => "spr",
            Self::Indegree => "indeg",
            Self::Harmonic => "hc",
            Self::NegativeBeta => "nbm",
        }
    }
}

/// One static measure over one window size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticWindowParams {
    #[serde(flatten)]
    pub measure: StaticMeasure,
    /// Number of past intervals aggregated; `0` means the cumulative graph.
    #[serde(default)]
    pub lookback: usize,
}

impl StaticWindowParams {
    pub fn pagerank(lookback: usize, alpha: f64, max_iter: usize) -> Result<Self> {
        Self::checked(StaticMeasure::PageRank { alpha, max_iter }, lookback)
    }

    pub fn indegree(lookback: usize) -> Self {
        Self {
            measure: StaticMeasure::Indegree,
            lookback,
        }
    }

    pub fn harmonic(lookback: usize) -> Self {
        Self {
            measure: StaticMeasure::Harmonic,
            lookback,
        }
    }

    pub fn negative_beta(lookback: usize) -> Self {
        Self {
            measure: StaticMeasure::NegativeBeta,
            lookback,
        }
    }

    fn checked(measure: StaticMeasure, lookback: usize) -> Result<Self> {
        let params = Self { measure, lookback };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if let StaticMeasure::PageRank { alpha, max_iter } = self.measure {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(Error::invalid(format!(
                    "'alpha' must be from interval (0,1), got {alpha}"
                )));
            }
            if max_iter == 0 {
                return Err(Error::invalid("'max_iter' must be positive"));
            }
        }
        Ok(())
    }

    /// `total` or `snapshot_{lookback}`.
    pub fn window(&self) -> String {
        if self.lookback == 0 {
            "total".to_string()
        } else {
            format!("snapshot_{}", self.lookback)
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StaticWindowParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = self.window();
        match self.measure {
            StaticMeasure::PageRank { alpha, max_iter } => {
                write!(f, "spr_{window}_a{alpha:.2}_i{max_iter}")
            }
            StaticMeasure::Indegree => write!(f, "indeg_{window}"),
            StaticMeasure::Harmonic => write!(f, "hc_{window}"),
            StaticMeasure::NegativeBeta => write!(f, "nbm_{window}"),
        }
    }
}

/// Static measures over sliding windows of snapshot batches.
#[derive(Debug, Clone)]
pub struct StaticWindow {
    params: Vec<StaticWindowParams>,
    /// Most recent batch last; at most `max(lookback)` batches.
    batches: VecDeque<Vec<Edge>>,
    depth: usize,
}

impl StaticWindow {
    pub fn new(params: Vec<StaticWindowParams>) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::invalid("static window needs at least one parameter set"));
        }
        for p in &params {
            p.validate()?;
        }
        let depth = params.iter().map(|p| p.lookback).max().unwrap_or(0);
        Ok(Self {
            params,
            batches: VecDeque::with_capacity(depth),
            depth,
        })
    }

    /// Number of retained snapshot batches.
    pub fn retained(&self) -> usize {
        self.batches.len()
    }

    /// Union of the last `lookback` batches.
    fn window_graph(&self, lookback: usize) -> StreamGraph {
        let skip = self.batches.len().saturating_sub(lookback);
        let mut graph = StreamGraph::new();
        for batch in self.batches.iter().skip(skip) {
            for &edge in batch {
                graph.add_edge(edge);
            }
        }
        graph
    }

    fn compute(&self, p: &StaticWindowParams, total: &StreamGraph) -> ScoreTable {
        let owned;
        let graph = if p.lookback == 0 {
            total
        } else {
            owned = self.window_graph(p.lookback);
            &owned
        };
        let rows = match p.measure {
            StaticMeasure::PageRank { alpha, max_iter } => {
                let run = measures::pagerank(graph, alpha, max_iter);
                if !run.converged {
                    tracing::warn!(
                        label = %p,
                        iterations = run.iterations,
                        "pagerank did not converge"
                    );
                }
                run.scores
            }
            StaticMeasure::Indegree => measures::indegree(graph),
            StaticMeasure::Harmonic => measures::harmonic(graph),
            StaticMeasure::NegativeBeta => measures::negative_beta(graph),
        };
        ScoreTable::new(p.label(), p.measure.prefix(), rows)
    }
}

impl RankComputer for StaticWindow {
    fn name(&self) -> &'static str {
        "static_window"
    }

    fn labels(&self) -> Vec<String> {
        self.params.iter().map(StaticWindowParams::label).collect()
    }

    /// Static measures only change at boundaries.
    fn update(
        &mut self,
        _edge: Edge,
        _time: Timestamp,
        _graphs: &GraphContext<'_>,
        _rating: Option<f64>,
    ) -> Result<()> {
        Ok(())
    }

    fn save_snapshot(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<ScoreTable>> {
        if self.depth > 0 {
            self.batches.push_back(ctx.snapshot.edges().collect());
            while self.batches.len() > self.depth {
                self.batches.pop_front();
            }
        }
        let this = &*self;
        let tables = this
            .params
            .par_iter()
            .map(|p| this.compute(p, ctx.total))
            .collect::<Vec<_>>();
        tracing::debug!(
            index = ctx.index,
            variants = tables.len(),
            retained = self.batches.len(),
            "static window recomputed"
        );
        Ok(tables)
    }

    fn copy(&self) -> Box<dyn RankComputer> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        self.batches = VecDeque::new();
    }
}

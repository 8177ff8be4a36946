//! JSON run configuration.
//!
//! ```json
//! {
//!   "time_type": "epoch",
//!   "boundaries": { "start": 1000, "delta": 3600, "count": 24 },
//!   "storage": { "policy": "fixed", "ratio": 1.8 },
//!   "computers": [
//!     { "computer": "temporal_katz", "params": [{ "beta": 0.5, "kernel": { "kind": "exponential", "norm": 3600, "base": 0.5 } }] },
//!     { "computer": "static_window", "params": [{ "measure": "pagerank", "lookback": 0 }] }
//!   ],
//!   "replays": [{ "predictions": "preds.txt", "name": "lr", "order": "rating_weighted", "top_k": 100 }]
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempora_core::{CapacityPolicy, EdgeStream, NodeId, NodeIndex, Timestamp};
use tempora_rank::{
    DecayedIndegree, DecayedIndegreeParams, OnlineRank, OnlineRankParams, RankComputer,
    StaticWindow, StaticWindowParams, TemporalKatz, TemporalKatzParams, TemporalPageRank,
    TemporalPageRankParams, TruncatedTemporalKatz, TruncatedTemporalKatzParams,
};
use tempora_sim::{EdgeSimulator, PredictionTable, ReplayOrder, RunOptions, TimeType};

/// Snapshot boundaries, listed or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundarySpec {
    List(Vec<Timestamp>),
    /// `start, start + delta, ..., start + (count - 1) * delta`.
    Range {
        start: Timestamp,
        delta: Timestamp,
        count: usize,
    },
}

impl BoundarySpec {
    pub fn resolve(&self) -> Result<Vec<Timestamp>> {
        match self {
            Self::List(list) => Ok(list.clone()),
            Self::Range { start, delta, count } => {
                if *delta <= 0 {
                    bail!("boundary delta must be positive, got {delta}");
                }
                let mut boundaries = Vec::with_capacity(*count);
                let mut next = *start;
                for _ in 0..*count {
                    boundaries.push(next);
                    next = next
                        .checked_add(*delta)
                        .context("boundary range overflows the timestamp type")?;
                }
                Ok(boundaries)
            }
        }
    }
}

/// One computer and its parameter variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "computer", rename_all = "snake_case")]
pub enum ComputerConfig {
    TemporalKatz {
        params: Vec<TemporalKatzParams>,
    },
    TruncatedTemporalKatz {
        /// Number of layers (maximum walk length).
        k: usize,
        params: Vec<TruncatedTemporalKatzParams>,
    },
    #[serde(rename = "temporal_pagerank")]
    TemporalPageRank {
        params: Vec<TemporalPageRankParams>,
    },
    OnlineRank {
        params: Vec<OnlineRankParams>,
    },
    DecayedIndegree {
        params: Vec<DecayedIndegreeParams>,
    },
    StaticWindow {
        params: Vec<StaticWindowParams>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Prediction file: `interval src trg rating` rows.
    pub predictions: PathBuf,
    pub name: String,
    #[serde(default)]
    pub order: ReplayOrder,
    /// Offset of the replay time from the boundary.
    #[serde(default)]
    pub delta: Timestamp,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub time_type: TimeType,
    pub boundaries: BoundarySpec,
    #[serde(default)]
    pub max_snapshots: Option<usize>,
    #[serde(default)]
    pub max_edges: Option<usize>,
    /// Drop stream records before this time. Also the initial activation time
    /// of stored edges; defaults to the first stream timestamp.
    #[serde(default)]
    pub min_time: Option<Timestamp>,
    #[serde(default)]
    pub storage: CapacityPolicy,
    pub computers: Vec<ComputerConfig>,
    #[serde(default)]
    pub replays: Vec<ReplayConfig>,
}

impl RunConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn options(&self) -> RunOptions {
        RunOptions {
            max_snapshots: self.max_snapshots,
            max_edges: self.max_edges,
        }
    }

    /// Apply `min_time` to a freshly loaded stream.
    pub fn filter_stream(&self, stream: EdgeStream) -> EdgeStream {
        match self.min_time {
            Some(t) => stream.since(t),
            None => stream,
        }
    }

    /// Load every replay's prediction table.
    pub fn load_replays(&self) -> Result<Vec<(EdgeSimulator, Vec<NodeId>)>> {
        self.replays
            .iter()
            .map(|r| {
                let table = PredictionTable::from_path(&r.predictions).with_context(|| {
                    format!("Failed to load predictions {}", r.predictions.display())
                })?;
                let nodes = table.nodes();
                let sim = EdgeSimulator::new(&r.name, r.order, table, r.delta, r.top_k)?;
                Ok((sim, nodes))
            })
            .collect()
    }

    /// Build every configured computer.
    ///
    /// The node universe is the stream's nodes plus `extra_nodes` (nodes that
    /// only appear in predictions); the stream's distinct edges size edge storage.
    pub fn build_computers(
        &self,
        stream: &EdgeStream,
        extra_nodes: &[NodeId],
    ) -> Result<Vec<Box<dyn RankComputer>>> {
        if self.computers.is_empty() {
            bail!("config lists no computers");
        }
        let universe: BTreeSet<NodeId> = stream
            .nodes()
            .into_iter()
            .chain(extra_nodes.iter().copied())
            .collect();
        let nodes = NodeIndex::new(universe);
        let known = stream.distinct_edges();
        let min_time = match self.time_type {
            TimeType::Index => 0,
            TimeType::Epoch => self
                .min_time
                .or_else(|| stream.time_range().map(|(first, _)| first))
                .unwrap_or(0),
        };

        let mut computers: Vec<Box<dyn RankComputer>> = Vec::with_capacity(self.computers.len());
        for config in &self.computers {
            let computer: Box<dyn RankComputer> = match config {
                ComputerConfig::TemporalKatz { params } => {
                    Box::new(TemporalKatz::new(nodes.clone(), params.clone())?)
                }
                ComputerConfig::TruncatedTemporalKatz { k, params } => {
                    Box::new(TruncatedTemporalKatz::new(nodes.clone(), params.clone(), *k)?)
                }
                ComputerConfig::TemporalPageRank { params } => {
                    Box::new(TemporalPageRank::new(nodes.clone(), params.clone())?)
                }
                ComputerConfig::OnlineRank { params } => Box::new(OnlineRank::new(
                    nodes.clone(),
                    &known,
                    params.clone(),
                    self.storage,
                    min_time,
                )?),
                ComputerConfig::DecayedIndegree { params } => Box::new(DecayedIndegree::new(
                    nodes.clone(),
                    &known,
                    params.clone(),
                    self.storage,
                    min_time,
                )?),
                ComputerConfig::StaticWindow { params } => {
                    Box::new(StaticWindow::new(params.clone())?)
                }
            };
            computers.push(computer);
        }
        Ok(computers)
    }
}

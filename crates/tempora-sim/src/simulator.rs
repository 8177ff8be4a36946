//! The stream driver.
//!
//! # Boundary rule
//!
//! Boundaries partition the stream into intervals; interval `i` holds every
//! edge with time in `(boundaries[i-1], boundaries[i]]`. For each distinct
//! time `t` in ascending order the simulator:
//!
//! 1. exports every pending boundary `< t` (an interval without edges still
//!    exports, with an empty snapshot graph),
//! 2. applies every edge at `t` to both graphs and all computers,
//! 3. exports the boundary `== t`, if any.
//!
//! When the stream is exhausted every remaining boundary is exported in
//! order: the first carries the partial interval, the others are empty.
//! Each export clears the snapshot-only graph exactly once.
//!
//! In [`TimeType::Index`] mode every edge is its own time step: the `n`-th
//! edge (1-based) is applied at time `n`, and boundaries count edges.
//!
//! # Limits
//!
//! - `max_snapshots` stops after that many exports.
//! - `max_edges` stops after that many applied edges; the boundary being
//!   filled is exported and later boundaries are not.

use crate::error::{Result, SimError};
use crate::replay::EdgeSimulator;
use crate::sink::{ExportScope, ScopedLookup, SnapshotSink};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tempora_core::{Edge, EdgeStream, StreamGraph, Timestamp};
use tempora_rank::{GraphContext, RankComputer, SnapshotContext};

/// How event time is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeType {
    /// Stream timestamps, boundaries are epoch seconds.
    #[default]
    Epoch,
    /// Running edge index, boundaries are edge counts.
    Index,
}

impl FromStr for TimeType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "epoch" => Ok(Self::Epoch),
            "index" => Ok(Self::Index),
            other => Err(SimError::InvalidTimeType(other.to_string())),
        }
    }
}

impl fmt::Display for TimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Epoch => "epoch",
            Self::Index => "index",
        })
    }
}

/// Graph sizes at one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    /// Snapshot index.
    pub index: usize,
    /// Boundary the snapshot was taken at.
    pub boundary: Timestamp,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub snapshot_nodes: usize,
    pub snapshot_edges: usize,
}

/// Limits of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Stop after this many exports.
    #[serde(default)]
    pub max_snapshots: Option<usize>,
    /// Stop after this many applied edges, exporting the current boundary.
    #[serde(default)]
    pub max_edges: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Streaming,
    Terminated,
}

/// Drives registered computers over an edge stream and exports at boundaries.
#[derive(Debug)]
pub struct GraphSimulator {
    stream: EdgeStream,
    time_type: TimeType,
    computers: Vec<Box<dyn RankComputer>>,
    labels: HashSet<String>,
    replays: Vec<EdgeSimulator>,
    state: State,
    total: StreamGraph,
}

impl GraphSimulator {
    pub fn new(stream: EdgeStream, time_type: TimeType) -> Self {
        Self {
            stream,
            time_type,
            computers: Vec::new(),
            labels: HashSet::new(),
            replays: Vec::new(),
            state: State::Idle,
            total: StreamGraph::new(),
        }
    }

    pub fn time_type(&self) -> TimeType {
        self.time_type
    }

    pub fn stream(&self) -> &EdgeStream {
        &self.stream
    }

    /// Register a computer. Every exported label must be unique across the run.
    pub fn register(&mut self, computer: Box<dyn RankComputer>) -> Result<()> {
        if self.state != State::Idle {
            return Err(SimError::AlreadyRun);
        }
        let labels = computer.labels();
        let mut seen = HashSet::new();
        for label in &labels {
            if self.labels.contains(label) || !seen.insert(label.as_str()) {
                return Err(SimError::LabelCollision(label.clone()));
            }
        }
        tracing::debug!(computer = computer.name(), variants = labels.len(), "registered computer");
        self.labels.extend(labels);
        self.computers.push(computer);
        Ok(())
    }

    /// Add a replay simulator. With at least one replay, boundaries export
    /// replayed copies instead of the live computers.
    pub fn add_replay(&mut self, replay: EdgeSimulator) -> Result<()> {
        if self.state != State::Idle {
            return Err(SimError::AlreadyRun);
        }
        if self.replays.iter().any(|r| r.id() == replay.id()) {
            return Err(SimError::DuplicateReplay(replay.id().to_string()));
        }
        self.replays.push(replay);
        Ok(())
    }

    pub fn computers(&self) -> &[Box<dyn RankComputer>] {
        &self.computers
    }

    /// Hand back the computers, e.g. to inspect their final state.
    pub fn into_computers(self) -> Vec<Box<dyn RankComputer>> {
        self.computers
    }

    /// The cumulative graph built so far.
    pub fn total_graph(&self) -> &StreamGraph {
        &self.total
    }

    /// Run one pass over the stream.
    ///
    /// Returns one [`SnapshotStats`] per export.
    pub fn run_with_boundaries(
        &mut self,
        boundaries: &[Timestamp],
        options: RunOptions,
        sink: &mut dyn SnapshotSink,
    ) -> Result<Vec<SnapshotStats>> {
        if self.state != State::Idle {
            return Err(SimError::AlreadyRun);
        }
        validate_boundaries(boundaries)?;
        if options.max_snapshots == Some(0) {
            return Err(SimError::InvalidBoundaries("max_snapshots must be positive".into()));
        }
        if options.max_edges == Some(0) {
            return Err(SimError::InvalidBoundaries("max_edges must be positive".into()));
        }
        self.state = State::Streaming;
        tracing::info!(
            time_type = %self.time_type,
            edges = self.stream.edge_count(),
            boundaries = boundaries.len(),
            computers = self.computers.len(),
            replays = self.replays.len(),
            "simulation started"
        );

        let limit = options
            .max_snapshots
            .map_or(boundaries.len(), |m| m.min(boundaries.len()));
        let Self {
            stream,
            time_type,
            computers,
            replays,
            total,
            ..
        } = self;
        let stream: &EdgeStream = stream;
        let stats = {
            let mut pass = Pass {
                boundaries: &boundaries[..limit],
                computers,
                replays: replays.as_slice(),
                total,
                snapshot: StreamGraph::new(),
                sink,
                next: 0,
                applied: 0,
                max_edges: options.max_edges,
                stats: Vec::with_capacity(limit),
            };
            let steps: Box<dyn Iterator<Item = (Timestamp, &[Edge])> + '_> = match *time_type {
                TimeType::Epoch => Box::new(
                    stream
                        .timestamps()
                        .iter()
                        .map(move |&t| (t, stream.edges_at(t))),
                ),
                TimeType::Index => Box::new(
                    stream
                        .iter()
                        .enumerate()
                        .map(|(n, (_, edge))| (step_time(n), std::slice::from_ref(edge))),
                ),
            };
            let mut stopped = false;
            for (time, edges) in steps {
                if !pass.step(time, edges)? {
                    stopped = true;
                    break;
                }
            }
            if !stopped {
                pass.drain()?;
            }
            pass.stats
        };
        self.state = State::Terminated;
        tracing::info!(snapshots = stats.len(), "simulation finished");
        Ok(stats)
    }
}

/// Time of the `n`-th (0-based) edge in index mode.
fn step_time(n: usize) -> Timestamp {
    Timestamp::try_from(n + 1).unwrap_or(Timestamp::MAX)
}

fn validate_boundaries(boundaries: &[Timestamp]) -> Result<()> {
    if boundaries.is_empty() {
        return Err(SimError::InvalidBoundaries("no boundaries given".into()));
    }
    if let Some(w) = boundaries.windows(2).find(|w| w[0] >= w[1]) {
        return Err(SimError::InvalidBoundaries(format!(
            "boundaries must be strictly increasing, found {} before {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// State of one pass over the stream.
struct Pass<'a> {
    boundaries: &'a [Timestamp],
    computers: &'a mut Vec<Box<dyn RankComputer>>,
    replays: &'a [EdgeSimulator],
    total: &'a mut StreamGraph,
    snapshot: StreamGraph,
    sink: &'a mut dyn SnapshotSink,
    /// Index of the next boundary to export.
    next: usize,
    applied: usize,
    max_edges: Option<usize>,
    stats: Vec<SnapshotStats>,
}

impl Pass<'_> {
    fn done(&self) -> bool {
        self.next >= self.boundaries.len()
    }

    /// Process one time step. Returns `false` once the pass is over.
    fn step(&mut self, time: Timestamp, edges: &[Edge]) -> Result<bool> {
        while !self.done() && self.boundaries[self.next] < time {
            self.export()?;
        }
        if self.done() {
            return Ok(false);
        }
        for &edge in edges {
            self.apply(edge, time)?;
            if self.max_edges.is_some_and(|m| self.applied >= m) {
                tracing::info!(edges = self.applied, "edge limit reached");
                self.export()?;
                return Ok(false);
            }
        }
        if self.boundaries[self.next] == time {
            self.export()?;
        }
        Ok(!self.done())
    }

    fn apply(&mut self, edge: Edge, time: Timestamp) -> Result<()> {
        self.total.add_edge(edge);
        self.snapshot.add_edge(edge);
        self.applied += 1;
        let ctx = GraphContext {
            total: &*self.total,
            snapshot: &self.snapshot,
        };
        for computer in self.computers.iter_mut() {
            computer.update(edge, time, &ctx, None)?;
        }
        Ok(())
    }

    /// Export every boundary not reached by the stream.
    fn drain(&mut self) -> Result<()> {
        while !self.done() {
            self.export()?;
        }
        Ok(())
    }

    /// Export the next boundary and clear the snapshot graph.
    fn export(&mut self) -> Result<()> {
        let index = self.next;
        let boundary = self.boundaries[index];
        let stats = SnapshotStats {
            index,
            boundary,
            total_nodes: self.total.node_count(),
            total_edges: self.total.edge_count(),
            snapshot_nodes: self.snapshot.node_count(),
            snapshot_edges: self.snapshot.edge_count(),
        };

        if self.replays.is_empty() {
            let scope = ExportScope::Original;
            let ctx = SnapshotContext {
                index,
                time: boundary,
                total: &*self.total,
                snapshot: &self.snapshot,
            };
            for computer in self.computers.iter_mut() {
                for table in computer.save_snapshot(&ctx)? {
                    self.sink.write(&scope, index, &table)?;
                }
            }
            let lookup = ScopedLookup {
                sink: &*self.sink,
                scope: &scope,
            };
            for computer in self.computers.iter_mut() {
                computer.after_export(index, &lookup)?;
            }
            tracing::info!(interval = index, boundary, "snapshot exported");
        } else {
            for replay in self.replays {
                replay.simulate(
                    index,
                    boundary,
                    self.computers.as_slice(),
                    &*self.total,
                    &mut *self.sink,
                )?;
            }
        }
        tracing::debug!(
            total_nodes = stats.total_nodes,
            total_edges = stats.total_edges,
            snapshot_nodes = stats.snapshot_nodes,
            snapshot_edges = stats.snapshot_edges,
            "graph sizes"
        );

        self.snapshot.clear();
        self.stats.push(stats);
        self.next += 1;
        Ok(())
    }
}

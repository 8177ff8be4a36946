//! In-edge reconstructed measures: online rank and decayed indegree.
//!
//! Neither measure keeps a running per-node score. A node's score is rebuilt
//! on demand from its fired in-edges, each re-decayed from its own last
//! activation:
//!
//! | Measure | `rank(v, T)` |
//! |---------|--------------|
//! | OnlineRank | `alpha + Σ_{u->v} beta * W(T - last(u->v)) * weight(u->v)` |
//! | DecayedIndegree | `Σ_{u->v} b(u) * W(T - last(u->v))` |
//!
//! On an edge `s -> t` at `T` the source rank `rank(s, T)` is computed and
//! stored as the edge's weight, and the edge's activation time is set to `T`.
//! A query costs `O(in-degree)`.
//!
//! Edge state lives in an [`EdgeArena`]. Replayed edges that never occurred in
//! the stream need their own slots, so the arena is sized with headroom (or
//! grows, depending on its [`CapacityPolicy`]).
//!
//! `b(u)` is the optional batch score of the source: a score table exported by
//! another measure at the previous boundary. Without a table `b(u) = 1` and
//! the measure is a plain time-decayed indegree.

use crate::computer::{
    blend, check_rating, check_time, GraphContext, RankComputer, ScoreLookup, ScoreTable,
    SnapshotContext,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tempora_core::{
    elapsed, CapacityPolicy, DecayKernel, Edge, EdgeArena, EdgeId, Error, NodeId, NodeIndex,
    Result, ScoreMap, Timestamp,
};

/// Added to every loaded batch score so that listed nodes stay positive.
pub const BATCH_SCORE_EPSILON: f64 = 1e-9;

/// One online rank variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnlineRankParams {
    /// Base score of every node, in `(0, 1)`.
    pub alpha: f64,
    /// Weight of in-edge contributions, in `[0, 1]`.
    pub beta: f64,
    #[serde(default)]
    pub kernel: DecayKernel,
}

impl Default for OnlineRankParams {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            beta: 1.0,
            kernel: DecayKernel::default(),
        }
    }
}

impl OnlineRankParams {
    pub fn new(alpha: f64, beta: f64, kernel: DecayKernel) -> Result<Self> {
        let params = Self { alpha, beta, kernel };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::invalid(format!(
                "'alpha' must be from interval (0,1), got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(Error::invalid(format!(
                "'beta' must be from interval [0,1], got {}",
                self.beta
            )));
        }
        self.kernel.validate()
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OnlineRankParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "olr_a{:.2}_b{:.2}_{}", self.alpha, self.beta, self.kernel)
    }
}

/// One decayed indegree variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecayedIndegreeParams {
    #[serde(default)]
    pub kernel: DecayKernel,
    /// `"{label}/{prefix}"` of the table used as batch scores, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_part: Option<String>,
}

impl DecayedIndegreeParams {
    pub fn new(kernel: DecayKernel) -> Result<Self> {
        kernel.validate()?;
        Ok(Self {
            kernel,
            batch_part: None,
        })
    }

    /// Weight sources by the scores exported under `part` at the previous boundary.
    pub fn with_batch_part(mut self, part: impl Into<String>) -> Result<Self> {
        let part = part.into();
        check_part(&part)?;
        self.batch_part = Some(part);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        self.batch_part.as_deref().map_or(Ok(()), check_part)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DecayedIndegreeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.batch_part.as_deref().and_then(|p| p.split('/').next()) {
            Some(head) => write!(f, "did_{head}_{}", self.kernel),
            None => write!(f, "did_{}", self.kernel),
        }
    }
}

fn check_part(part: &str) -> Result<()> {
    match part.split_once('/') {
        Some((label, prefix)) if !label.is_empty() && !prefix.is_empty() => Ok(()),
        _ => Err(Error::invalid(format!(
            "batch score part must look like 'label/prefix', got {part:?}"
        ))),
    }
}

/// Source weights loaded from an exported score table.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchScores {
    scores: ScoreMap,
    min: f64,
}

impl BatchScores {
    /// Shift every score by [`BATCH_SCORE_EPSILON`]. An empty table is an error.
    pub fn from_scores(part: &str, scores: ScoreMap) -> Result<Self> {
        let scores = scores
            .into_iter()
            .map(|(node, score)| (node, score + BATCH_SCORE_EPSILON))
            .collect::<ScoreMap>();
        let min = scores
            .values()
            .copied()
            .min_by(f64::total_cmp)
            .ok_or_else(|| Error::EmptyScoreTable(part.to_string()))?;
        Ok(Self { scores, min })
    }

    /// Score of a source; absent sources fall back to the table minimum.
    pub fn get(&self, node: NodeId) -> f64 {
        self.scores.get(&node).copied().unwrap_or(self.min)
    }

    pub fn min(&self) -> f64 {
        self.min
    }
}

/// State shared by the in-edge measures.
#[derive(Debug, Clone)]
struct InEdgeState {
    nodes: NodeIndex,
    edges: EdgeArena,
    width: usize,
    /// Last computed rank per node, row-major.
    ranks: Vec<f64>,
    node_last: Vec<Option<Timestamp>>,
}

impl InEdgeState {
    fn new(
        nodes: NodeIndex,
        known_edges: &[Edge],
        width: usize,
        policy: CapacityPolicy,
        min_time: Timestamp,
    ) -> Result<Self> {
        let n = nodes.len();
        Ok(Self {
            edges: EdgeArena::new(known_edges, width, policy, min_time)?,
            nodes,
            width,
            ranks: vec![0.0; n * width],
            node_last: vec![None; n],
        })
    }

    /// Rebuild the rank of `node` at `time`.
    ///
    /// `base(j)` is the constant term of variant `j`, `term(j, edge, dt, weight)`
    /// the contribution of one in-edge.
    fn rank_of(
        &self,
        node: NodeId,
        time: Timestamp,
        base: impl Fn(usize) -> f64,
        term: impl Fn(usize, Edge, f64, f64) -> f64,
    ) -> Vec<f64> {
        let mut values = (0..self.width).map(&base).collect::<Vec<_>>();
        for &id in self.edges.incoming(node) {
            let dt = elapsed(time, self.edges.last_activation(id));
            let edge = self.edges.edge(id);
            for (j, (value, weight)) in values.iter_mut().zip(self.edges.weights(id)).enumerate() {
                *value += term(j, edge, dt, *weight);
            }
        }
        values
    }

    /// Activate `edge` and return the arena id plus the row of the source node.
    fn activate(&mut self, edge: Edge, time: Timestamp) -> Result<(EdgeId, usize)> {
        let s = self.nodes.position(edge.src)?;
        let t = self.nodes.position(edge.trg)?;
        check_time(edge.src, self.node_last[s], time)?;
        check_time(edge.trg, self.node_last[t], time)?;
        let id = self.edges.activate(edge)?;
        self.node_last[s] = Some(time);
        self.node_last[t] = Some(time);
        Ok((id, s))
    }

    /// Store the new source rank, blended with the previous one.
    fn commit(
        &mut self,
        id: EdgeId,
        s: usize,
        time: Timestamp,
        fresh: Vec<f64>,
        rating: Option<f64>,
    ) {
        let row = &mut self.ranks[s * self.width..(s + 1) * self.width];
        for (old, new) in row.iter_mut().zip(&fresh) {
            *old = blend(rating, *new, *old);
        }
        let stored = row.to_vec();
        self.edges.record(id, time, &stored);
    }

    /// Active nodes in index order.
    fn active_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .filter(|&i| self.node_last[i].is_some())
            .map(|i| self.nodes.node(i))
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.ranks = Vec::new();
        self.node_last = Vec::new();
    }
}

/// Online rank for a list of parameter variants.
#[derive(Debug, Clone)]
pub struct OnlineRank {
    params: Vec<OnlineRankParams>,
    state: InEdgeState,
}

impl OnlineRank {
    /// Create a computer over a node universe and the edges known in advance.
    pub fn new(
        nodes: NodeIndex,
        known_edges: &[Edge],
        params: Vec<OnlineRankParams>,
        policy: CapacityPolicy,
        min_time: Timestamp,
    ) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::invalid("online rank needs at least one parameter set"));
        }
        for p in &params {
            p.validate()?;
        }
        let state = InEdgeState::new(nodes, known_edges, params.len(), policy, min_time)?;
        Ok(Self { params, state })
    }

    /// Score of `node` at `time` for every variant.
    pub fn rank_at(&self, node: NodeId, time: Timestamp) -> Result<Vec<f64>> {
        self.state.nodes.position(node)?;
        let params = &self.params;
        Ok(self.state.rank_of(
            node,
            time,
            |j| params[j].alpha,
            |j, _, dt, weight| params[j].beta * params[j].kernel.weight(dt) * weight,
        ))
    }

    /// Number of stored edges.
    pub fn stored_edges(&self) -> usize {
        self.state.edges.len()
    }
}

impl RankComputer for OnlineRank {
    fn name(&self) -> &'static str {
        "online_rank"
    }

    fn labels(&self) -> Vec<String> {
        self.params.iter().map(OnlineRankParams::label).collect()
    }

    fn update(
        &mut self,
        edge: Edge,
        time: Timestamp,
        _graphs: &GraphContext<'_>,
        rating: Option<f64>,
    ) -> Result<()> {
        check_rating(rating)?;
        let (id, s) = self.state.activate(edge, time)?;
        let fresh = self.rank_at(edge.src, time)?;
        self.state.commit(id, s, time, fresh, rating);
        Ok(())
    }

    fn save_snapshot(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<ScoreTable>> {
        let mut columns = vec![Vec::new(); self.params.len()];
        for node in self.state.active_nodes() {
            for (column, value) in columns.iter_mut().zip(self.rank_at(node, ctx.time)?) {
                column.push((node, value));
            }
        }
        Ok(self
            .params
            .iter()
            .zip(columns)
            .map(|(p, rows)| ScoreTable::new(p.label(), "olr", rows))
            .collect())
    }

    fn copy(&self) -> Box<dyn RankComputer> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        self.state.clear();
    }
}

/// Decayed indegree for a list of parameter variants.
#[derive(Debug, Clone)]
pub struct DecayedIndegree {
    params: Vec<DecayedIndegreeParams>,
    batch: Vec<Option<BatchScores>>,
    state: InEdgeState,
}

impl DecayedIndegree {
    pub fn new(
        nodes: NodeIndex,
        known_edges: &[Edge],
        params: Vec<DecayedIndegreeParams>,
        policy: CapacityPolicy,
        min_time: Timestamp,
    ) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::invalid(
                "decayed indegree needs at least one parameter set",
            ));
        }
        for p in &params {
            p.validate()?;
        }
        let state = InEdgeState::new(nodes, known_edges, params.len(), policy, min_time)?;
        Ok(Self {
            batch: vec![None; params.len()],
            params,
            state,
        })
    }

    /// Score of `node` at `time` for every variant.
    pub fn rank_at(&self, node: NodeId, time: Timestamp) -> Result<Vec<f64>> {
        self.state.nodes.position(node)?;
        let (params, batch) = (&self.params, &self.batch);
        Ok(self.state.rank_of(
            node,
            time,
            |_| 0.0,
            |j, edge, dt, _| {
                let b = batch[j].as_ref().map_or(1.0, |scores| scores.get(edge.src));
                b * params[j].kernel.weight(dt)
            },
        ))
    }

    /// Batch scores currently in use by variant `param`.
    pub fn batch_scores(&self, param: usize) -> Option<&BatchScores> {
        self.batch.get(param).and_then(Option::as_ref)
    }
}

impl RankComputer for DecayedIndegree {
    fn name(&self) -> &'static str {
        "decayed_indegree"
    }

    fn labels(&self) -> Vec<String> {
        self.params.iter().map(DecayedIndegreeParams::label).collect()
    }

    fn update(
        &mut self,
        edge: Edge,
        time: Timestamp,
        _graphs: &GraphContext<'_>,
        rating: Option<f64>,
    ) -> Result<()> {
        check_rating(rating)?;
        let (id, s) = self.state.activate(edge, time)?;
        let fresh = self.rank_at(edge.src, time)?;
        self.state.commit(id, s, time, fresh, rating);
        Ok(())
    }

    fn save_snapshot(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<ScoreTable>> {
        let mut columns = vec![Vec::new(); self.params.len()];
        for node in self.state.active_nodes() {
            for (column, value) in columns.iter_mut().zip(self.rank_at(node, ctx.time)?) {
                column.push((node, value));
            }
        }
        Ok(self
            .params
            .iter()
            .zip(columns)
            .map(|(p, rows)| ScoreTable::new(p.label(), "did", rows))
            .collect())
    }

    /// Load the batch scores of snapshot `index` for the next interval.
    fn after_export(&mut self, index: usize, scores: &dyn ScoreLookup) -> Result<()> {
        for (p, slot) in self.params.iter().zip(self.batch.iter_mut()) {
            if let Some(part) = &p.batch_part {
                let loaded = BatchScores::from_scores(part, scores.scores(part, index)?)?;
                tracing::debug!(
                    part = %part,
                    index,
                    rows = loaded.scores.len(),
                    min = loaded.min,
                    "loaded batch scores"
                );
                *slot = Some(loaded);
            }
        }
        Ok(())
    }

    fn copy(&self) -> Box<dyn RankComputer> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        self.batch.fill(None);
        self.state.clear();
    }
}

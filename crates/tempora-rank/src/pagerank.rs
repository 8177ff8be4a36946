//! Temporal PageRank: mass passing along time-respecting walks.
//!
//! # Intuition
//!
//! Every edge event `s -> t` starts a new random walker at `s`. The walker,
//! together with the mass still *active* at `s` (walkers that arrived at `s`
//! earlier and may continue), moves to `t`. At `t` a fraction of the moved
//! mass stays active, the rest is absorbed. `temp_pr` accumulates every unit
//! of mass a node has ever received.
//!
//! # Update rule
//!
//! ```text
//! temp_pr[s]     += (1 - alpha)
//! temp_pr[t]     += (active_mass[s] + (1 - alpha)) * alpha
//! active_mass[t] += (active_mass[s] + (1 - alpha)) * alpha * (1 - beta)
//! active_mass[s] *= beta
//! ```
//!
//! `alpha` plays the role of the damping factor, `beta` is the probability
//! that a walker at `s` waits for a later edge instead of taking this one.
//!
//! The measure is time-agnostic: only the event order matters.
//!
//! # References
//!
//! - Rozenshtein, Gionis (2016). "Temporal PageRank"

use crate::computer::{
    blend, check_rating, row_slot, GraphContext, RankComputer, ScoreTable, SnapshotContext,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tempora_core::{Edge, Error, NodeId, NodeIndex, Result, Timestamp};

/// One temporal PageRank variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalPageRankParams {
    /// Damping factor, in `(0, 1)`.
    pub alpha: f64,
    /// Waiting probability, in `[0, 1)`.
    pub beta: f64,
}

impl Default for TemporalPageRankParams {
    fn default() -> Self {
        Self {
            alpha: 0.85,
            beta: 0.5,
        }
    }
}

impl TemporalPageRankParams {
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        let params = Self { alpha, beta };
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
        if !(self.beta >= 0.0 && self.beta < 1.0) {
            return Err(Error::invalid(format!(
                "'beta' must be from interval [0,1), got {}",
                self.beta
            )));
        }
        Ok(())
    }

    /// Canonical label, e.g. `tpr_a0.85_b0.50`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TemporalPageRankParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tpr_a{:.2}_b{:.2}", self.alpha, self.beta)
    }
}

/// Temporal PageRank for a list of parameter variants.
#[derive(Debug, Clone)]
pub struct TemporalPageRank {
    params: Vec<TemporalPageRankParams>,
    nodes: NodeIndex,
    /// Row-major, one row of `params.len()` values per node.
    temp_pr: Vec<f64>,
    active_mass: Vec<f64>,
}

impl TemporalPageRank {
    pub fn new(nodes: NodeIndex, params: Vec<TemporalPageRankParams>) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::invalid(
                "temporal PageRank needs at least one parameter set",
            ));
        }
        for p in &params {
            p.validate()?;
        }
        let size = nodes.len() * params.len();
        Ok(Self {
            params,
            nodes,
            temp_pr: vec![0.0; size],
            active_mass: vec![0.0; size],
        })
    }

    pub fn params(&self) -> &[TemporalPageRankParams] {
        &self.params
    }

    /// Accumulated score of `node` under parameter set `param`.
    pub fn temp_pr(&self, node: NodeId, param: usize) -> Result<f64> {
        let i = self.nodes.position(node)?;
        Ok(self.temp_pr[row_slot(i, param, self.params.len())?])
    }

    /// Mass currently able to leave `node` under parameter set `param`.
    pub fn active_mass(&self, node: NodeId, param: usize) -> Result<f64> {
        let i = self.nodes.position(node)?;
        Ok(self.active_mass[row_slot(i, param, self.params.len())?])
    }
}

impl RankComputer for TemporalPageRank {
    fn name(&self) -> &'static str {
        "temporal_pagerank"
    }

    fn labels(&self) -> Vec<String> {
        self.params.iter().map(TemporalPageRankParams::label).collect()
    }

    fn update(
        &mut self,
        edge: Edge,
        _time: Timestamp,
        _graphs: &GraphContext<'_>,
        rating: Option<f64>,
    ) -> Result<()> {
        check_rating(rating)?;
        let w = self.params.len();
        let s = self.nodes.position(edge.src)? * w;
        let t = self.nodes.position(edge.trg)? * w;

        for (j, p) in self.params.iter().enumerate() {
            let (pr_s, pr_t) = (self.temp_pr[s + j], self.temp_pr[t + j]);
            let (mass_s, mass_t) = (self.active_mass[s + j], self.active_mass[t + j]);

            let fresh = 1.0 - p.alpha;
            let moved = (mass_s + fresh) * p.alpha;
            let new_pr_s = pr_s + fresh;
            let new_pr_t = pr_t + moved;
            let new_mass_t = mass_t + moved * (1.0 - p.beta);
            let new_mass_s = mass_s * p.beta;

            // all four values are computed from the pre-event state before any write
            self.temp_pr[s + j] = blend(rating, new_pr_s, pr_s);
            self.temp_pr[t + j] = blend(rating, new_pr_t, pr_t);
            self.active_mass[s + j] = blend(rating, new_mass_s, mass_s);
            self.active_mass[t + j] = blend(rating, new_mass_t, mass_t);
        }
        Ok(())
    }

    fn save_snapshot(&mut self, _ctx: &SnapshotContext<'_>) -> Result<Vec<ScoreTable>> {
        let w = self.params.len();
        Ok(self
            .params
            .iter()
            .enumerate()
            .map(|(j, p)| {
                let rows = (0..self.nodes.len())
                    .map(|i| (self.nodes.node(i), self.temp_pr[i * w + j]))
                    .collect();
                ScoreTable::new(p.label(), "tpr", rows)
            })
            .collect())
    }

    fn copy(&self) -> Box<dyn RankComputer> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        self.temp_pr = Vec::new();
        self.active_mass = Vec::new();
        self.nodes.clear();
    }
}

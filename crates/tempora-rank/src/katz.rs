//! Temporal Katz centrality: decayed walk counting over an edge stream.
//!
//! # Intuition
//!
//! Static Katz counts every walk ending at a node, damping each hop by `beta`.
//! On a stream only *time-respecting* walks make sense: a walk may only use
//! edges in non-decreasing time order. Every new edge `s -> t` extends all
//! walks ending at `s` by one hop and opens one new walk of length one.
//!
//! # Update rule
//!
//! ```text
//! decayed_s = rank[s] * W(T - last[s])
//! decayed_t = rank[t] * W(T - last[t])
//! rank[s]   = decayed_s
//! rank[t]   = decayed_t + beta * (decayed_s + 1)
//! last[s]   = last[t] = T
//! ```
//!
//! Decay is lazy: a node's score is only re-weighted when it is touched, or
//! when it is read at a snapshot. A snapshot read never writes back.
//!
//! # Truncation
//!
//! [`TruncatedTemporalKatz`] keeps `k` layers. Layer `L` only counts walks of
//! length at most `L + 1`; its target update consumes layer `L - 1` of the
//! source instead of layer `L`. Layers are updated from `k - 1` down to `0`
//! so that every layer reads the pre-event value of the layer below.
//!
//! # References
//!
//! - Katz (1953). "A new status index derived from sociometric analysis"
//! - Béres, Pálovics, Oláh, Benczúr (2018). "Temporal walk based centrality metric for graph streams"

use crate::computer::{
    check_rating, check_time, row_slot, GraphContext, RankComputer, ScoreTable, SnapshotContext,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tempora_core::{elapsed, DecayKernel, Edge, Error, NodeId, NodeIndex, Result, Timestamp};

/// One temporal Katz variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalKatzParams {
    /// Damping per hop, in `[0, 1]`.
    pub beta: f64,
    /// Time decay applied between activations.
    #[serde(default)]
    pub kernel: DecayKernel,
}

impl TemporalKatzParams {
    pub fn new(beta: f64, kernel: DecayKernel) -> Result<Self> {
        let params = Self { beta, kernel };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(Error::invalid(format!(
                "'beta' must be from interval [0,1], got {}",
                self.beta
            )));
        }
        self.kernel.validate()
    }

    /// Canonical label, e.g. `tk_b0.50_Const(1.00)`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TemporalKatzParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tk_b{:.2}_{}", self.beta, self.kernel)
    }
}

/// One truncated temporal Katz variant. Exported once per layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncatedTemporalKatzParams {
    pub beta: f64,
    #[serde(default)]
    pub kernel: DecayKernel,
}

impl TruncatedTemporalKatzParams {
    pub fn new(beta: f64, kernel: DecayKernel) -> Result<Self> {
        TemporalKatzParams::new(beta, kernel).map(|p| Self {
            beta: p.beta,
            kernel: p.kernel,
        })
    }

    pub fn validate(&self) -> Result<()> {
        TemporalKatzParams {
            beta: self.beta,
            kernel: self.kernel,
        }
        .validate()
    }

    /// Label of the layer bounding walks to `max_length` hops.
    pub fn layer_label(&self, max_length: usize) -> String {
        format!("{self}_length_limit_{max_length}")
    }
}

impl fmt::Display for TruncatedTemporalKatzParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ttk_b{:.2}_{}", self.beta, self.kernel)
    }
}

/// Per-node activation clock shared by the Katz computers.
#[derive(Debug, Clone, Default)]
struct Activations {
    last: Vec<Option<Timestamp>>,
}

impl Activations {
    fn new(n: usize) -> Self {
        Self { last: vec![None; n] }
    }

    /// Decay factor of every kernel for node `i` at `time`.
    ///
    /// An unseen node has a zero score, so its factor is irrelevant and set to 1.
    fn factors(&self, i: usize, time: Timestamp, kernels: &[DecayKernel], out: &mut Vec<f64>) {
        out.clear();
        match self.last[i] {
            Some(last) => {
                let dt = elapsed(time, last);
                out.extend(kernels.iter().map(|k| k.weight(dt)));
            }
            None => out.resize(kernels.len(), 1.0),
        }
    }
}

/// Reused per-update decay factors of the source and target.
#[derive(Debug, Clone, Default)]
struct Scratch {
    src: Vec<f64>,
    trg: Vec<f64>,
}

/// Temporal Katz centrality for a list of parameter variants.
#[derive(Debug, Clone)]
pub struct TemporalKatz {
    params: Vec<TemporalKatzParams>,
    kernels: Vec<DecayKernel>,
    nodes: NodeIndex,
    /// Row-major, one row of `params.len()` scores per node.
    ranks: Vec<f64>,
    activations: Activations,
    scratch: Scratch,
}

impl TemporalKatz {
    /// Create a computer over a fixed node universe.
    pub fn new(nodes: NodeIndex, params: Vec<TemporalKatzParams>) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::invalid("temporal Katz needs at least one parameter set"));
        }
        for p in &params {
            p.validate()?;
        }
        let n = nodes.len();
        Ok(Self {
            kernels: params.iter().map(|p| p.kernel).collect(),
            ranks: vec![0.0; n * params.len()],
            activations: Activations::new(n),
            scratch: Scratch::default(),
            params,
            nodes,
        })
    }

    pub fn params(&self) -> &[TemporalKatzParams] {
        &self.params
    }

    /// Stored (not decayed) score of `node` under parameter set `param`.
    pub fn rank(&self, node: NodeId, param: usize) -> Result<f64> {
        let i = self.nodes.position(node)?;
        Ok(self.ranks[row_slot(i, param, self.params.len())?])
    }

    /// Score of `node` decayed to `time`, without writing it back.
    pub fn rank_at(&self, node: NodeId, param: usize, time: Timestamp) -> Result<f64> {
        let i = self.nodes.position(node)?;
        let slot = row_slot(i, param, self.params.len())?;
        let mut factors = Vec::new();
        self.activations.factors(i, time, &self.kernels, &mut factors);
        Ok(self.ranks[slot] * factors[param])
    }
}

impl RankComputer for TemporalKatz {
    fn name(&self) -> &'static str {
        "temporal_katz"
    }

    fn labels(&self) -> Vec<String> {
        self.params.iter().map(TemporalKatzParams::label).collect()
    }

    fn update(
        &mut self,
        edge: Edge,
        time: Timestamp,
        _graphs: &GraphContext<'_>,
        rating: Option<f64>,
    ) -> Result<()> {
        check_rating(rating)?;
        let s = self.nodes.position(edge.src)?;
        let t = self.nodes.position(edge.trg)?;
        check_time(edge.src, self.activations.last[s], time)?;
        check_time(edge.trg, self.activations.last[t], time)?;

        let w = self.params.len();
        self.activations.factors(s, time, &self.kernels, &mut self.scratch.src);
        self.activations.factors(t, time, &self.kernels, &mut self.scratch.trg);
        let (ws, wt) = (&self.scratch.src, &self.scratch.trg);

        for (j, p) in self.params.iter().enumerate() {
            let decayed_s = self.ranks[s * w + j] * ws[j];
            let decayed_t = self.ranks[t * w + j] * wt[j];
            self.ranks[s * w + j] = decayed_s;
            // +1 credits the new length-1 walk
            self.ranks[t * w + j] = decayed_t + p.beta * (decayed_s + 1.0);
        }
        self.activations.last[s] = Some(time);
        self.activations.last[t] = Some(time);
        Ok(())
    }

    fn save_snapshot(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<ScoreTable>> {
        let w = self.params.len();
        let mut columns = vec![Vec::new(); w];
        let mut factors = Vec::with_capacity(w);
        for i in 0..self.nodes.len() {
            if self.activations.last[i].is_none() {
                continue;
            }
            self.activations.factors(i, ctx.time, &self.kernels, &mut factors);
            let node = self.nodes.node(i);
            for (j, column) in columns.iter_mut().enumerate() {
                column.push((node, self.ranks[i * w + j] * factors[j]));
            }
        }
        Ok(self
            .params
            .iter()
            .zip(columns)
            .map(|(p, rows)| ScoreTable::new(p.label(), "tk", rows))
            .collect())
    }

    fn copy(&self) -> Box<dyn RankComputer> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        self.ranks = Vec::new();
        self.activations = Activations::default();
        self.nodes.clear();
    }
}

/// Temporal Katz restricted to walks of at most `k` hops, one layer per length.
#[derive(Debug, Clone)]
pub struct TruncatedTemporalKatz {
    params: Vec<TruncatedTemporalKatzParams>,
    kernels: Vec<DecayKernel>,
    nodes: NodeIndex,
    /// `layers[L]` bounds walks to `L + 1` hops; row-major like [`TemporalKatz`].
    layers: Vec<Vec<f64>>,
    activations: Activations,
    scratch: Scratch,
}

impl TruncatedTemporalKatz {
    /// Create a computer with `k >= 1` layers.
    pub fn new(
        nodes: NodeIndex,
        params: Vec<TruncatedTemporalKatzParams>,
        k: usize,
    ) -> Result<Self> {
        if k == 0 {
            return Err(Error::invalid("truncated temporal Katz needs k >= 1"));
        }
        if params.is_empty() {
            return Err(Error::invalid(
                "truncated temporal Katz needs at least one parameter set",
            ));
        }
        for p in &params {
            p.validate()?;
        }
        let n = nodes.len();
        Ok(Self {
            kernels: params.iter().map(|p| p.kernel).collect(),
            layers: vec![vec![0.0; n * params.len()]; k],
            activations: Activations::new(n),
            scratch: Scratch::default(),
            params,
            nodes,
        })
    }

    /// Number of layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Stored score of `node` in `layer` under parameter set `param`.
    pub fn rank(&self, layer: usize, node: NodeId, param: usize) -> Result<f64> {
        let ranks = self.layers.get(layer).ok_or_else(|| {
            Error::invalid(format!("layer {layer} out of range for depth {}", self.depth()))
        })?;
        let i = self.nodes.position(node)?;
        Ok(ranks[row_slot(i, param, self.params.len())?])
    }
}

impl RankComputer for TruncatedTemporalKatz {
    fn name(&self) -> &'static str {
        "truncated_temporal_katz"
    }

    fn labels(&self) -> Vec<String> {
        (0..self.depth())
            .rev()
            .flat_map(|layer| self.params.iter().map(move |p| p.layer_label(layer + 1)))
            .collect()
    }

    fn update(
        &mut self,
        edge: Edge,
        time: Timestamp,
        _graphs: &GraphContext<'_>,
        rating: Option<f64>,
    ) -> Result<()> {
        check_rating(rating)?;
        let s = self.nodes.position(edge.src)?;
        let t = self.nodes.position(edge.trg)?;
        check_time(edge.src, self.activations.last[s], time)?;
        check_time(edge.trg, self.activations.last[t], time)?;

        let w = self.params.len();
        self.activations.factors(s, time, &self.kernels, &mut self.scratch.src);
        self.activations.factors(t, time, &self.kernels, &mut self.scratch.trg);
        let (ws, wt) = (&self.scratch.src, &self.scratch.trg);

        // high to low: layer L reads layer L-1 before it is touched
        for layer in (0..self.layers.len()).rev() {
            for (j, p) in self.params.iter().enumerate() {
                let shorter = if layer == 0 {
                    0.0
                } else {
                    self.layers[layer - 1][s * w + j] * ws[j]
                };
                let ranks = &mut self.layers[layer];
                let decayed_s = ranks[s * w + j] * ws[j];
                let decayed_t = ranks[t * w + j] * wt[j];
                ranks[s * w + j] = decayed_s;
                ranks[t * w + j] = decayed_t + p.beta * (shorter + 1.0);
            }
        }
        self.activations.last[s] = Some(time);
        self.activations.last[t] = Some(time);
        Ok(())
    }

    fn save_snapshot(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<ScoreTable>> {
        let w = self.params.len();
        let mut tables = Vec::with_capacity(self.depth() * w);
        let mut factors = Vec::with_capacity(w);
        for layer in (0..self.depth()).rev() {
            let mut columns = vec![Vec::new(); w];
            for i in 0..self.nodes.len() {
                if self.activations.last[i].is_none() {
                    continue;
                }
                self.activations.factors(i, ctx.time, &self.kernels, &mut factors);
                let node = self.nodes.node(i);
                for (j, column) in columns.iter_mut().enumerate() {
                    column.push((node, self.layers[layer][i * w + j] * factors[j]));
                }
            }
            tables.extend(
                self.params
                    .iter()
                    .zip(columns)
                    .map(|(p, rows)| ScoreTable::new(p.layer_label(layer + 1), "ttk", rows)),
            );
        }
        Ok(tables)
    }

    fn copy(&self) -> Box<dyn RankComputer> {
        Box::new(self.clone())
    }

    fn clear(&mut self) {
        self.layers = Vec::new();
        self.activations = Activations::default();
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempora_core::StreamGraph;

    fn apply(c: &mut dyn RankComputer, edges: &[(u64, u64, Timestamp)]) {
        let g = StreamGraph::new();
        let ctx = GraphContext {
            total: &g,
            snapshot: &g,
        };
        for &(s, t, time) in edges {
            c.update(Edge::new(s, t), time, &ctx, None).unwrap();
        }
    }

    fn snapshot(c: &mut dyn RankComputer, time: Timestamp) -> Vec<ScoreTable> {
        let g = StreamGraph::new();
        c.save_snapshot(&SnapshotContext {
            index: 0,
            time,
            total: &g,
            snapshot: &g,
        })
        .unwrap()
    }

    fn const_one() -> DecayKernel {
        DecayKernel::constant(1.0).unwrap()
    }

    #[test]
    fn test_closed_form_two_in_edges() {
        let params = vec![TemporalKatzParams::new(1.0, const_one()).unwrap()];
        let mut tk = TemporalKatz::new(NodeIndex::new([1, 2, 3]), params).unwrap();
        apply(&mut tk, &[(1, 2, 0), (3, 2, 1)]);
        assert_eq!(tk.rank(2, 0).unwrap(), 2.0);
        assert_eq!(tk.rank(1, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_walks_propagate() {
        // 1->2 then 2->3: node 3 sees the walk 1->2->3 and the edge 2->3
        let params = vec![TemporalKatzParams::new(0.5, const_one()).unwrap()];
        let mut tk = TemporalKatz::new(NodeIndex::new([1, 2, 3]), params).unwrap();
        apply(&mut tk, &[(1, 2, 0), (2, 3, 1)]);
        // rank[2] = 0.5, rank[3] = 0.5 * (0.5 + 1)
        assert_relative_eq!(tk.rank(3, 0).unwrap(), 0.75);
    }

    #[test]
    fn test_lazy_decay_and_snapshot_do_not_write_back() {
        let kernel = DecayKernel::exponential(10.0, 0.5).unwrap();
        let params = vec![TemporalKatzParams::new(1.0, kernel).unwrap()];
        let mut tk = TemporalKatz::new(NodeIndex::new([1, 2]), params).unwrap();
        apply(&mut tk, &[(1, 2, 0)]);

        let tables = snapshot(&mut tk, 10);
        assert_eq!(tables[0].label, "tk_b1.00_Exp(b:0.500,n:10.000)");
        assert_relative_eq!(tables[0].get(2).unwrap(), 0.5);
        // node 1 has a zero score and is not exported
        assert_eq!(tables[0].get(1), None);

        // stored value is untouched, decay is taken from the original activation
        assert_eq!(tk.rank(2, 0).unwrap(), 1.0);
        assert_relative_eq!(tk.rank_at(2, 0, 20).unwrap(), 0.25);
    }

    #[test]
    fn test_time_regression() {
        let params = vec![TemporalKatzParams::new(1.0, const_one()).unwrap()];
        let mut tk = TemporalKatz::new(NodeIndex::new([1, 2]), params).unwrap();
        apply(&mut tk, &[(1, 2, 10)]);
        let g = StreamGraph::new();
        let ctx = GraphContext {
            total: &g,
            snapshot: &g,
        };
        let err = tk.update(Edge::new(2, 1), 9, &ctx, None).unwrap_err();
        assert!(matches!(err, Error::TimeRegression { last: 10, time: 9, .. }));
    }

    #[test]
    fn test_unknown_node() {
        let params = vec![TemporalKatzParams::new(1.0, const_one()).unwrap()];
        let mut tk = TemporalKatz::new(NodeIndex::new([1, 2]), params).unwrap();
        let g = StreamGraph::new();
        let ctx = GraphContext {
            total: &g,
            snapshot: &g,
        };
        assert!(matches!(
            tk.update(Edge::new(1, 7), 0, &ctx, None),
            Err(Error::UnknownNode(7))
        ));
    }

    #[test]
    fn test_invalid_beta() {
        assert!(TemporalKatzParams::new(1.5, const_one()).is_err());
        assert!(TruncatedTemporalKatzParams::new(-0.1, const_one()).is_err());
    }

    #[test]
    fn test_truncated_layer_zero_independent_of_depth() {
        let kernel = DecayKernel::power(5.0, -1.0).unwrap();
        let p = TruncatedTemporalKatzParams::new(0.7, kernel).unwrap();
        let nodes = || NodeIndex::new([1, 2, 3, 4]);
        let edges = [(1, 2, 0), (2, 3, 2), (3, 4, 3), (1, 3, 7), (4, 1, 7), (2, 3, 9)];

        let mut shallow = TruncatedTemporalKatz::new(nodes(), vec![p], 1).unwrap();
        let mut deep = TruncatedTemporalKatz::new(nodes(), vec![p], 5).unwrap();
        apply(&mut shallow, &edges);
        apply(&mut deep, &edges);

        for node in 1..=4 {
            assert_eq!(shallow.rank(0, node, 0).unwrap(), deep.rank(0, node, 0).unwrap());
        }
    }

    #[test]
    fn test_truncated_layers_bound_walk_length() {
        // chain 1->2->3->4 with constant weights: node 4 has walks of length 1, 2, 3
        let p = TruncatedTemporalKatzParams::new(1.0, const_one()).unwrap();
        let mut ttk = TruncatedTemporalKatz::new(NodeIndex::new([1, 2, 3, 4]), vec![p], 3).unwrap();
        apply(&mut ttk, &[(1, 2, 0), (2, 3, 1), (3, 4, 2)]);
        assert_eq!(ttk.rank(0, 4, 0).unwrap(), 1.0);
        assert_eq!(ttk.rank(1, 4, 0).unwrap(), 2.0);
        assert_eq!(ttk.rank(2, 4, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_truncated_deepest_layer_matches_untruncated() {
        // with no walk longer than k, the deepest layer equals temporal Katz
        let kernel = DecayKernel::exponential(4.0, 0.5).unwrap();
        let edges = [(1, 2, 0), (2, 3, 1), (1, 2, 3), (3, 4, 6)];
        let mut tk = TemporalKatz::new(
            NodeIndex::new([1, 2, 3, 4]),
            vec![TemporalKatzParams::new(0.8, kernel).unwrap()],
        )
        .unwrap();
        let mut ttk = TruncatedTemporalKatz::new(
            NodeIndex::new([1, 2, 3, 4]),
            vec![TruncatedTemporalKatzParams::new(0.8, kernel).unwrap()],
            3,
        )
        .unwrap();
        apply(&mut tk, &edges);
        apply(&mut ttk, &edges);
        for node in 1..=4 {
            assert_relative_eq!(tk.rank(node, 0).unwrap(), ttk.rank(2, node, 0).unwrap());
        }
    }

    #[test]
    fn test_truncated_labels() {
        let p = TruncatedTemporalKatzParams::new(1.0, const_one()).unwrap();
        let ttk = TruncatedTemporalKatz::new(NodeIndex::new([1]), vec![p], 2).unwrap();
        assert_eq!(
            ttk.labels(),
            vec![
                "ttk_b1.00_Const(1.00)_length_limit_2",
                "ttk_b1.00_Const(1.00)_length_limit_1"
            ]
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let params = vec![TemporalKatzParams::new(1.0, const_one()).unwrap()];
        let mut tk = TemporalKatz::new(NodeIndex::new([1, 2, 3]), params).unwrap();
        apply(&mut tk, &[(1, 2, 0)]);
        let mut copy = tk.copy();
        apply(copy.as_mut(), &[(3, 2, 1)]);
        copy.clear();
        assert_eq!(tk.rank(2, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_accessors_reject_out_of_range_param() {
        let params = vec![TemporalKatzParams::new(1.0, const_one()).unwrap()];
        let mut tk = TemporalKatz::new(NodeIndex::new([1, 2]), params).unwrap();
        apply(&mut tk, &[(1, 2, 0)]);
        assert_eq!(tk.rank(1, 0).unwrap(), 0.0);
        // param 1 would land on node 2's row
        assert!(matches!(tk.rank(1, 1), Err(Error::InvalidParameter(_))));
        assert!(matches!(tk.rank_at(1, 1, 5), Err(Error::InvalidParameter(_))));

        let p = TruncatedTemporalKatzParams::new(1.0, const_one()).unwrap();
        let mut ttk = TruncatedTemporalKatz::new(NodeIndex::new([1, 2]), vec![p], 2).unwrap();
        apply(&mut ttk, &[(1, 2, 0)]);
        assert_eq!(ttk.rank(1, 2, 0).unwrap(), 1.0);
        assert!(matches!(ttk.rank(0, 1, 1), Err(Error::InvalidParameter(_))));
        assert!(matches!(ttk.rank(2, 2, 0), Err(Error::InvalidParameter(_))));
    }
}

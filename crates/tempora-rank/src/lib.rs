//! Rank computers for streaming temporal centrality.
//!
//! Two families share the [`RankComputer`] interface:
//!
//! | Family | Computers | Cost per edge | Cost per snapshot |
//! |--------|-----------|---------------|-------------------|
//! | Incremental | [`TemporalKatz`], [`TruncatedTemporalKatz`], [`TemporalPageRank`], [`OnlineRank`], [`DecayedIndegree`] | O(1) or O(in-degree) | O(active nodes) |
//! | Static | [`StaticWindow`] (PageRank, indegree, harmonic, negative beta) | none | full recomputation |
//!
//! Every parameter variant has a canonical label (`tk_b0.50_Const(1.00)`,
//! `spr_total_a0.85_i100`, ...) used as its output folder and as the key
//! other computers use to refer to its exported scores.
//!
//! # Example
//!
//! ```rust
//! use tempora_core::{DecayKernel, Edge, NodeIndex, StreamGraph};
//! use tempora_rank::{GraphContext, RankComputer, TemporalKatz, TemporalKatzParams};
//!
//! let params = TemporalKatzParams::new(1.0, DecayKernel::constant(1.0).unwrap()).unwrap();
//! let mut tk = TemporalKatz::new(NodeIndex::new([1, 2, 3]), vec![params]).unwrap();
//!
//! let graph = StreamGraph::new();
//! let ctx = GraphContext { total: &graph, snapshot: &graph };
//! tk.update(Edge::new(1, 2), 0, &ctx, None).unwrap();
//! tk.update(Edge::new(3, 2), 1, &ctx, None).unwrap();
//! assert_eq!(tk.rank(2, 0).unwrap(), 2.0);
//! ```

pub mod computer;
pub mod katz;
pub mod online;
pub mod pagerank;
pub mod window;

pub use computer::{GraphContext, RankComputer, ScoreLookup, ScoreTable, SnapshotContext};
pub use katz::{
    TemporalKatz, TemporalKatzParams, TruncatedTemporalKatz, TruncatedTemporalKatzParams,
};
pub use online::{
    BatchScores, DecayedIndegree, DecayedIndegreeParams, OnlineRank, OnlineRankParams,
    BATCH_SCORE_EPSILON,
};
pub use pagerank::{TemporalPageRank, TemporalPageRankParams};
pub use window::measures::{PAGERANK_TOLERANCE, STATIC_EPSILON};
pub use window::{StaticMeasure, StaticWindow, StaticWindowParams};

//! Streaming temporal centrality over timestamped edge streams.
//!
//! This crate re-exports the workspace libraries:
//!
//! - [`core`]: edges, decay kernels, graphs, edge storage, file formats.
//! - [`rank`]: the rank computers (temporal Katz, temporal PageRank, online
//!   rank, decayed indegree, windowed static measures).
//! - [`sim`]: the stream simulator, snapshot sinks and prediction replay.
//!
//! # Example
//!
//! ```rust
//! use tempora::core::{EdgeRecord, EdgeStream, NodeIndex};
//! use tempora::rank::{TemporalPageRank, TemporalPageRankParams};
//! use tempora::sim::{ExportScope, GraphSimulator, MemorySink, RunOptions, TimeType};
//!
//! let stream: EdgeStream = [(1, 1, 2), (2, 2, 3), (3, 3, 1), (12, 1, 3)]
//!     .into_iter()
//!     .map(|(t, s, d)| EdgeRecord::new(t, s, d))
//!     .collect();
//! let params = TemporalPageRankParams::default();
//! let tpr = TemporalPageRank::new(NodeIndex::new(stream.nodes()), vec![params]).unwrap();
//!
//! let mut sim = GraphSimulator::new(stream, TimeType::Epoch);
//! sim.register(Box::new(tpr)).unwrap();
//! let mut sink = MemorySink::new();
//! let stats = sim.run_with_boundaries(&[10, 20], RunOptions::default(), &mut sink).unwrap();
//!
//! assert_eq!(stats[0].snapshot_edges, 3);
//! assert_eq!(sink.indices(&ExportScope::Original, &params.label()), vec![0, 1]);
//! ```

pub use tempora_core as core;
pub use tempora_rank as rank;
pub use tempora_sim as sim;

pub use tempora_core::{DecayKernel, Edge, EdgeRecord, EdgeStream, Error, NodeId, Result, Timestamp};
pub use tempora_rank::{RankComputer, ScoreTable};
pub use tempora_sim::{GraphSimulator, RunOptions, SimError, SnapshotSink, TimeType};

//! Stream simulation for temporal centrality.
//!
//! A [`GraphSimulator`] replays a time-ordered [`EdgeStream`] into a set of
//! registered [`RankComputer`]s and, at every snapshot boundary, asks each of
//! them for a score table which it hands to a [`SnapshotSink`]:
//!
//! - [`FileExporter`] writes `{root}/{scope}/{label}/{prefix}_{index}.csv`.
//! - [`MemorySink`] keeps tables in memory, mostly for tests.
//!
//! With one or more [`EdgeSimulator`]s registered, boundaries instead export
//! hypothetical scores: predicted edges of the next interval are replayed
//! into copies of the live computers, leaving the live state untouched.
//!
//! # Example
//!
//! ```rust
//! use tempora_core::{DecayKernel, EdgeRecord, EdgeStream, NodeIndex};
//! use tempora_rank::{TemporalKatz, TemporalKatzParams};
//! use tempora_sim::{ExportScope, GraphSimulator, MemorySink, RunOptions, TimeType};
//!
//! let stream = EdgeStream::from_records([
//!     EdgeRecord::new(5, 1, 2),
//!     EdgeRecord::new(8, 3, 2),
//!     EdgeRecord::new(15, 2, 1),
//! ]);
//! let params = TemporalKatzParams::new(1.0, DecayKernel::constant(1.0).unwrap()).unwrap();
//! let tk = TemporalKatz::new(NodeIndex::new(stream.nodes()), vec![params]).unwrap();
//!
//! let mut sim = GraphSimulator::new(stream, TimeType::Epoch);
//! sim.register(Box::new(tk)).unwrap();
//! let mut sink = MemorySink::new();
//! let stats = sim.run_with_boundaries(&[10, 20], RunOptions::default(), &mut sink).unwrap();
//!
//! assert_eq!(stats.len(), 2);
//! let first = sink.get(&ExportScope::Original, &params.label(), 0).unwrap();
//! assert_eq!(first.get(2), Some(2.0));
//! ```

pub mod error;
pub mod replay;
pub mod simulator;
pub mod sink;

pub use error::{Result, SimError};
pub use replay::{EdgeSimulator, PredictionTable, ReplayOrder};
pub use simulator::{GraphSimulator, RunOptions, SnapshotStats, TimeType};
pub use sink::{ExportScope, FileExporter, MemorySink, ScopedLookup, SnapshotSink};

pub use tempora_core::EdgeStream;
pub use tempora_rank::RankComputer;

//! Core primitives for streaming temporal centrality.
//!
//! Provides the pieces every rank computer and the simulator share:
//! - Edges, node ids and timestamps
//! - Decay kernels (`elapsed -> weight`)
//! - Dense node indexing and capacity-managed edge storage
//! - The cumulative / snapshot-only graph view
//! - Timestamp grouping of a raw edge stream
//! - Whitespace-delimited stream and score formats
//!
//! # Example
//!
//! ```rust
//! use tempora_core::{DecayKernel, EdgeRecord, EdgeStream};
//!
//! let stream = EdgeStream::from_records(vec![
//!     EdgeRecord::new(100, 1, 2),
//!     EdgeRecord::new(100, 3, 2),
//!     EdgeRecord::new(160, 2, 4),
//! ]);
//! assert_eq!(stream.timestamps(), &[100, 160]);
//! assert_eq!(stream.edges_at(100).len(), 2);
//!
//! let kernel = DecayKernel::exponential(60.0, 0.5).unwrap();
//! assert_eq!(kernel.weight(60.0), 0.5);
//! ```

pub mod arena;
pub mod decay;
pub mod edge;
pub mod error;
pub mod formats;
pub mod graph;
pub mod indexer;
pub mod nodes;

pub use arena::{CapacityPolicy, EdgeArena, DEFAULT_STORAGE_RATIO};
pub use decay::DecayKernel;
pub use edge::{elapsed, Edge, EdgeId, EdgeRecord, NodeId, Timestamp};
pub use error::{Error, Result};
pub use formats::scores::ScoreMap;
pub use graph::StreamGraph;
pub use indexer::EdgeStream;
pub use nodes::NodeIndex;

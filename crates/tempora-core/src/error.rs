//! Error types for tempora-core.

use crate::edge::{NodeId, Timestamp};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the core types and by every rank computer.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A parameter object or kernel was configured outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The pre-sized edge storage is full.
    ///
    /// Raised instead of growing or overwriting when the arena runs under
    /// [`CapacityPolicy::Fixed`](crate::CapacityPolicy::Fixed).
    #[error("edge storage capacity exceeded: cannot store more than {capacity} edges")]
    EdgeCapacityExceeded { capacity: usize },

    /// The node is not part of the universe the computer was built with.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// An event arrived earlier than the last activation of a node.
    #[error("time regression on node {node}: last activation {last}, event time {time}")]
    TimeRegression {
        node: NodeId,
        last: Timestamp,
        time: Timestamp,
    },

    /// A line of a whitespace-delimited input could not be parsed.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A required input file does not exist.
    #[error("missing input file: {}", .0.display())]
    MissingInput(PathBuf),

    /// A score table that must contain rows is empty.
    #[error("score table is empty: {0}")]
    EmptyScoreTable(String),
}

/// Result type alias for tempora-core.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

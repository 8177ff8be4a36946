//! Error types for tempora-sim.

use thiserror::Error;

/// Errors raised while configuring or running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// A computer or file operation failed.
    #[error(transparent)]
    Core(#[from] tempora_core::Error),

    /// Boundaries are empty or not strictly increasing.
    #[error("invalid boundaries: {0}")]
    InvalidBoundaries(String),

    /// Two registered parameter variants share a canonical label.
    #[error("label collision: {0} is exported by more than one registered computer")]
    LabelCollision(String),

    /// Two replay simulators would write to the same scope.
    #[error("duplicate replay simulator id: {0}")]
    DuplicateReplay(String),

    /// Unknown time type.
    #[error("invalid time type {0:?}, expected 'epoch' or 'index'")]
    InvalidTimeType(String),

    /// The simulator already consumed its stream.
    #[error("simulator already ran; build a new one for another pass")]
    AlreadyRun,
}

/// Result type alias for tempora-sim.
pub type Result<T> = std::result::Result<T, SimError>;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal failure kinds. Configuration and preparation failures abort
/// before any record is emitted; a failed run produces no partial
/// time series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A probability input is non-normalizable (all-zero or negative
    /// weights).
    #[error("invalid distribution: {0}")]
    InvalidDistribution(&'static str),

    /// The requested population exceeds the coordinate catalog.
    #[error("population of {requested} exceeds coordinate catalog of {available}")]
    InsufficientCoordinates { requested: usize, available: usize },

    /// A cumulative sum went significantly negative or a sampling
    /// routine found no candidate. Aborts the run.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Work/other edge placement exceeded its retry budget; the
    /// requested mean degree is infeasible for these parameters.
    #[error("network saturated after {attempts} stalled placement attempts")]
    NetworkSaturation { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Normal termination signals, reported as outcome metadata rather
/// than errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The epidemic ran its course: recovered count reached N - 10.
    Completed,
    /// Total event rate fell below the equilibrium threshold.
    Extinct,
    /// Simulated-time cap or the runaway iteration guard was hit.
    Timeout,
}

impl SimError {
    pub(crate) fn no_candidate(context: &str) -> Self {
        SimError::InvariantViolation(format!("{}: no candidate found", context))
    }
}

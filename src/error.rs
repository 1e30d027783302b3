//! Engine error types.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors raised while validating inputs or running a simulation.
///
/// A battery that loses money is not an error; it is reported through
/// [`Recommendation`](crate::compare::Recommendation).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Usage input rejected before simulation (non-positive annual usage,
    /// malformed interval data, mismatched solar overlay).
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// A rate plan has no period covering `timestamp`. This is a configuration
    /// bug, never a user error.
    #[error("rate plan \"{plan}\" has no period covering {timestamp}")]
    UnresolvedPeriod {
        plan: String,
        timestamp: NaiveDateTime,
    },

    #[error("invalid rate plan \"{plan}\": {reason}")]
    InvalidRatePlan { plan: String, reason: String },

    #[error("invalid battery \"{id}\": {reason}")]
    InvalidBattery { id: String, reason: String },

    /// Dispatch policy or financial settings out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

//! Error types for monoscan-core.

use crate::defaults::Capability;
use crate::position::Position;
use crate::value::MonoidKind;
use thiserror::Error;

/// Result type alias for monoscan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for monoscan operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Instrument defaults are missing a required capability.
    #[error("contract violation: instrument `{instrument}` does not provide `{capability}`")]
    ContractViolation {
        /// Name of the offending instrument definition.
        instrument: String,
        /// The first capability found missing.
        capability: Capability,
    },

    /// Two monoid values of different kinds were combined.
    #[error("type mismatch: cannot combine {left} with {right}")]
    TypeMismatch {
        /// Kind of the left operand.
        left: MonoidKind,
        /// Kind of the right operand.
        right: MonoidKind,
    },

    /// Zero or several time-defining parameters were given to an estimator.
    #[error("ambiguous estimate: {0}")]
    AmbiguousEstimate(String),

    /// A detector or motion call failed while scanning.
    #[error("measurement failed at {position}: {reason}")]
    MeasurementFailure {
        /// Position the scan had reached.
        position: Position,
        /// Description of the underlying failure.
        reason: String,
    },

    /// A post-scan fit did not produce usable parameters.
    #[error("fit diverged: {0}")]
    FitDivergence(String),

    /// Scan configuration error.
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// A parameter value is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Motion collaborator error.
    #[error("motion error on `{axis}`: {reason}")]
    Motion {
        /// Axis that failed to move or report.
        axis: String,
        /// Description of the failure.
        reason: String,
    },

    /// Instrument hardware or driver error.
    #[error("instrument error: {0}")]
    Instrument(String),

    /// The instrument is already running a scan.
    #[error("instrument `{0}` is busy with another scan")]
    Busy(String),

    /// I/O error raised by an instrument collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

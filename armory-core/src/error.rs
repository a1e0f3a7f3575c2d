//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Comparison never produces these; discrepancies and read failures during a
/// comparison are reported as lines of [`Differences`](crate::Differences).
#[derive(Error, Debug)]
pub enum ArmoryError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A tensor or array does not have the expected size.
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        what: String,
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// A bit width too large to count its encodable values.
    #[error("Cannot encode actions on {0} bits")]
    TooManyBits(usize),

    /// Matrix inversion failed.
    #[error("Matrix is singular")]
    SingularMatrix,

    /// Cholesky factorization failed.
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    /// Loss type given by name is not known.
    #[error("Unknown loss type: {0}")]
    UnknownLossType(String),

    /// Action index out of the action space.
    #[error("Invalid action {action} for an action space of {n} actions")]
    InvalidAction {
        /// The action index.
        action: usize,
        /// Number of available actions.
        n: usize,
    },

    /// An action value that is not a non-negative integer.
    #[error("Action value {0} is not an action index")]
    NonIndexAction(f64),

    /// Index of an ensemble member out of range.
    #[error("Invalid ensemble member {index} for an ensemble of {size}")]
    InvalidEnsembleMember {
        /// The member index.
        index: usize,
        /// Size of the ensemble.
        size: usize,
    },

    /// The action space contains no action.
    #[error("Action space is empty")]
    EmptyActionSpace,

    /// An exploration module was called without an input it needs.
    #[error("Exploration input is missing: {0}")]
    MissingExplorationInput(&'static str),

    /// A parameter expected in a variable map does not exist.
    #[error("Parameter is missing: {0}")]
    MissingParameter(String),

    /// The lock on a variable map is poisoned.
    #[error("Variable map is poisoned: {0}")]
    PoisonedVarMap(String),
}

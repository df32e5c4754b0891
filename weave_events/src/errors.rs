//! Error type of the event engine.

use thiserror::Error;

/// The unified error type for the `weave_events` crate.
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    /// The comparison operator is not one of `<`, `<=`, `>`, `>=`.
    #[error("Invalid comparator {0:?}: expected one of <, <=, >, >=")]
    InvalidComparator(String),

    /// A time axis and its values (or flags) have different lengths.
    #[error("Length mismatch: {times} time stamps but {values} values")]
    LengthMismatch {
        /// Number of time stamps.
        times: usize,
        /// Number of values or flags.
        values: usize,
    },

    /// Time stamps are not strictly increasing.
    #[error("Time axis is not strictly increasing at position {index}")]
    NonMonotonicTime {
        /// First position whose stamp is not greater than its predecessor.
        index: usize,
    },

    /// A labeled array's data buffer does not match the product of its axis sizes.
    #[error("Shape mismatch: axes describe {expected} cells but data holds {got}")]
    ShapeMismatch {
        /// Cell count implied by the axes.
        expected: usize,
        /// Length of the data buffer.
        got: usize,
    },

    /// The same dimension name appears twice (as a dimension or a scalar coordinate).
    #[error("Duplicate dimension: {0}")]
    DuplicateDimension(String),

    /// A dimension required by the operation is neither a dimension nor a scalar coordinate.
    #[error("Missing dimension: {0}")]
    MissingDimension(String),

    /// An extra dimension with more than one label would split series ambiguously.
    #[error("Unexpected dimension {name} with {size} labels")]
    UnexpectedDimension {
        /// Dimension name.
        name: String,
        /// Number of labels along it.
        size: usize,
    },

    /// A label was requested that the dimension does not carry.
    #[error("Unknown label {label:?} on dimension {dim}")]
    UnknownLabel {
        /// Dimension name.
        dim: String,
        /// Requested label.
        label: String,
    },

    /// Arrays cannot be merged because their layouts differ.
    #[error("Incompatible arrays: {0}")]
    Incompatible(String),
}

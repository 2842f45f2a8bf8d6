//! Error types for neighbour queries.

use std::fmt;

/// Errors arising from query construction or neighbour queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceError {
    /// A caller-supplied argument is unusable: a negative distance or an
    /// unrecognized boundary mode or metric.
    InvalidArgument {
        /// What went wrong.
        reason: String,
    },
    /// A coordinate has the wrong number of axes for this query.
    DimensionMismatch {
        /// Number of axes of the field.
        expected: usize,
        /// Number of axes supplied.
        got: usize,
    },
    /// Attempted to construct a query over a field with zero cells.
    EmptySpace,
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::DimensionMismatch { expected, got } => {
                write!(f, "coordinate has {got} axes, field has {expected}")
            }
            Self::EmptySpace => write!(f, "field must have at least one cell"),
        }
    }
}

impl std::error::Error for SpaceError {}

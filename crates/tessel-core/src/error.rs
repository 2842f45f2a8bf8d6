//! Geometry error type shared by every crate that builds rectangles
//! or transfer descriptors.

use crate::rect::IntRect;
use std::error::Error;
use std::fmt;

/// Errors from constructing or combining rectangles.
///
/// These indicate a programming or configuration mistake and are never
/// retried: the message carries the offending rectangles so the caller
/// can report them verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// A rectangle was given a non-positive size on some axis.
    InvalidSize {
        /// Axis with the bad size.
        axis: usize,
        /// The size supplied.
        size: i32,
    },
    /// Two geometric objects disagree on dimensionality.
    DimensionMismatch {
        /// Dimensionality required by the receiver.
        expected: usize,
        /// Dimensionality supplied.
        got: usize,
    },
    /// A rectangle lies partly or wholly outside its bounding box.
    NotContained {
        /// The offending rectangle.
        rect: IntRect,
        /// The bounding box it had to fit in.
        bounds: IntRect,
    },
    /// Two rectangles of one descriptor share at least one cell.
    Overlap {
        /// Position of the first rectangle in the supplied list.
        first: usize,
        /// Position of the second rectangle in the supplied list.
        second: usize,
    },
    /// A multi-rectangle descriptor was requested with no rectangles.
    EmptyRectList,
    /// Element size of zero bytes.
    ZeroElementSize,
    /// A rectangle with zero axes.
    ZeroDimensions,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize { axis, size } => {
                write!(f, "rectangle size on axis {axis} must be positive, got {size}")
            }
            Self::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {expected}, got {got}")
            }
            Self::NotContained { rect, bounds } => {
                write!(f, "rectangle {rect} is not contained in bounding box {bounds}")
            }
            Self::Overlap { first, second } => {
                write!(f, "rectangles {first} and {second} overlap")
            }
            Self::EmptyRectList => write!(f, "rectangle list is empty"),
            Self::ZeroElementSize => write!(f, "element size must be at least one byte"),
            Self::ZeroDimensions => write!(f, "rectangle must have at least one axis"),
        }
    }
}

impl Error for GeometryError {}

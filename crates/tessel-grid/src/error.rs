//! Grid storage error types.

use std::error::Error;
use std::fmt;

use tessel_core::{Coord, GeometryError, IntRect};

/// Errors from reading, writing, packing, or unpacking grid storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// A coordinate outside the storage region.
    OutOfBounds {
        /// The offending coordinate.
        coord: Coord,
        /// The storage region.
        region: IntRect,
    },
    /// A descriptor built for different bounds or element size.
    DescriptorMismatch {
        /// What differs.
        reason: String,
    },
    /// A packed buffer of the wrong length.
    BufferSize {
        /// Bytes the descriptor addresses.
        expected: usize,
        /// Bytes supplied.
        got: usize,
    },
    /// A cell write with the wrong number of components.
    ComponentMismatch {
        /// Components per cell.
        expected: usize,
        /// Components supplied.
        got: usize,
    },
    /// Storage requested with zero components per cell.
    ZeroComponents,
    /// Two field storages of different kinds were combined.
    KindMismatch {
        /// Kind of the receiving storage.
        expected: &'static str,
        /// Kind supplied.
        got: &'static str,
    },
    /// A composite field has no resource of this name.
    UnknownResource {
        /// The resource asked for.
        name: String,
    },
    /// A composite field names the same resource twice.
    DuplicateResource {
        /// The repeated name.
        name: String,
    },
    /// Descriptor or rectangle construction failed.
    Geometry(GeometryError),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { coord, region } => {
                write!(f, "coordinate {:?} outside storage region {region}", coord.as_slice())
            }
            Self::DescriptorMismatch { reason } => write!(f, "descriptor mismatch: {reason}"),
            Self::BufferSize { expected, got } => {
                write!(f, "packed buffer is {got} bytes, descriptor addresses {expected}")
            }
            Self::ComponentMismatch { expected, got } => {
                write!(f, "cell has {expected} components, got {got}")
            }
            Self::ZeroComponents => write!(f, "cells must have at least one component"),
            Self::KindMismatch { expected, got } => {
                write!(f, "field kind mismatch: expected {expected}, got {got}")
            }
            Self::UnknownResource { name } => write!(f, "unknown resource '{name}'"),
            Self::DuplicateResource { name } => write!(f, "resource '{name}' listed twice"),
            Self::Geometry(e) => write!(f, "geometry: {e}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeometryError> for StorageError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

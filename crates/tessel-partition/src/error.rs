//! Partition configuration errors.

use std::error::Error;
use std::fmt;
use tessel_core::{GeometryError, Rank};

/// Errors from computing or querying a partition.
///
/// Apart from [`UnknownRank`](Self::UnknownRank), every variant is a
/// configuration error: the requested decomposition cannot exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionError {
    /// The process grid and the global bounds have different numbers of
    /// axes.
    DimensionMismatch {
        /// Axes of the global bounds.
        field: usize,
        /// Axes of the process grid.
        grid: usize,
    },
    /// The process count does not equal the product of the grid shape.
    ProcessCountMismatch {
        /// Processes requested.
        process_count: usize,
        /// Processes the grid shape describes.
        grid_processes: usize,
    },
    /// A process-grid axis has no processes, or the grid has no axes.
    InvalidShape {
        /// What is wrong with the shape.
        reason: String,
    },
    /// More processes than cells along an axis: some slab would be empty.
    EmptySlab {
        /// The axis.
        axis: usize,
        /// Cells along the axis.
        extent: i32,
        /// Processes along the axis.
        processes: u32,
    },
    /// A toroidal halo wider than the field along an axis.
    HaloTooWide {
        /// The axis.
        axis: usize,
        /// The halo margin.
        halo: u32,
        /// Cells along the axis.
        extent: i32,
    },
    /// A rank outside `0..process_count`.
    UnknownRank {
        /// The rank asked about.
        rank: Rank,
        /// Processes in the partition.
        process_count: usize,
    },
    /// Rectangle construction failed.
    Geometry(GeometryError),
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { field, grid } => write!(
                f,
                "process grid has {grid} axes but the field has {field}"
            ),
            Self::ProcessCountMismatch {
                process_count,
                grid_processes,
            } => write!(
                f,
                "process count {process_count} does not match process grid of {grid_processes}"
            ),
            Self::InvalidShape { reason } => write!(f, "invalid process grid: {reason}"),
            Self::EmptySlab {
                axis,
                extent,
                processes,
            } => write!(
                f,
                "cannot split {extent} cells on axis {axis} across {processes} processes"
            ),
            Self::HaloTooWide { axis, halo, extent } => write!(
                f,
                "toroidal halo {halo} exceeds field extent {extent} on axis {axis}"
            ),
            Self::UnknownRank {
                rank,
                process_count,
            } => write!(f, "rank {rank} not in partition of {process_count} processes"),
            Self::Geometry(e) => write!(f, "geometry: {e}"),
        }
    }
}

impl Error for PartitionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeometryError> for PartitionError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

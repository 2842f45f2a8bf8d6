//! Spatial neighbour queries for Tessel fields.
//!
//! Agents need spatial context every step: "which cells lie within
//! distance `d` of me?" and "which objects sit on those cells?". This
//! crate answers both.
//!
//! - [`NeighbourQuery`] enumerates the integer points within a
//!   [`Metric`] distance of a center under a [`BoundaryMode`]
//!   (bounded, unbounded, or toroidal with duplicate suppression),
//!   writing into a reusable [`NeighbourBuffer`].
//! - [`SparseGrid`] stores objects at integer locations and collects the
//!   objects found at a buffer of query results.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod buffer;
pub mod error;
pub mod query;
pub mod sparse;

#[cfg(test)]
pub(crate) mod compliance;

pub use boundary::{BoundaryMode, Metric};
pub use buffer::NeighbourBuffer;
pub use error::SpaceError;
pub use query::NeighbourQuery;
pub use sparse::SparseGrid;

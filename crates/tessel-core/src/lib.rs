//! Core types for the Tessel distributed field substrate.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the geometry every other crate speaks: coordinates, axis-aligned
//! N-dimensional rectangles, process and tick identifiers, and the
//! geometry error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod rect;

pub use error::GeometryError;
pub use id::{Coord, Rank, TickId};
pub use rect::{IntRect, PointIter};

//! Dense grid storage and sub-array transfer descriptors.
//!
//! A process stores its share of a field (owned cells plus halo) in a
//! [`GridStorage`]: one flat, row-major buffer over a rectangle. Moving
//! parts of that buffer between processes goes through a
//! [`TransferDescriptor`], which records where one or more
//! sub-rectangles sit inside the storage bounds and precomputes the
//! contiguous runs to copy, so packing never walks cell by cell.
//!
//! ```text
//! bounds (storage region)          packed buffer
//! +---------------------+
//! |      +----+         |          [ rect 0 rows... | rect 1 rows... ]
//! |      | r0 |  +---+  |   pack   little-endian, descriptor order,
//! |      +----+  |r1 |  |  ----->  no coordinates on the wire
//! |              +---+  |
//! +---------------------+
//! ```
//!
//! [`FieldStorage`] wraps the closed set of element kinds a field can
//! hold (scalar, integer, composite resources) behind one surface.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod descriptor;
pub mod element;
pub mod error;
pub mod field;
pub mod grid;

pub use descriptor::{Run, TransferDescriptor};
pub use element::Element;
pub use error::StorageError;
pub use field::{CompositeStorage, FieldKind, FieldStorage};
pub use grid::GridStorage;

//! Domain decomposition for Tessel fields.
//!
//! A [`Partition`] slices a global rectangular field into one disjoint
//! local region per process, laid out on a [`ProcessGrid`], and derives
//! each process's halo region and neighbour set. The geometry is
//! computed once per (re)balance and is identical on every process, so
//! it doubles as the shared plan both sides of a halo exchange read.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod grid;
pub mod partition;

pub use error::PartitionError;
pub use grid::ProcessGrid;
pub use partition::{Partition, PartitionConfig};

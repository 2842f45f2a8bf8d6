//! Tessel: a substrate for distributed spatial simulations.
//!
//! A global integer grid is split into rectangular blocks, one per
//! process. Each process stores its block plus a halo of ghost cells,
//! refreshes the halo from its neighbours every tick, and can publish
//! named objects that any other process calls through a handle.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Tessel sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use tessel::prelude::*;
//!
//! let comm = ChannelCluster::new(1).pop().unwrap();
//! let config = EngineConfig {
//!     extent: vec![16, 16],
//!     toroidal: true,
//!     ..EngineConfig::default()
//! };
//! let mut world = ProcessWorld::new(config, Box::new(comm)).unwrap();
//!
//! let local = world.local_region().clone();
//! world
//!     .step(|w| {
//!         let heat = w.storage_mut().as_scalar_mut().unwrap();
//!         for p in local.iter_points() {
//!             heat.set(&p, 1.0)?;
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // The single process is its own neighbour on a torus.
//! let heat = world.storage().as_scalar().unwrap();
//! assert_eq!(heat.get(&[-1, -1]).unwrap(), 1.0);
//! assert_eq!(world.tick(), TickId(1));
//! world.finish().unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessel-core` | Ranks, ticks, coordinates, `IntRect` |
//! | [`space`] | `tessel-space` | Neighbour queries and the sparse object grid |
//! | [`partition`] | `tessel-partition` | Process grids and block partitions |
//! | [`grid`] | `tessel-grid` | Field storage, transfer descriptors, pack/unpack |
//! | [`comm`] | `tessel-comm` | The communicator seam, in-process cluster, TCP mesh |
//! | [`registry`] | `tessel-registry` | Name directory and remote object calls |
//! | [`engine`] | `tessel-engine` | Halo exchange, rebalancing, the tick driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Ranks, ticks, coordinates, and rectangles (`tessel-core`).
pub use tessel_core as types;

/// Neighbour queries and sparse object placement (`tessel-space`).
///
/// [`space::NeighbourQuery`] enumerates Chebyshev or Manhattan
/// neighbourhoods under a [`space::BoundaryMode`];
/// [`space::SparseGrid`] maps objects to cells.
pub use tessel_space as space;

/// Process grids and block partitions (`tessel-partition`).
pub use tessel_partition as partition;

/// Field storage over a halo region (`tessel-grid`).
///
/// [`grid::FieldStorage`] holds scalar, integer, or composite cells;
/// [`grid::TransferDescriptor`] drives packing for exchanges.
pub use tessel_grid as grid;

/// Point-to-point messaging between processes (`tessel-comm`).
pub use tessel_comm as comm;

/// Cross-process name directory and remote calls (`tessel-registry`).
pub use tessel_registry as registry;

/// Halo exchange, rebalancing, and [`engine::ProcessWorld`]
/// (`tessel-engine`).
pub use tessel_engine as engine;

/// Common imports for typical Tessel usage.
///
/// ```rust
/// use tessel::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tessel_core::{Coord, IntRect, Rank, TickId};

    // Space
    pub use tessel_space::{BoundaryMode, Metric, NeighbourBuffer, NeighbourQuery, SparseGrid};

    // Partition
    pub use tessel_partition::{Partition, ProcessGrid};

    // Storage
    pub use tessel_grid::{FieldKind, FieldStorage, GridStorage};

    // Messaging
    pub use tessel_comm::{ChannelCluster, Communicator, Tag, TcpComm};

    // Registry
    pub use tessel_registry::{Registry, RegistryConfig, Remote, RemoteError, RemoteHandle};

    // Engine
    pub use tessel_engine::{EngineConfig, EngineError, ProcessWorld, SyncMetrics};
}

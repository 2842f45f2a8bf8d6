//! Halo exchange, rebalancing, and the per-process tick driver.
//!
//! [`ProcessWorld`] is what a scheduler drives on every process: it owns
//! the process's [`FieldStorage`](tessel_grid::FieldStorage), the shared
//! [`Partition`](tessel_partition::Partition), a cached [`HaloPlan`], the
//! [`Communicator`](tessel_comm::Communicator), and optionally a
//! [`Registry`](tessel_registry::Registry).
//!
//! Each tick runs agent logic, then one halo round so every process sees
//! its neighbours' border cells, then retires the names of agents that
//! migrated away. [`ProcessWorld::rebalance`] repartitions between ticks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod halo;
pub mod metrics;
pub mod rebalance;
pub mod world;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, SyncError};
pub use halo::{Fragment, HaloPlan, PeerBatch, HALO_TAG};
pub use metrics::{RebalanceMetrics, SyncMetrics};
pub use rebalance::REDISTRIBUTE_TAG;
pub use world::ProcessWorld;

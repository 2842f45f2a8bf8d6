//! Error types for the engine.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use tessel_comm::CommError;
use tessel_core::{Rank, TickId};
use tessel_grid::StorageError;
use tessel_partition::PartitionError;
use tessel_registry::RegistryError;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`EngineConfig::validate()`](crate::EngineConfig::validate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The extent lists no axes.
    EmptyExtent,
    /// An axis has zero cells.
    ZeroExtent {
        /// The offending axis.
        axis: usize,
    },
    /// An axis is too long for `i32` coordinates.
    ExtentOverflow {
        /// The offending axis.
        axis: usize,
        /// Its configured extent.
        extent: u32,
    },
    /// The run has no processes.
    NoProcesses,
    /// `sync_timeout_ms` is zero.
    ZeroTimeout,
    /// A composite field names no resources.
    EmptyComposite,
    /// A composite field names the same resource twice.
    DuplicateResource {
        /// The repeated name.
        name: String,
    },
    /// The registry section is unusable.
    InvalidRegistry {
        /// What is wrong with it.
        reason: String,
    },
    /// The decomposition is impossible.
    Partition(PartitionError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExtent => write!(f, "extent has no axes"),
            Self::ZeroExtent { axis } => write!(f, "extent of axis {axis} is zero"),
            Self::ExtentOverflow { axis, extent } => {
                write!(f, "extent {extent} of axis {axis} exceeds i32::MAX")
            }
            Self::NoProcesses => write!(f, "process count must be at least 1"),
            Self::ZeroTimeout => write!(f, "sync_timeout_ms must be at least 1"),
            Self::EmptyComposite => write!(f, "composite field has no resources"),
            Self::DuplicateResource { name } => {
                write!(f, "composite field lists resource '{name}' twice")
            }
            Self::InvalidRegistry { reason } => write!(f, "invalid registry config: {reason}"),
            Self::Partition(e) => write!(f, "partition: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Partition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PartitionError> for ConfigError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

// ── SyncError ──────────────────────────────────────────────────────

/// Failure of a halo round or a redistribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// A neighbour's data did not arrive within the sync timeout.
    Timeout {
        /// The silent neighbour.
        peer: Rank,
        /// Tick of the round.
        tick: TickId,
        /// How long this process waited.
        waited: Duration,
    },
    /// The transport failed for another reason.
    Comm(CommError),
    /// A received payload did not fit its descriptor.
    Storage(StorageError),
}

impl SyncError {
    /// Classify a transport error raised during the round at `tick`.
    pub fn from_comm(e: CommError, tick: TickId) -> Self {
        match e {
            CommError::Timeout { source, waited, .. } => Self::Timeout {
                peer: source,
                tick,
                waited,
            },
            other => Self::Comm(other),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { peer, tick, waited } => {
                write!(f, "tick {tick}: no data from rank {peer} after {waited:?}")
            }
            Self::Comm(e) => write!(f, "transport: {e}"),
            Self::Storage(e) => write!(f, "payload: {e}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Timeout { .. } => None,
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ── EngineError ────────────────────────────────────────────────────

/// Any failure surfaced by [`ProcessWorld`](crate::ProcessWorld).
#[derive(Debug)]
pub enum EngineError {
    /// Configuration rejected at startup.
    Config(ConfigError),
    /// Partition geometry failed (e.g. an impossible rebalance shape).
    Partition(PartitionError),
    /// Local storage access failed.
    Storage(StorageError),
    /// A halo round or redistribution failed. Fatal for the run.
    Sync(SyncError),
    /// The registry failed.
    Registry(RegistryError),
    /// The operation needs a registry but none was configured.
    NoRegistry,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Partition(e) => write!(f, "partition: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Sync(e) => write!(f, "sync: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::NoRegistry => write!(f, "no registry configured"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Partition(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Sync(e) => Some(e),
            Self::Registry(e) => Some(e),
            Self::NoRegistry => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<PartitionError> for EngineError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<SyncError> for EngineError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<RegistryError> for EngineError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

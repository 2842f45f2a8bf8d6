//! The process-scoped simulation context.

use std::time::Duration;

use tessel_comm::Communicator;
use tessel_core::{IntRect, Rank, TickId};
use tessel_grid::FieldStorage;
use tessel_partition::{Partition, ProcessGrid};
use tessel_registry::Registry;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, SyncError};
use crate::halo::HaloPlan;
use crate::metrics::{RebalanceMetrics, SyncMetrics};
use crate::rebalance::redistribute;

/// One process's share of a partitioned field, driven tick by tick.
///
/// Owns the process's storage (local region plus halo), the partition
/// every process agrees on, the cached halo plan, the communicator, and
/// the optional registry. All collective operations
/// ([`new`](Self::new), [`synchronize`](Self::synchronize),
/// [`step`](Self::step), [`rebalance`](Self::rebalance),
/// [`finish`](Self::finish)) must be called by every process in the
/// same order.
pub struct ProcessWorld {
    config: EngineConfig,
    comm: Box<dyn Communicator>,
    partition: Partition,
    storage: FieldStorage,
    plan: HaloPlan,
    registry: Option<Registry>,
    tick: TickId,
    timeout: Duration,
    last_sync: Option<SyncMetrics>,
}

impl ProcessWorld {
    /// Validate `config`, partition the field across `comm`'s processes,
    /// allocate storage over this process's halo region, plan the halo
    /// exchange, and bootstrap the registry if configured.
    pub fn new(config: EngineConfig, mut comm: Box<dyn Communicator>) -> Result<Self, EngineError> {
        let partition = config.partition(comm.size())?;
        let rank = comm.rank();
        let storage = FieldStorage::allocate(&config.field, partition.halo_region(rank)?)?;
        let plan = HaloPlan::build(&partition, rank, &storage)?;
        let registry = match &config.registry {
            Some(registry_config) => Some(Registry::bootstrap(comm.as_mut(), registry_config)?),
            None => None,
        };
        info!(
            %rank,
            local = %partition.local_region(rank)?,
            halo = %storage.region(),
            neighbours = partition.neighbours_of(rank)?.len(),
            "process world ready"
        );
        Ok(Self {
            timeout: config.sync_timeout(),
            config,
            comm,
            partition,
            storage,
            plan,
            registry,
            tick: TickId::default(),
            last_sync: None,
        })
    }

    /// This process's rank.
    pub fn rank(&self) -> Rank {
        self.comm.rank()
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.comm.size()
    }

    /// Current tick.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// The config this world was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared partition.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// The cells this process owns.
    pub fn local_region(&self) -> &IntRect {
        // Storage is always allocated for a rank inside the partition.
        &self.partition.local_regions()[self.rank().index()]
    }

    /// The region this process stores: owned cells plus halo.
    pub fn halo_region(&self) -> &IntRect {
        self.storage.region()
    }

    /// Ranks this process exchanges halo cells with.
    pub fn neighbours(&self) -> &[Rank] {
        self.partition
            .neighbours_of(self.rank())
            .unwrap_or_default()
    }

    /// Field storage; halo cells hold the values of the last round.
    pub fn storage(&self) -> &FieldStorage {
        &self.storage
    }

    /// Mutable field storage. Agents write owned cells; halo writes are
    /// overwritten by the next round.
    pub fn storage_mut(&mut self) -> &mut FieldStorage {
        &mut self.storage
    }

    /// The cached halo plan.
    pub fn halo_plan(&self) -> &HaloPlan {
        &self.plan
    }

    /// The registry, if configured.
    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Mutable registry, if configured.
    pub fn registry_mut(&mut self) -> Option<&mut Registry> {
        self.registry.as_mut()
    }

    /// The registry, or [`EngineError::NoRegistry`].
    pub fn require_registry(&mut self) -> Result<&mut Registry, EngineError> {
        self.registry.as_mut().ok_or(EngineError::NoRegistry)
    }

    /// The communicator, for agent-level messages. Tags at or above
    /// `0x0100` up to [`Tag::RESERVED`](tessel_comm::Tag::RESERVED) are
    /// used by the engine.
    pub fn communicator(&mut self) -> &mut dyn Communicator {
        self.comm.as_mut()
    }

    /// Metrics of the most recent halo round.
    pub fn last_sync(&self) -> Option<&SyncMetrics> {
        self.last_sync.as_ref()
    }

    /// Run one halo round. Collective.
    pub fn synchronize(&mut self) -> Result<SyncMetrics, EngineError> {
        let metrics = self.plan.exchange(
            &mut self.storage,
            self.comm.as_mut(),
            self.tick,
            self.timeout,
        )?;
        self.last_sync = Some(metrics.clone());
        Ok(metrics)
    }

    /// One tick: run `agents`, synchronize halos, withdraw the names of
    /// agents that migrated away, clear the migrated list, and advance
    /// the tick. Collective.
    pub fn step<F>(&mut self, agents: F) -> Result<SyncMetrics, EngineError>
    where
        F: FnOnce(&mut Self) -> Result<(), EngineError>,
    {
        agents(self)?;
        let metrics = self.synchronize()?;
        if let Some(registry) = self.registry.as_mut() {
            registry.withdraw_migrated()?;
            registry.clear_migrated_names();
        }
        self.tick = self.tick.next();
        Ok(metrics)
    }

    /// Stop the world and repartition onto `shape`. Collective.
    ///
    /// Waits for every process, recomputes the partition, moves owned
    /// cells to their new owners, rebuilds the halo plan, and runs a full
    /// halo round so every halo is valid on return.
    pub fn rebalance(&mut self, shape: ProcessGrid) -> Result<RebalanceMetrics, EngineError> {
        let rank = self.rank();
        let new_partition = self.partition.rebalance(shape)?;
        if new_partition.process_count() != self.comm.size() {
            return Err(EngineError::Partition(
                tessel_partition::PartitionError::ProcessCountMismatch {
                    process_count: self.comm.size(),
                    grid_processes: new_partition.process_count(),
                },
            ));
        }
        self.comm
            .barrier(self.timeout)
            .map_err(|e| SyncError::from_comm(e, self.tick))?;

        let mut new_storage = self.storage.resize(new_partition.halo_region(rank)?);
        let mut metrics = redistribute(
            &self.partition,
            &new_partition,
            &self.storage,
            &mut new_storage,
            self.comm.as_mut(),
            self.tick,
            self.timeout,
        )?;
        let plan = HaloPlan::build(&new_partition, rank, &new_storage)?;

        self.partition = new_partition;
        self.storage = new_storage;
        self.plan = plan;
        metrics.sync = self.synchronize()?;
        info!(
            %rank,
            shape = ?self.partition.shape().dims(),
            local = %self.local_region(),
            kept = metrics.cells_kept,
            received = metrics.cells_received,
            "rebalanced"
        );
        Ok(metrics)
    }

    /// Tear down in step with the other processes: closes the registry
    /// behind a barrier so no process loses the directory early.
    pub fn finish(mut self) -> Result<(), EngineError> {
        match self.registry.take() {
            Some(registry) => registry.close(self.comm.as_mut())?,
            None => self
                .comm
                .barrier(self.timeout)
                .map_err(|e| SyncError::from_comm(e, self.tick))?,
        }
        Ok(())
    }
}

// Compile-time assertion: a world moves onto its process's thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<ProcessWorld>();
};

//! Benchmark profiles and utilities for the Tessel simulation substrate.
//!
//! Provides pre-built [`EngineConfig`] profiles for benchmarking and examples:
//!
//! - [`reference_profile`]: 128x128 torus (16K cells), halo 1
//! - [`stress_profile`]: 512x512 torus (~262K cells), halo 2
//! - [`init_agent_positions`]: deterministic agent placement via seed
//! - [`Diffusion`]: an explicit diffusion step that reads the halo

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashSet;

use tessel_comm::ChannelCluster;
use tessel_core::{Coord, IntRect};
use tessel_engine::{EngineConfig, EngineError, ProcessWorld};
use tessel_grid::{GridStorage, StorageError};
use tessel_space::SparseGrid;

/// Build a reference benchmark profile: 128x128 torus (16K cells).
///
/// `process_grid` pins the process shape; `None` lets the engine pick a
/// balanced one.
pub fn reference_profile(process_grid: Option<Vec<u32>>) -> EngineConfig {
    EngineConfig {
        extent: vec![128, 128],
        process_grid,
        halo: 1,
        toroidal: true,
        ..EngineConfig::default()
    }
}

/// Build a stress benchmark profile: 512x512 torus with a 2-cell halo.
pub fn stress_profile(process_grid: Option<Vec<u32>>) -> EngineConfig {
    EngineConfig {
        extent: vec![512, 512],
        process_grid,
        halo: 2,
        toroidal: true,
        ..EngineConfig::default()
    }
}

/// A world that is the only process of its cluster. On a torus it
/// refreshes its halo by local copies alone.
pub fn single_process_world(config: EngineConfig) -> Result<ProcessWorld, EngineError> {
    let mut comms = ChannelCluster::new(1);
    let comm = comms.pop().ok_or(EngineError::Config(
        tessel_engine::ConfigError::NoProcesses,
    ))?;
    ProcessWorld::new(config, Box::new(comm))
}

/// Generate deterministic initial agent positions.
///
/// Places `n` agents on distinct cells of a field of `extent` using a
/// simple hash of the seed. Returns `(agent_id, coord)` pairs.
pub fn init_agent_positions(extent: &[u32], n: u32, seed: u64) -> Vec<(u32, Coord)> {
    let cell_count: u64 = extent.iter().map(|&e| u64::from(e)).product();
    let mut positions = Vec::with_capacity(n as usize);
    let mut occupied = HashSet::new();

    for i in 0..n {
        let mut flat = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(u64::from(i).wrapping_mul(1442695040888963407))
            % cell_count;
        // Step to the next free cell on a collision
        while occupied.contains(&flat) {
            flat = (flat + 1) % cell_count;
        }
        occupied.insert(flat);

        let mut coord = Coord::new();
        let mut rest = flat;
        for &e in extent.iter().rev() {
            coord.push((rest % u64::from(e)) as i32);
            rest /= u64::from(e);
        }
        coord.reverse();
        positions.push((i, coord));
    }

    positions
}

/// Agents from `positions` that fall inside `local`.
pub fn place_agents(local: &IntRect, positions: &[(u32, Coord)]) -> SparseGrid<u32> {
    let mut agents = SparseGrid::new();
    for (id, at) in positions {
        if local.contains(at) {
            agents.set_location(*id, at);
        }
    }
    agents
}

/// Fill the owned cells of `grid` with a deterministic ramp.
pub fn seed_heat(grid: &mut GridStorage<f64>, local: &IntRect) -> Result<(), StorageError> {
    for p in local.iter_points() {
        let v = p.iter().fold(0i64, |acc, &c| acc * 31 + i64::from(c)) % 17;
        grid.set(&p, v as f64)?;
    }
    Ok(())
}

/// Explicit diffusion over the owned cells of a scalar field:
/// `v += rate * (sum of axis neighbours - 2 * ndim * v)`.
///
/// Reads one halo cell per axis direction, so the world's halo must be at
/// least 1 and synchronized before [`apply`](Self::apply).
pub struct Diffusion {
    rate: f64,
    next: Vec<f64>,
}

impl Diffusion {
    /// A diffusion step with coefficient `rate`. Stable for
    /// `rate <= 1 / (2 * ndim)`.
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            next: Vec::new(),
        }
    }

    /// Update every owned cell of `world`'s scalar field.
    pub fn apply(&mut self, world: &mut ProcessWorld) -> Result<(), EngineError> {
        let local = world.local_region().clone();
        let grid = world
            .storage_mut()
            .as_scalar_mut()
            .ok_or(StorageError::KindMismatch {
                expected: "scalar",
                got: "non-scalar",
            })?;
        self.next.clear();
        let mut side = Coord::new();
        for p in local.iter_points() {
            let v = grid.get(&p)?;
            let mut around = 0.0;
            for axis in 0..p.len() {
                side.clone_from(&p);
                side[axis] -= 1;
                around += grid.get(&side)?;
                side[axis] += 2;
                around += grid.get(&side)?;
            }
            self.next
                .push(v + self.rate * (around - 2.0 * p.len() as f64 * v));
        }
        for (p, &v) in local.iter_points().zip(&self.next) {
            grid.set(&p, v)?;
        }
        Ok(())
    }
}

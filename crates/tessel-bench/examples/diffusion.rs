//! Heat diffusion across four ranks.
//!
//! Demonstrates: partition a torus → seed owned cells → step with a
//! halo-reading stencil → rebalance from strips to blocks → keep going.
//!
//! By default the four ranks are threads of this process. To run them as
//! separate processes, start four copies with `TESSEL_RANK=0..3` and the
//! same `TESSEL_PEERS=127.0.0.1:7100,127.0.0.1:7101,127.0.0.1:7102,127.0.0.1:7103`.
//!
//! Run with `RUST_LOG=info` to see partitioning and rebalance events.

use std::env;
use std::thread;
use std::time::Duration;

use tessel_bench::{reference_profile, seed_heat, Diffusion};
use tessel_comm::{ChannelCluster, Communicator, TcpComm, RANK_VAR};
use tessel_engine::{EngineError, ProcessWorld};
use tessel_partition::ProcessGrid;
use tracing_subscriber::EnvFilter;

fn total_heat(world: &ProcessWorld) -> f64 {
    let Some(grid) = world.storage().as_scalar() else {
        return 0.0;
    };
    world
        .local_region()
        .iter_points()
        .map(|p| grid.get(&p).unwrap_or(0.0))
        .sum()
}

fn run(comm: impl Communicator + 'static) -> Result<(u32, f64, f64), EngineError> {
    let mut world = ProcessWorld::new(reference_profile(Some(vec![4, 1])), Box::new(comm))?;
    let local = world.local_region().clone();
    if let Some(grid) = world.storage_mut().as_scalar_mut() {
        seed_heat(grid, &local)?;
    }
    world.synchronize()?;
    let before = total_heat(&world);

    let mut diffusion = Diffusion::new(0.2);
    for _ in 0..50 {
        world.step(|w| diffusion.apply(w))?;
    }
    let metrics = world.rebalance(ProcessGrid::new(&[2, 2])?)?;
    println!(
        "rank {}: kept {} cells, received {}, now owns {}",
        world.rank(),
        metrics.cells_kept,
        metrics.cells_received,
        world.local_region()
    );
    for _ in 0..50 {
        world.step(|w| diffusion.apply(w))?;
    }

    let after = total_heat(&world);
    let rank = world.rank().0;
    world.finish()?;
    Ok((rank, before, after))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Tessel diffusion example ===\n");

    if env::var_os(RANK_VAR).is_some() {
        let comm = TcpComm::from_env(Duration::from_secs(30)).expect("tcp mesh did not connect");
        let (rank, b, a) = run(comm).expect("rank failed");
        println!("rank {rank}: heat {b:.3} -> {a:.3}");
        return;
    }

    let handles: Vec<_> = ChannelCluster::new(4)
        .into_iter()
        .enumerate()
        .map(|(r, comm)| {
            thread::Builder::new()
                .name(format!("rank-{r}"))
                .spawn(move || run(comm))
                .expect("failed to spawn rank thread")
        })
        .collect();

    let mut before = 0.0;
    let mut after = 0.0;
    for handle in handles {
        let (rank, b, a) = handle
            .join()
            .expect("rank thread panicked")
            .expect("rank failed");
        println!("rank {rank}: heat {b:.3} -> {a:.3}");
        before += b;
        after += a;
    }
    println!("\ntotal heat {before:.6} -> {after:.6} after 100 ticks");
}

//! Test utilities for Tessel development.
//!
//! Spawns in-process clusters ([`run_cluster`], or over loopback TCP with
//! [`run_tcp_cluster`]), fills storage with
//! reproducible data, installs a test log subscriber, and provides
//! [`Remote`](tessel_registry::Remote) fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::net::TcpListener;
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessel_comm::{ChannelCluster, ChannelComm, Communicator, TcpComm};
use tessel_core::{IntRect, Rank};
use tessel_grid::GridStorage;
use tracing_subscriber::EnvFilter;

/// Generous wait for test receives; only hit when a test is broken.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `f` once per rank of a fresh `size`-rank [`ChannelCluster`], each
/// on its own named thread, and return the results in rank order.
///
/// Panics in any rank are re-raised on the caller's thread.
pub fn run_cluster<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(ChannelComm) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = ChannelCluster::new(size)
        .into_iter()
        .map(|comm| {
            let f = Arc::clone(&f);
            thread::Builder::new()
                .name(format!("rank-{}", comm.rank()))
                .spawn(move || f(comm))
                .expect("failed to spawn rank thread")
        })
        .collect();
    handles
        .into_iter()
        .map(|h| match h.join() {
            Ok(r) => r,
            Err(panic) => std::panic::resume_unwind(panic),
        })
        .collect()
}

/// Like [`run_cluster`], but every rank talks through a [`TcpComm`] on
/// `127.0.0.1`, so messages cross real sockets.
pub fn run_tcp_cluster<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(TcpComm) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let f = Arc::new(f);
    let listeners: Vec<_> = (0..size)
        .map(|_| TcpListener::bind("127.0.0.1:0").expect("failed to bind loopback listener"))
        .collect();
    let addrs: Arc<Vec<_>> = Arc::new(
        listeners
            .iter()
            .map(|l| l.local_addr().expect("listener has no address"))
            .collect(),
    );
    let handles: Vec<_> = listeners
        .into_iter()
        .enumerate()
        .map(|(r, listener)| {
            let f = Arc::clone(&f);
            let addrs = Arc::clone(&addrs);
            thread::Builder::new()
                .name(format!("tcp-rank-{r}"))
                .spawn(move || {
                    let comm = TcpComm::with_listener(Rank(r as u32), listener, &addrs, TEST_TIMEOUT)
                        .expect("tcp mesh did not connect");
                    f(comm)
                })
                .expect("failed to spawn rank thread")
        })
        .collect();
    handles
        .into_iter()
        .map(|h| match h.join() {
            Ok(r) => r,
            Err(panic) => std::panic::resume_unwind(panic),
        })
        .collect()
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Filter with `RUST_LOG`; defaults to `warn`. Safe to call from every
/// test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Deterministic RNG for a test seed.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Scalar storage over `region` filled with uniform values in `[0, 1)`.
pub fn random_scalar_grid(region: &IntRect, seed: u64) -> GridStorage<f64> {
    let mut rng = seeded_rng(seed);
    let mut grid = GridStorage::allocate(region.clone());
    for v in grid.as_mut_slice() {
        *v = rng.random::<f64>();
    }
    grid
}

/// Integer storage over `region` filled with values in `range`.
pub fn random_integer_grid(
    region: &IntRect,
    range: std::ops::Range<i32>,
    seed: u64,
) -> GridStorage<i32> {
    let mut rng = seeded_rng(seed);
    let mut grid = GridStorage::allocate(region.clone());
    for v in grid.as_mut_slice() {
        *v = rng.random_range(range.clone());
    }
    grid
}

/// Value a rank writes at `coord` in cluster tests: unique per cell, so a
/// halo cell's origin is recoverable from its value.
pub fn cell_tag(coord: &[i32]) -> f64 {
    coord.iter().fold(0.0, |acc, &c| acc * 1000.0 + f64::from(c))
}

//! Criterion micro-benchmarks for neighbour queries and the sparse grid.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tessel_bench::{init_agent_positions, place_agents};
use tessel_core::IntRect;
use tessel_space::{BoundaryMode, Metric, NeighbourBuffer, NeighbourQuery};

/// Benchmark: Moore neighbourhood of every cell of a 100x100 torus.
fn bench_chebyshev_toroidal_10k(c: &mut Criterion) {
    let mut query = NeighbourQuery::new(&[100, 100]).unwrap();
    let mut out = NeighbourBuffer::new();

    c.bench_function("chebyshev_toroidal_10k", |b| {
        b.iter(|| {
            for x in 0..100i32 {
                for y in 0..100i32 {
                    query
                        .neighbours(&[x, y], 1, Metric::Chebyshev, BoundaryMode::Toroidal, false, &mut out)
                        .unwrap();
                    black_box(out.len());
                }
            }
        });
    });
}

/// Benchmark: Manhattan radius 3 on a bounded 100x100 field.
fn bench_manhattan_bounded_10k(c: &mut Criterion) {
    let mut query = NeighbourQuery::new(&[100, 100]).unwrap();
    let mut out = NeighbourBuffer::new();

    c.bench_function("manhattan_bounded_r3_10k", |b| {
        b.iter(|| {
            for x in 0..100i32 {
                for y in 0..100i32 {
                    query
                        .neighbours(&[x, y], 3, Metric::Manhattan, BoundaryMode::Bounded, true, &mut out)
                        .unwrap();
                    black_box(out.len());
                }
            }
        });
    });
}

/// Benchmark: Manhattan queries wide enough to need wrap deduplication.
fn bench_manhattan_dedup_small_torus(c: &mut Criterion) {
    let mut query = NeighbourQuery::new(&[6, 6]).unwrap();
    let mut out = NeighbourBuffer::new();

    c.bench_function("manhattan_dedup_6x6_r4", |b| {
        b.iter(|| {
            for x in 0..6i32 {
                for y in 0..6i32 {
                    query
                        .neighbours(&[x, y], 4, Metric::Manhattan, BoundaryMode::Toroidal, true, &mut out)
                        .unwrap();
                    black_box(out.len());
                }
            }
        });
    });
}

/// Benchmark: neighbour lookups for 1000 agents scattered on a 200x200 torus.
fn bench_sparse_neighbours_1k_agents(c: &mut Criterion) {
    let extent = [200u32, 200];
    let positions = init_agent_positions(&extent, 1000, 42);
    let agents = place_agents(&IntRect::with_extent(&extent).unwrap(), &positions);
    let mut query = NeighbourQuery::new(&extent).unwrap();
    let mut cells = NeighbourBuffer::new();
    let mut found = Vec::new();

    c.bench_function("sparse_neighbours_1k_agents_r2", |b| {
        b.iter(|| {
            for (_, at) in &positions {
                agents
                    .neighbours_max_distance(&mut query, at, 2, BoundaryMode::Toroidal, false, &mut cells, &mut found)
                    .unwrap();
                black_box(found.len());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_chebyshev_toroidal_10k,
    bench_manhattan_bounded_10k,
    bench_manhattan_dedup_small_torus,
    bench_sparse_neighbours_1k_agents
);
criterion_main!(benches);

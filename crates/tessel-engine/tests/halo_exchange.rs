//! Halo rounds over in-process and loopback-TCP clusters.
//!
//! Every rank writes a coordinate-derived tag into the cells it owns;
//! after a round each halo cell must hold the tag of the global cell it
//! mirrors (wrapped on a torus).

use tessel_comm::Tag;
use tessel_core::{Coord, IntRect, Rank};
use tessel_engine::{EngineConfig, EngineError, ProcessWorld, SyncError};
use tessel_grid::FieldKind;
use tessel_test_utils::{cell_tag, init_tracing, run_cluster, run_tcp_cluster, TEST_TIMEOUT};

const DONE: Tag = Tag(7);

fn config(extent: &[u32], grid: Option<&[u32]>, halo: u32, toroidal: bool) -> EngineConfig {
    EngineConfig {
        extent: extent.to_vec(),
        process_grid: grid.map(<[u32]>::to_vec),
        halo,
        toroidal,
        sync_timeout_ms: TEST_TIMEOUT.as_millis() as u64,
        ..EngineConfig::default()
    }
}

fn wrap(point: &[i32], global: &IntRect) -> Coord {
    point
        .iter()
        .zip(global.size())
        .map(|(&v, &e)| v.rem_euclid(e))
        .collect()
}

fn tag_owned_cells(world: &mut ProcessWorld) {
    let local = world.local_region().clone();
    let grid = world.storage_mut().as_scalar_mut().unwrap();
    for p in local.iter_points() {
        grid.set(&p, cell_tag(&p)).unwrap();
    }
}

/// Every cell of the stored region, halo included, against its source.
fn mismatches(world: &ProcessWorld) -> Vec<Coord> {
    let global = world.partition().global().clone();
    let grid = world.storage().as_scalar().unwrap();
    world
        .halo_region()
        .iter_points()
        .filter(|p| grid.get(p).unwrap() != cell_tag(&wrap(p, &global)))
        .collect()
}

#[test]
fn bounded_four_by_four_on_two_by_two() {
    init_tracing();
    let results = run_cluster(4, |comm| {
        let mut world =
            ProcessWorld::new(config(&[4, 4], Some(&[2, 2]), 1, false), Box::new(comm)).unwrap();
        tag_owned_cells(&mut world);
        let metrics = world.synchronize().unwrap();
        let rank = world.rank();
        let local = world.local_region().clone();
        let corner_halo = if rank == Rank(0) {
            Some(world.storage().as_scalar().unwrap().get(&[2, 0]).unwrap())
        } else {
            None
        };
        let bad = mismatches(&world);
        world.finish().unwrap();
        (rank, local, corner_halo, bad, metrics.messages_sent)
    });

    let (_, local0, corner, _, sent0) = &results[0];
    assert_eq!(local0, &IntRect::from_corners(&[0, 0], &[2, 2]).unwrap());
    // Cell (2, 0) is owned by grid (1, 0), rank 2.
    assert_eq!(*corner, Some(cell_tag(&[2, 0])));
    assert_eq!(*sent0, 3);
    for (rank, _, _, bad, _) in &results {
        assert!(bad.is_empty(), "rank {rank} halo mismatches at {bad:?}");
    }
}

#[test]
fn toroidal_uneven_split() {
    init_tracing();
    let results = run_cluster(6, |comm| {
        let mut world =
            ProcessWorld::new(config(&[7, 5], Some(&[3, 2]), 2, true), Box::new(comm)).unwrap();
        tag_owned_cells(&mut world);
        world.synchronize().unwrap();
        let bad = mismatches(&world);
        world.finish().unwrap();
        bad
    });
    assert!(results.iter().all(Vec::is_empty), "{results:?}");
}

#[test]
fn toroidal_split_over_sockets() {
    init_tracing();
    let results = run_tcp_cluster(4, |comm| {
        let mut world =
            ProcessWorld::new(config(&[6, 5], Some(&[2, 2]), 1, true), Box::new(comm)).unwrap();
        tag_owned_cells(&mut world);
        world.synchronize().unwrap();
        let first = mismatches(&world);
        tag_owned_cells(&mut world);
        world.step(|_| Ok(())).unwrap();
        let second = mismatches(&world);
        world.finish().unwrap();
        (first, second)
    });
    for (rank, (first, second)) in results.iter().enumerate() {
        assert!(first.is_empty(), "rank {rank} halo mismatches at {first:?}");
        assert!(second.is_empty(), "rank {rank} halo mismatches at {second:?}");
    }
}

#[test]
fn single_process_torus_wraps_onto_itself() {
    let results = run_cluster(1, |comm| {
        let mut world =
            ProcessWorld::new(config(&[3, 3], None, 1, true), Box::new(comm)).unwrap();
        tag_owned_cells(&mut world);
        let metrics = world.synchronize().unwrap();
        (metrics.messages_sent, metrics.local_copies, mismatches(&world))
    });
    let (sent, copies, bad) = &results[0];
    assert_eq!(*sent, 0);
    assert_eq!(*copies, 8);
    assert!(bad.is_empty());
}

#[test]
fn three_dimensional_bounded_field() {
    let results = run_cluster(4, |comm| {
        let mut world =
            ProcessWorld::new(config(&[4, 6, 5], None, 1, false), Box::new(comm)).unwrap();
        tag_owned_cells(&mut world);
        world.synchronize().unwrap();
        let bad = mismatches(&world);
        world.finish().unwrap();
        bad
    });
    assert!(results.iter().all(Vec::is_empty));
}

#[test]
fn integer_and_composite_fields_exchange() {
    let results = run_cluster(2, |comm| {
        let cfg = EngineConfig {
            field: FieldKind::Composite {
                resources: vec!["water".into(), "food".into()],
            },
            ..config(&[4, 3], Some(&[2, 1]), 1, true)
        };
        let mut world = ProcessWorld::new(cfg, Box::new(comm)).unwrap();
        let local = world.local_region().clone();
        let field = world.storage_mut().as_composite_mut().unwrap();
        for p in local.iter_points() {
            field.set_amount(&p, "water", f64::from(p[0])).unwrap();
            field.set_amount(&p, "food", f64::from(p[1]) + 0.5).unwrap();
        }
        world.synchronize().unwrap();
        let field = world.storage().as_composite().unwrap();
        // The row above rank 0 wraps to row 3, owned by rank 1.
        let above = [local.lo()[0] - 1, 1];
        let water = field.amount(&above, "water").unwrap();
        let food = field.amount(&above, "food").unwrap();
        world.finish().unwrap();
        (water, food)
    });
    assert_eq!(results, vec![(3.0, 1.5), (1.0, 1.5)]);

    let ints = run_cluster(2, |comm| {
        let cfg = EngineConfig {
            field: FieldKind::Integer,
            ..config(&[2, 2], Some(&[2, 1]), 1, false)
        };
        let mut world = ProcessWorld::new(cfg, Box::new(comm)).unwrap();
        let me = world.rank().0 as i32;
        let local = world.local_region().clone();
        let grid = world.storage_mut().as_integer_mut().unwrap();
        for p in local.iter_points() {
            grid.set(&p, 10 + me).unwrap();
        }
        world.synchronize().unwrap();
        let other_row = if me == 0 { 1 } else { 0 };
        let seen = world
            .storage()
            .as_integer()
            .unwrap()
            .get(&[other_row, 1])
            .unwrap();
        world.finish().unwrap();
        seen
    });
    assert_eq!(ints, vec![11, 10]);
}

#[test]
fn halo_only_is_written() {
    let results = run_cluster(2, |comm| {
        let mut world =
            ProcessWorld::new(config(&[2, 2], Some(&[2, 1]), 1, true), Box::new(comm)).unwrap();
        let local = world.local_region().clone();
        let mine = f64::from(world.rank().0 + 1);
        world
            .storage_mut()
            .as_scalar_mut()
            .unwrap()
            .fill(mine);
        world.synchronize().unwrap();
        let grid = world.storage().as_scalar().unwrap();
        let untouched = local.iter_points().all(|p| grid.get(&p).unwrap() == mine);
        world.finish().unwrap();
        untouched
    });
    assert_eq!(results, vec![true, true]);
}

#[test]
fn silent_neighbour_times_out() {
    let results = run_cluster(2, |comm| {
        let cfg = EngineConfig {
            sync_timeout_ms: 100,
            ..config(&[4, 4], Some(&[2, 1]), 1, false)
        };
        let mut world = ProcessWorld::new(cfg, Box::new(comm)).unwrap();
        if world.rank() == Rank(1) {
            // Stay connected, but never join the round.
            world
                .communicator()
                .recv(Rank(0), DONE, TEST_TIMEOUT)
                .unwrap();
            return None;
        }
        let outcome = world.synchronize();
        world.communicator().send(Rank(1), DONE, Vec::new()).unwrap();
        Some(outcome)
    });
    match &results[0] {
        Some(Err(EngineError::Sync(SyncError::Timeout { peer, .. }))) => {
            assert_eq!(*peer, Rank(1));
        }
        other => panic!("expected a sync timeout, got {other:?}"),
    }
}

#[test]
fn repeated_rounds_stay_consistent() {
    let results = run_cluster(4, |comm| {
        let mut world =
            ProcessWorld::new(config(&[6, 6], Some(&[2, 2]), 1, true), Box::new(comm)).unwrap();
        let mut all_clean = true;
        for round in 0..5 {
            let local = world.local_region().clone();
            let grid = world.storage_mut().as_scalar_mut().unwrap();
            for p in local.iter_points() {
                grid.set(&p, cell_tag(&p) + f64::from(round) * 1e6).unwrap();
            }
            world.step(|_| Ok(())).unwrap();
            let global = world.partition().global().clone();
            let grid = world.storage().as_scalar().unwrap();
            let offset = f64::from(round) * 1e6;
            all_clean &= world
                .halo_region()
                .iter_points()
                .all(|p| grid.get(&p).unwrap() == cell_tag(&wrap(&p, &global)) + offset);
        }
        let tick = world.tick();
        world.communicator().barrier(TEST_TIMEOUT).unwrap();
        (all_clean, tick.0)
    });
    assert!(results.iter().all(|&(clean, tick)| clean && tick == 5));
}

//! Repartitioning a running field.

use tessel_core::Coord;
use tessel_engine::{EngineConfig, EngineError, ProcessWorld};
use tessel_partition::{PartitionError, ProcessGrid};
use tessel_test_utils::{cell_tag, init_tracing, run_cluster, TEST_TIMEOUT};

fn config(extent: &[u32], grid: &[u32], toroidal: bool) -> EngineConfig {
    EngineConfig {
        extent: extent.to_vec(),
        process_grid: Some(grid.to_vec()),
        halo: 1,
        toroidal,
        sync_timeout_ms: TEST_TIMEOUT.as_millis() as u64,
        ..EngineConfig::default()
    }
}

fn wrapped(p: &[i32], extent: &[i32]) -> Coord {
    p.iter().zip(extent).map(|(&v, &e)| v.rem_euclid(e)).collect()
}

#[test]
fn strips_to_blocks_keeps_every_cell() {
    init_tracing();
    let results = run_cluster(4, |comm| {
        let mut world = ProcessWorld::new(config(&[8, 6], &[4, 1], true), Box::new(comm)).unwrap();
        let local = world.local_region().clone();
        let grid = world.storage_mut().as_scalar_mut().unwrap();
        for p in local.iter_points() {
            grid.set(&p, cell_tag(&p)).unwrap();
        }

        let metrics = world.rebalance(ProcessGrid::new(&[2, 2]).unwrap()).unwrap();
        let extent = world.partition().global().size().to_vec();
        let grid = world.storage().as_scalar().unwrap();
        let bad: Vec<Coord> = world
            .halo_region()
            .iter_points()
            .filter(|p| grid.get(p).unwrap() != cell_tag(&wrapped(p, &extent)))
            .collect();
        let area = world.local_region().area();
        let shape = world.partition().shape().dims().to_vec();
        world.finish().unwrap();
        (bad, metrics, area, shape)
    });

    let mut sent = 0;
    let mut received = 0;
    for (bad, metrics, area, shape) in &results {
        assert!(bad.is_empty(), "stale cells after rebalance: {bad:?}");
        assert_eq!(metrics.cells_kept + metrics.cells_received, *area);
        assert!(metrics.sync.messages_received > 0);
        assert_eq!(shape, &[2, 2]);
        sent += metrics.cells_sent;
        received += metrics.cells_received;
    }
    assert_eq!(sent, received);
    let kept: usize = results.iter().map(|(_, m, ..)| m.cells_kept).sum();
    assert_eq!(kept + sent, 48);
}

#[test]
fn rebalance_then_step_keeps_halos_fresh() {
    let results = run_cluster(2, |comm| {
        let mut world = ProcessWorld::new(config(&[6, 6], &[2, 1], false), Box::new(comm)).unwrap();
        world.rebalance(ProcessGrid::new(&[1, 2]).unwrap()).unwrap();
        let local = world.local_region().clone();
        world
            .step(|w| {
                let grid = w.storage_mut().as_scalar_mut().unwrap();
                for p in local.iter_points() {
                    grid.set(&p, cell_tag(&p))?;
                }
                Ok(())
            })
            .unwrap();
        let grid = world.storage().as_scalar().unwrap();
        let ok = world
            .halo_region()
            .iter_points()
            .all(|p| grid.get(&p).unwrap() == cell_tag(&p));
        world.finish().unwrap();
        ok
    });
    assert_eq!(results, vec![true, true]);
}

#[test]
fn wrong_process_count_is_rejected_before_any_exchange() {
    let results = run_cluster(2, |comm| {
        let mut world = ProcessWorld::new(config(&[4, 4], &[2, 1], false), Box::new(comm)).unwrap();
        let outcome = world.rebalance(ProcessGrid::new(&[2, 2]).unwrap());
        let unchanged = world.partition().shape().dims() == [2, 1];
        world.finish().unwrap();
        (
            matches!(
                outcome,
                Err(EngineError::Partition(
                    PartitionError::ProcessCountMismatch { .. }
                ))
            ),
            unchanged,
        )
    });
    assert_eq!(results, vec![(true, true), (true, true)]);
}

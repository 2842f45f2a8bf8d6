use tessel_space::{BoundaryMode, Metric, NeighbourBuffer, NeighbourQuery, SpaceError, SparseGrid};

fn sorted(buf: &NeighbourBuffer) -> Vec<Vec<i32>> {
    let mut v: Vec<Vec<i32>> = buf.iter().map(|c| c.to_vec()).collect();
    v.sort();
    v
}

#[test]
fn toroidal_3x3_neighbourhood_is_every_other_cell() {
    let mut q = NeighbourQuery::new(&[3, 3]).unwrap();
    let mut out = NeighbourBuffer::new();
    q.neighbours(&[0, 0], 1, Metric::Chebyshev, BoundaryMode::Toroidal, false, &mut out)
        .unwrap();
    let expected: Vec<Vec<i32>> = (0..3)
        .flat_map(|x| (0..3).map(move |y| vec![x, y]))
        .filter(|p| p != &vec![0, 0])
        .collect();
    assert_eq!(sorted(&out), expected);
}

#[test]
fn bounded_manhattan_diamond() {
    let mut q = NeighbourQuery::new(&[10, 10]).unwrap();
    let mut out = NeighbourBuffer::new();
    q.neighbours(&[5, 5], 2, Metric::Manhattan, BoundaryMode::Bounded, true, &mut out)
        .unwrap();
    assert_eq!(out.len(), 13);
    for p in out.iter() {
        assert!((p[0] - 5).abs() + (p[1] - 5).abs() <= 2);
    }
}

#[test]
fn toroidal_wide_radius_never_duplicates() {
    let mut q = NeighbourQuery::new(&[2, 5]).unwrap();
    let mut out = NeighbourBuffer::new();
    for d in 0..8 {
        for metric in [Metric::Chebyshev, Metric::Manhattan] {
            q.neighbours(&[1, 4], d, metric, BoundaryMode::Toroidal, true, &mut out)
                .unwrap();
            let all = sorted(&out);
            let mut dedup = all.clone();
            dedup.dedup();
            assert_eq!(all, dedup, "{metric} d={d}");
            assert!(out.len() <= 10);
        }
    }
}

#[test]
fn mode_codes_from_foreign_callers() {
    let mode = BoundaryMode::try_from(2u8).unwrap();
    assert_eq!(mode, BoundaryMode::Toroidal);
    assert!(matches!(
        BoundaryMode::try_from(9u8),
        Err(SpaceError::InvalidArgument { .. })
    ));
}

#[test]
fn agents_find_each_other_across_wrapped_edge() {
    let mut grid = SparseGrid::new();
    grid.set_location(10u64, &[0, 0]);
    grid.set_location(11u64, &[9, 0]);
    grid.set_location(12u64, &[5, 5]);

    let mut q = NeighbourQuery::new(&[10, 10]).unwrap();
    let mut cells = NeighbourBuffer::new();
    let mut found = Vec::new();
    grid.neighbours_max_distance(&mut q, &[0, 0], 1, BoundaryMode::Toroidal, false, &mut cells, &mut found)
        .unwrap();
    assert_eq!(found, vec![11]);

    grid.neighbours_max_distance(&mut q, &[0, 0], 1, BoundaryMode::Bounded, false, &mut cells, &mut found)
        .unwrap();
    assert!(found.is_empty());
}

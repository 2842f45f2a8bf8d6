//! Neighbour query compliance test helpers.
//!
//! These functions check query output against the invariants every
//! boundary mode must satisfy. Reused by the query and sparse-grid test
//! modules.

use crate::boundary::{BoundaryMode, Metric};
use indexmap::IndexSet;
use tessel_core::Coord;

/// Assert that no coordinate appears twice.
pub fn assert_unique(points: &[Coord]) {
    let unique: IndexSet<&Coord> = points.iter().collect();
    assert_eq!(
        unique.len(),
        points.len(),
        "query returned duplicate coordinates: {points:?}"
    );
}

/// Assert that `got` is exactly the set of points a brute-force scan
/// finds within `d` of `center`.
pub fn assert_matches_brute_force(
    extent: &[u32],
    center: &[i32],
    d: i32,
    metric: Metric,
    mode: BoundaryMode,
    include_origin: bool,
    got: &[Coord],
) {
    let expected = brute_force(extent, center, d, metric, mode, include_origin);
    let got_set: IndexSet<&Coord> = got.iter().collect();
    let expected_set: IndexSet<&Coord> = expected.iter().collect();
    assert_eq!(
        got_set, expected_set,
        "{metric} d={d} mode={mode} center={center:?} extent={extent:?}"
    );
    if mode == BoundaryMode::Bounded {
        for p in got {
            assert!(
                p.iter().zip(extent).all(|(&v, &len)| v >= 0 && (v as u32) < len),
                "bounded query escaped the field: {p:?}"
            );
        }
    }
}

fn brute_force(
    extent: &[u32],
    center: &[i32],
    d: i32,
    metric: Metric,
    mode: BoundaryMode,
    include_origin: bool,
) -> Vec<Coord> {
    let (lo, hi): (Coord, Coord) = match mode {
        BoundaryMode::Unbounded => (
            center.iter().map(|&c| c - d).collect(),
            center.iter().map(|&c| c + d + 1).collect(),
        ),
        BoundaryMode::Bounded | BoundaryMode::Toroidal => (
            extent.iter().map(|_| 0).collect(),
            extent.iter().map(|&e| e as i32).collect(),
        ),
    };
    let origin: Coord = match mode {
        BoundaryMode::Toroidal => center
            .iter()
            .zip(extent)
            .map(|(&c, &e)| c.rem_euclid(e as i32))
            .collect(),
        _ => Coord::from_slice(center),
    };
    let Ok(span) = tessel_core::IntRect::from_corners(&lo, &hi) else {
        return Vec::new();
    };
    span.iter_points()
        .filter(|p| metric.distance(p, &origin, extent, mode) as i64 <= i64::from(d))
        .filter(|p| include_origin || *p != origin)
        .collect()
}

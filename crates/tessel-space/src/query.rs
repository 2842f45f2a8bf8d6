//! Neighbourhood enumeration.

use crate::boundary::{BoundaryMode, Metric};
use crate::buffer::NeighbourBuffer;
use crate::error::SpaceError;
use indexmap::IndexSet;
use smallvec::SmallVec;
use tessel_core::Coord;

/// Enumerates the integer points within a distance of a center.
///
/// A query is bound to a field extent (used by the bounded and toroidal
/// modes) and owns the scratch state needed for toroidal duplicate
/// suppression, so one instance can serve every agent of a step without
/// allocating.
///
/// # Examples
///
/// ```
/// use tessel_space::{BoundaryMode, Metric, NeighbourBuffer, NeighbourQuery};
///
/// let mut query = NeighbourQuery::new(&[3, 3]).unwrap();
/// let mut out = NeighbourBuffer::new();
/// query
///     .neighbours(&[0, 0], 1, Metric::Chebyshev, BoundaryMode::Toroidal, false, &mut out)
///     .unwrap();
/// assert_eq!(out.len(), 8);
/// ```
#[derive(Clone, Debug)]
pub struct NeighbourQuery {
    extent: SmallVec<[u32; 4]>,
    point: Coord,
    seen: IndexSet<Coord>,
}

/// Per-axis offset window `[lo, hi]` for a Chebyshev walk.
type Window = SmallVec<[(i32, i32); 4]>;

impl NeighbourQuery {
    /// Create a query over a field of the given per-axis extent.
    ///
    /// Returns `Err(SpaceError::EmptySpace)` if the extent has no axes or
    /// any axis has length zero.
    pub fn new(extent: &[u32]) -> Result<Self, SpaceError> {
        if extent.is_empty() || extent.contains(&0) || extent.iter().any(|&e| e > i32::MAX as u32)
        {
            return Err(SpaceError::EmptySpace);
        }
        Ok(Self {
            extent: SmallVec::from_slice(extent),
            point: Coord::new(),
            seen: IndexSet::new(),
        })
    }

    /// The field extent this query wraps and clips against.
    pub fn extent(&self) -> &[u32] {
        &self.extent
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.extent.len()
    }

    /// Fill `out` with every point within `distance` of `center`.
    ///
    /// - **Bounded**: points outside `[0, extent)` are dropped.
    /// - **Unbounded**: no clipping.
    /// - **Toroidal**: coordinates wrap modulo the extent and each cell
    ///   appears at most once. Chebyshev windows are limited to one full
    ///   period per axis; Manhattan results pass through a
    ///   coordinate-keyed set whenever a wrap duplicate is possible
    ///   (`2 * distance >= extent` on some axis).
    ///
    /// The center (after wrapping, in toroidal mode) is excluded unless
    /// `include_origin` is set. Results are in a deterministic order:
    /// row-major by offset, last axis fastest.
    pub fn neighbours(
        &mut self,
        center: &[i32],
        distance: i32,
        metric: Metric,
        mode: BoundaryMode,
        include_origin: bool,
        out: &mut NeighbourBuffer,
    ) -> Result<(), SpaceError> {
        out.reset(self.ndim());
        if distance < 0 {
            return Err(SpaceError::InvalidArgument {
                reason: format!("distance must be non-negative, got {distance}"),
            });
        }
        if center.len() != self.ndim() {
            return Err(SpaceError::DimensionMismatch {
                expected: self.ndim(),
                got: center.len(),
            });
        }

        let origin: Coord = match mode {
            BoundaryMode::Toroidal => center
                .iter()
                .zip(&self.extent)
                .map(|(&c, &len)| c.rem_euclid(len as i32))
                .collect(),
            BoundaryMode::Bounded | BoundaryMode::Unbounded => Coord::from_slice(center),
        };
        let dedup = mode == BoundaryMode::Toroidal
            && metric == Metric::Manhattan
            && self
                .extent
                .iter()
                .any(|&len| 2 * i64::from(distance) >= i64::from(len));
        self.seen.clear();
        self.point.clear();
        self.point.resize(self.ndim(), 0);

        let mut walk = Walk {
            origin: &origin,
            extent: &self.extent,
            mode,
            include_origin,
            dedup,
            point: &mut self.point,
            seen: &mut self.seen,
            out,
        };
        match metric {
            Metric::Chebyshev => {
                let window = chebyshev_window(&self.extent, distance, mode);
                walk.chebyshev(0, &window);
            }
            Metric::Manhattan => walk.manhattan(0, distance),
        }
        Ok(())
    }
}

/// Offset window per axis. Toroidal windows wider than the axis are cut
/// to exactly one period so wrapped coordinates cannot repeat.
fn chebyshev_window(extent: &[u32], distance: i32, mode: BoundaryMode) -> Window {
    extent
        .iter()
        .map(|&len| {
            let (lo, hi) = (-distance, distance);
            if mode == BoundaryMode::Toroidal && i64::from(hi) - i64::from(lo) >= i64::from(len) {
                (lo, lo + len as i32 - 1)
            } else {
                (lo, hi)
            }
        })
        .collect()
}

/// Offsets to visit on one axis with `budget` left. On a torus each
/// residue is visited once, at its shortest offset, so the walk is
/// bounded by the extent rather than the distance.
fn manhattan_range(len: u32, budget: i32, mode: BoundaryMode) -> (i32, i32) {
    if mode != BoundaryMode::Toroidal {
        return (-budget, budget);
    }
    let len = i64::from(len);
    let lo = (-i64::from(budget)).max(-((len - 1) / 2));
    let hi = i64::from(budget).min(len / 2);
    (lo as i32, hi as i32)
}

struct Walk<'a> {
    origin: &'a [i32],
    extent: &'a [u32],
    mode: BoundaryMode,
    include_origin: bool,
    dedup: bool,
    point: &'a mut Coord,
    seen: &'a mut IndexSet<Coord>,
    out: &'a mut NeighbourBuffer,
}

impl Walk<'_> {
    fn chebyshev(&mut self, axis: usize, window: &Window) {
        let (lo, hi) = window[axis];
        for offset in lo..=hi {
            if !self.place(axis, offset) {
                continue;
            }
            if axis + 1 == self.origin.len() {
                self.emit();
            } else {
                self.chebyshev(axis + 1, window);
            }
        }
    }

    fn manhattan(&mut self, axis: usize, budget: i32) {
        let (lo, hi) = manhattan_range(self.extent[axis], budget, self.mode);
        for offset in lo..=hi {
            if !self.place(axis, offset) {
                continue;
            }
            if axis + 1 == self.origin.len() {
                self.emit();
            } else {
                self.manhattan(axis + 1, budget - offset.abs());
            }
        }
    }

    /// Set the axis component for `offset`; false if the point is
    /// clipped away on this axis.
    fn place(&mut self, axis: usize, offset: i32) -> bool {
        let raw = self.origin[axis] + offset;
        match self.mode.resolve_axis(raw, self.extent[axis]) {
            Some(v) => {
                self.point[axis] = v;
                true
            }
            None => false,
        }
    }

    fn emit(&mut self) {
        if !self.include_origin && self.point.as_slice() == self.origin {
            return;
        }
        if self.dedup && !self.seen.insert(self.point.clone()) {
            return;
        }
        self.out.push(&self.point[..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use proptest::prelude::*;

    fn run(
        extent: &[u32],
        center: &[i32],
        d: i32,
        metric: Metric,
        mode: BoundaryMode,
        origin: bool,
    ) -> Vec<Coord> {
        let mut q = NeighbourQuery::new(extent).unwrap();
        let mut out = NeighbourBuffer::new();
        q.neighbours(center, d, metric, mode, origin, &mut out)
            .unwrap();
        out.to_vec()
    }

    #[test]
    fn toroidal_chebyshev_3x3_returns_other_eight_once() {
        let got = run(&[3, 3], &[0, 0], 1, Metric::Chebyshev, BoundaryMode::Toroidal, false);
        assert_eq!(got.len(), 8);
        compliance::assert_unique(&got);
        assert!(!got.iter().any(|p| p.as_slice() == [0, 0]));
        for p in &got {
            assert!(p.iter().all(|&v| (0..3).contains(&v)));
        }
    }

    #[test]
    fn bounded_manhattan_radius_two_has_thirteen_cells() {
        let got = run(&[10, 10], &[5, 5], 2, Metric::Manhattan, BoundaryMode::Bounded, true);
        assert_eq!(got.len(), 13);
        assert!(got.iter().any(|p| p.as_slice() == [5, 5]));
    }

    #[test]
    fn bounded_corner_is_clipped() {
        let got = run(&[10, 10], &[0, 0], 1, Metric::Chebyshev, BoundaryMode::Bounded, false);
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn unbounded_keeps_negative_coordinates() {
        let got = run(&[4, 4], &[0, 0], 1, Metric::Manhattan, BoundaryMode::Unbounded, false);
        assert_eq!(got.len(), 4);
        assert!(got.iter().any(|p| p.as_slice() == [-1, 0]));
    }

    #[test]
    fn zero_distance_yields_origin_only_when_included() {
        assert_eq!(
            run(&[5], &[2], 0, Metric::Manhattan, BoundaryMode::Bounded, true).len(),
            1
        );
        assert!(run(&[5], &[2], 0, Metric::Manhattan, BoundaryMode::Bounded, false).is_empty());
    }

    #[test]
    fn toroidal_manhattan_large_radius_covers_field_once() {
        let got = run(&[4, 3], &[1, 1], 9, Metric::Manhattan, BoundaryMode::Toroidal, true);
        assert_eq!(got.len(), 12);
        compliance::assert_unique(&got);
    }

    #[test]
    fn toroidal_manhattan_walk_is_bounded_by_extent() {
        // Visits at most one offset per residue, so huge radii stay cheap.
        let got = run(&[3, 3], &[0, 0], 1_000_000, Metric::Manhattan, BoundaryMode::Toroidal, true);
        assert_eq!(got.len(), 9);
        compliance::assert_unique(&got);

        let got = run(&[5, 4, 3], &[4, 0, 2], i32::MAX, Metric::Manhattan, BoundaryMode::Toroidal, false);
        assert_eq!(got.len(), 5 * 4 * 3 - 1);
        compliance::assert_unique(&got);
    }

    #[test]
    fn toroidal_manhattan_uses_shortest_wrap() {
        // On a 6-wide ring, x = 4 is two steps from 0 the short way round.
        let got = run(&[6], &[0], 2, Metric::Manhattan, BoundaryMode::Toroidal, true);
        let mut xs: Vec<i32> = got.iter().map(|p| p[0]).collect();
        xs.sort_unstable();
        assert_eq!(xs, vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn toroidal_center_outside_field_is_wrapped() {
        let got = run(&[5, 5], &[-1, 6], 0, Metric::Chebyshev, BoundaryMode::Toroidal, true);
        assert_eq!(got, vec![Coord::from_slice(&[4, 1])]);
    }

    #[test]
    fn negative_distance_is_invalid_argument() {
        let mut q = NeighbourQuery::new(&[3, 3]).unwrap();
        let mut out = NeighbourBuffer::new();
        let err = q
            .neighbours(&[0, 0], -1, Metric::Chebyshev, BoundaryMode::Bounded, false, &mut out)
            .unwrap_err();
        assert!(matches!(err, SpaceError::InvalidArgument { .. }));
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let mut q = NeighbourQuery::new(&[3, 3]).unwrap();
        let mut out = NeighbourBuffer::new();
        assert_eq!(
            q.neighbours(&[0], 1, Metric::Chebyshev, BoundaryMode::Bounded, false, &mut out),
            Err(SpaceError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn empty_extent_rejected() {
        assert_eq!(NeighbourQuery::new(&[]).unwrap_err(), SpaceError::EmptySpace);
        assert_eq!(NeighbourQuery::new(&[3, 0]).unwrap_err(), SpaceError::EmptySpace);
    }

    #[test]
    fn buffer_is_cleared_between_calls() {
        let mut q = NeighbourQuery::new(&[10, 10]).unwrap();
        let mut out = NeighbourBuffer::new();
        q.neighbours(&[5, 5], 3, Metric::Chebyshev, BoundaryMode::Bounded, true, &mut out)
            .unwrap();
        assert_eq!(out.len(), 49);
        q.neighbours(&[5, 5], 1, Metric::Manhattan, BoundaryMode::Bounded, false, &mut out)
            .unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn three_dimensional_chebyshev_cube() {
        let got = run(&[5, 5, 5], &[2, 2, 2], 1, Metric::Chebyshev, BoundaryMode::Bounded, false);
        assert_eq!(got.len(), 26);
    }

    fn arb_mode() -> impl Strategy<Value = BoundaryMode> {
        prop_oneof![
            Just(BoundaryMode::Bounded),
            Just(BoundaryMode::Unbounded),
            Just(BoundaryMode::Toroidal),
        ]
    }

    fn arb_metric() -> impl Strategy<Value = Metric> {
        prop_oneof![Just(Metric::Chebyshev), Just(Metric::Manhattan)]
    }

    proptest! {
        #[test]
        fn query_matches_metric_definition(
            w in 1u32..7,
            h in 1u32..7,
            cx in -2i32..8,
            cy in -2i32..8,
            d in 0i32..7,
            metric in arb_metric(),
            mode in arb_mode(),
            origin in any::<bool>(),
        ) {
            let got = run(&[w, h], &[cx, cy], d, metric, mode, origin);
            compliance::assert_unique(&got);
            compliance::assert_matches_brute_force(&[w, h], &[cx, cy], d, metric, mode, origin, &got);
        }
    }
}

//! Cartesian process topology.

use crate::error::PartitionError;
use smallvec::SmallVec;
use tessel_core::{Coord, Rank};

/// Number of processes along each axis of the field.
///
/// Ranks map to grid coordinates row-major, last axis fastest, matching
/// cell order inside rectangles.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProcessGrid {
    dims: SmallVec<[u32; 4]>,
}

impl ProcessGrid {
    /// A grid with `dims[a]` processes along axis `a`.
    pub fn new(dims: &[u32]) -> Result<Self, PartitionError> {
        if dims.is_empty() {
            return Err(PartitionError::InvalidShape {
                reason: "process grid needs at least one axis".to_string(),
            });
        }
        if let Some(axis) = dims.iter().position(|&d| d == 0) {
            return Err(PartitionError::InvalidShape {
                reason: format!("axis {axis} has zero processes"),
            });
        }
        Ok(Self {
            dims: SmallVec::from_slice(dims),
        })
    }

    /// Factor `process_count` into a near-cubic `ndim`-axis grid.
    ///
    /// Prime factors are handed out largest first to the axis with the
    /// fewest processes so far; the result is sorted so leading axes get
    /// the most processes.
    ///
    /// ```
    /// use tessel_partition::ProcessGrid;
    ///
    /// assert_eq!(ProcessGrid::balanced(12, 2).unwrap().dims(), &[4, 3]);
    /// assert_eq!(ProcessGrid::balanced(7, 2).unwrap().dims(), &[7, 1]);
    /// ```
    pub fn balanced(process_count: usize, ndim: usize) -> Result<Self, PartitionError> {
        if process_count == 0 || ndim == 0 {
            return Err(PartitionError::InvalidShape {
                reason: format!("cannot factor {process_count} processes over {ndim} axes"),
            });
        }
        let count = u32::try_from(process_count).map_err(|_| PartitionError::InvalidShape {
            reason: format!("{process_count} processes exceeds the supported maximum"),
        })?;
        let mut dims: SmallVec<[u32; 4]> = SmallVec::from_elem(1, ndim);
        for factor in prime_factors(count).into_iter().rev() {
            if let Some(smallest) = dims.iter_mut().min_by_key(|d| **d) {
                *smallest *= factor;
            }
        }
        dims.sort_unstable_by(|a, b| b.cmp(a));
        Ok(Self { dims })
    }

    /// Processes per axis.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of processes.
    pub fn process_count(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// Grid coordinate of `rank`.
    pub fn coords_of(&self, rank: Rank) -> Option<Coord> {
        if rank.index() >= self.process_count() {
            return None;
        }
        let mut rem = rank.index();
        let mut coords: Coord = SmallVec::from_elem(0, self.ndim());
        for a in (0..self.ndim()).rev() {
            let d = self.dims[a] as usize;
            coords[a] = (rem % d) as i32;
            rem /= d;
        }
        Some(coords)
    }

    /// Rank at grid coordinate `coords`.
    pub fn rank_of(&self, coords: &[i32]) -> Option<Rank> {
        if coords.len() != self.ndim() {
            return None;
        }
        let mut idx = 0usize;
        for (&c, &d) in coords.iter().zip(&self.dims) {
            if c < 0 || c as u32 >= d {
                return None;
            }
            idx = idx * d as usize + c as usize;
        }
        Some(Rank(idx as u32))
    }
}

fn prime_factors(mut n: u32) -> Vec<u32> {
    let mut factors = Vec::new();
    let mut p = 2;
    while u64::from(p) * u64::from(p) <= u64::from(n) {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_coordinate_round_trip() {
        let g = ProcessGrid::new(&[2, 3]).unwrap();
        assert_eq!(g.process_count(), 6);
        for r in 0..6 {
            let c = g.coords_of(Rank(r)).unwrap();
            assert_eq!(g.rank_of(&c), Some(Rank(r)));
        }
        assert_eq!(g.coords_of(Rank(1)).unwrap().as_slice(), &[0, 1]);
        assert_eq!(g.coords_of(Rank(3)).unwrap().as_slice(), &[1, 0]);
        assert_eq!(g.coords_of(Rank(6)), None);
        assert_eq!(g.rank_of(&[2, 0]), None);
    }

    #[test]
    fn rejects_zero_axes() {
        assert!(ProcessGrid::new(&[]).is_err());
        assert!(ProcessGrid::new(&[2, 0]).is_err());
        assert!(ProcessGrid::balanced(0, 2).is_err());
    }

    #[test]
    fn balanced_factoring() {
        assert_eq!(ProcessGrid::balanced(4, 2).unwrap().dims(), &[2, 2]);
        assert_eq!(ProcessGrid::balanced(8, 3).unwrap().dims(), &[2, 2, 2]);
        assert_eq!(ProcessGrid::balanced(6, 2).unwrap().dims(), &[3, 2]);
        assert_eq!(ProcessGrid::balanced(1, 3).unwrap().dims(), &[1, 1, 1]);
        for n in 1..64 {
            assert_eq!(ProcessGrid::balanced(n, 2).unwrap().process_count(), n);
        }
    }
}

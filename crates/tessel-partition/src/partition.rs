//! Area-balanced slicing of the global field.

use crate::error::PartitionError;
use crate::grid::ProcessGrid;
use smallvec::SmallVec;
use tessel_core::{Coord, IntRect, Rank};
use tracing::info;

/// Inputs to [`Partition::compute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Bounds of the whole field.
    pub global: IntRect,
    /// Number of cooperating processes.
    pub process_count: usize,
    /// Processes per axis; the product must equal `process_count`.
    pub shape: ProcessGrid,
    /// Halo margin in cells around every local region.
    pub halo: u32,
    /// Whether the field wraps around on every axis.
    pub toroidal: bool,
}

/// The decomposition of a global field across processes.
///
/// Local regions are pairwise disjoint and their union is exactly the
/// global bounds. Every process computes the same `Partition` from the
/// same config, so neighbour relations and transfer geometry never need
/// to be negotiated over the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    global: IntRect,
    shape: ProcessGrid,
    halo: u32,
    toroidal: bool,
    /// Slab boundaries per axis: `cuts[a][i]..cuts[a][i + 1]` is the
    /// span of grid column `i` on axis `a`.
    cuts: SmallVec<[Vec<i32>; 4]>,
    regions: Vec<IntRect>,
    neighbours: Vec<Vec<Rank>>,
}

impl Partition {
    /// Slice the global bounds into `process_count` area-balanced local
    /// regions laid out on `shape`.
    ///
    /// Along an axis with extent `E` and `n` processes each slab gets
    /// `E / n` cells and the first `E % n` slabs one more.
    pub fn compute(config: &PartitionConfig) -> Result<Self, PartitionError> {
        let PartitionConfig {
            global,
            process_count,
            shape,
            halo,
            toroidal,
        } = config;
        if shape.ndim() != global.ndim() {
            return Err(PartitionError::DimensionMismatch {
                field: global.ndim(),
                grid: shape.ndim(),
            });
        }
        if shape.process_count() != *process_count {
            return Err(PartitionError::ProcessCountMismatch {
                process_count: *process_count,
                grid_processes: shape.process_count(),
            });
        }

        let mut cuts: SmallVec<[Vec<i32>; 4]> = SmallVec::new();
        for (axis, (&extent, &processes)) in global.size().iter().zip(shape.dims()).enumerate() {
            if processes as i64 > extent as i64 {
                return Err(PartitionError::EmptySlab {
                    axis,
                    extent,
                    processes,
                });
            }
            if *toroidal && *halo as i64 > extent as i64 {
                return Err(PartitionError::HaloTooWide {
                    axis,
                    halo: *halo,
                    extent,
                });
            }
            let base = extent / processes as i32;
            let rem = extent % processes as i32;
            let mut axis_cuts = Vec::with_capacity(processes as usize + 1);
            let mut cursor = global.lo()[axis];
            axis_cuts.push(cursor);
            for i in 0..processes as i32 {
                cursor += base + i32::from(i < rem);
                axis_cuts.push(cursor);
            }
            cuts.push(axis_cuts);
        }

        let mut regions = Vec::with_capacity(*process_count);
        for r in 0..*process_count {
            let coords = shape.coords_of(Rank(r as u32)).ok_or(PartitionError::UnknownRank {
                rank: Rank(r as u32),
                process_count: *process_count,
            })?;
            let lo: Coord = (0..global.ndim())
                .map(|a| cuts[a][coords[a] as usize])
                .collect();
            let hi: Coord = (0..global.ndim())
                .map(|a| cuts[a][coords[a] as usize + 1])
                .collect();
            regions.push(IntRect::from_corners(&lo, &hi)?);
        }

        let mut partition = Self {
            global: global.clone(),
            shape: shape.clone(),
            halo: *halo,
            toroidal: *toroidal,
            cuts,
            regions,
            neighbours: Vec::new(),
        };
        partition.neighbours = (0..*process_count)
            .map(|p| partition.find_neighbours(Rank(p as u32)))
            .collect();
        info!(
            processes = process_count,
            shape = ?partition.shape.dims(),
            halo,
            toroidal,
            "partition computed"
        );
        Ok(partition)
    }

    /// Recompute with a new process grid, keeping bounds, halo, and wrap.
    pub fn rebalance(&self, shape: ProcessGrid) -> Result<Self, PartitionError> {
        Self::compute(&PartitionConfig {
            global: self.global.clone(),
            process_count: shape.process_count(),
            shape,
            halo: self.halo,
            toroidal: self.toroidal,
        })
    }

    /// Bounds of the whole field.
    pub fn global(&self) -> &IntRect {
        &self.global
    }

    /// Process-grid shape.
    pub fn shape(&self) -> &ProcessGrid {
        &self.shape
    }

    /// Halo margin in cells.
    pub fn halo(&self) -> u32 {
        self.halo
    }

    /// Whether the field wraps around.
    pub fn is_toroidal(&self) -> bool {
        self.toroidal
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.regions.len()
    }

    /// The region `rank` owns.
    pub fn local_region(&self, rank: Rank) -> Result<&IntRect, PartitionError> {
        self.regions.get(rank.index()).ok_or(PartitionError::UnknownRank {
            rank,
            process_count: self.process_count(),
        })
    }

    /// Every local region, indexed by rank.
    pub fn local_regions(&self) -> &[IntRect] {
        &self.regions
    }

    /// The local region of `rank` grown by the partition's halo margin.
    pub fn halo_region(&self, rank: Rank) -> Result<IntRect, PartitionError> {
        self.halo_region_with(rank, self.halo)
    }

    /// The local region of `rank` grown by `margin` on every side.
    ///
    /// Clipped to the global bounds unless the field is toroidal; a
    /// toroidal halo extends past the bounds and its outer cells stand
    /// for the wrapped cells on the far side. On a bounded field a
    /// margin wider than the field is clamped to the field.
    pub fn halo_region_with(&self, rank: Rank, margin: u32) -> Result<IntRect, PartitionError> {
        let local = self.local_region(rank)?;
        let margin = if self.toroidal {
            margin
        } else {
            let widest = self.global.size().iter().copied().max().unwrap_or(0);
            margin.min(widest.max(0) as u32)
        };
        let grown = i32::try_from(margin)
            .ok()
            .and_then(|m| local.expand(m))
            .ok_or_else(|| PartitionError::InvalidShape {
                reason: format!("halo margin {margin} overflows region {local}"),
            })?;
        if self.toroidal {
            Ok(grown)
        } else {
            // The grown rectangle always contains `local`, itself inside `global`.
            Ok(grown.intersect(&self.global).unwrap_or_else(|| local.clone()))
        }
    }

    /// Ranks whose halo region intersects the local region of `rank`,
    /// including periodic images on a toroidal field. Sorted ascending,
    /// never containing `rank` itself. Symmetric.
    pub fn neighbours_of(&self, rank: Rank) -> Result<&[Rank], PartitionError> {
        self.neighbours
            .get(rank.index())
            .map(Vec::as_slice)
            .ok_or(PartitionError::UnknownRank {
                rank,
                process_count: self.process_count(),
            })
    }

    /// Periodic image offsets, zero first.
    ///
    /// On a toroidal field every axis contributes `0, -E, +E`; otherwise
    /// the only offset is zero. Halo planning iterates this list in this
    /// order on both sides of an exchange.
    pub fn wrap_shifts(&self) -> Vec<Coord> {
        let ndim = self.global.ndim();
        let options: SmallVec<[[i32; 3]; 4]> =
            self.global.size().iter().map(|&e| [0, -e, e]).collect();
        let per_axis: usize = if self.toroidal { 3 } else { 1 };
        let total = per_axis.pow(ndim as u32);
        (0..total)
            .map(|mut idx| {
                let mut shift: Coord = SmallVec::from_elem(0, ndim);
                for a in (0..ndim).rev() {
                    shift[a] = options[a][idx % per_axis];
                    idx /= per_axis;
                }
                shift
            })
            .collect()
    }

    /// The rank owning global point `point`, wrapping it first on a
    /// toroidal field. `None` outside a bounded field.
    pub fn owner_of(&self, point: &[i32]) -> Option<Rank> {
        if point.len() != self.global.ndim() {
            return None;
        }
        let mut grid: Coord = SmallVec::with_capacity(point.len());
        for (a, &v) in point.iter().enumerate() {
            let lo = self.global.lo()[a];
            let extent = self.global.size()[a];
            let v = if self.toroidal {
                lo + (v - lo).rem_euclid(extent)
            } else if v < lo || v >= lo + extent {
                return None;
            } else {
                v
            };
            let column = self.cuts[a].partition_point(|&c| c <= v) - 1;
            grid.push(column as i32);
        }
        self.shape.rank_of(&grid)
    }

    fn find_neighbours(&self, rank: Rank) -> Vec<Rank> {
        let local = &self.regions[rank.index()];
        let shifts = self.wrap_shifts();
        (0..self.process_count())
            .map(|q| Rank(q as u32))
            .filter(|&q| q != rank)
            .filter(|&q| {
                self.halo_region(q).is_ok_and(|halo| {
                    shifts.iter().any(|s| halo.shift(s).intersects(local))
                })
            })
            .collect()
    }
}

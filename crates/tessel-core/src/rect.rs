//! Axis-aligned N-dimensional integer rectangles.

use crate::error::GeometryError;
use crate::id::Coord;
use smallvec::SmallVec;
use std::fmt;

/// An axis-aligned rectangle of integer cells.
///
/// Defined by an inclusive lower corner and a strictly positive size per
/// axis; the upper corner [`hi`](Self::hi) is exclusive. Rectangles are
/// immutable values: every combinator returns a new rectangle.
///
/// Cells inside a rectangle are ordered row-major with the **last** axis
/// varying fastest. [`flat_index`](Self::flat_index) and
/// [`iter_points`](Self::iter_points) both follow that order, and so does
/// every buffer laid out over a rectangle in this workspace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntRect {
    lo: Coord,
    size: Coord,
}

impl IntRect {
    /// Create a rectangle from its lower corner and per-axis size.
    ///
    /// Returns `Err` if the slices disagree in length, are empty, or any
    /// size is not positive.
    pub fn new(lo: &[i32], size: &[i32]) -> Result<Self, GeometryError> {
        if lo.is_empty() {
            return Err(GeometryError::ZeroDimensions);
        }
        if lo.len() != size.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: lo.len(),
                got: size.len(),
            });
        }
        if let Some((axis, &s)) = size.iter().enumerate().find(|(_, &s)| s <= 0) {
            return Err(GeometryError::InvalidSize { axis, size: s });
        }
        Ok(Self {
            lo: Coord::from_slice(lo),
            size: Coord::from_slice(size),
        })
    }

    /// Create a rectangle spanning `lo` (inclusive) to `hi` (exclusive).
    pub fn from_corners(lo: &[i32], hi: &[i32]) -> Result<Self, GeometryError> {
        if lo.len() != hi.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: lo.len(),
                got: hi.len(),
            });
        }
        let size: Coord = lo.iter().zip(hi).map(|(&l, &h)| h - l).collect();
        Self::new(lo, &size)
    }

    /// A rectangle anchored at the origin with the given extent.
    pub fn with_extent(extent: &[u32]) -> Result<Self, GeometryError> {
        let mut size = Coord::with_capacity(extent.len());
        for (axis, &e) in extent.iter().enumerate() {
            let s = i32::try_from(e).map_err(|_| GeometryError::InvalidSize { axis, size: -1 })?;
            size.push(s);
        }
        let lo: Coord = std::iter::repeat_n(0, extent.len()).collect();
        Self::new(&lo, &size)
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.lo.len()
    }

    /// Inclusive lower corner.
    pub fn lo(&self) -> &[i32] {
        &self.lo
    }

    /// Per-axis size.
    pub fn size(&self) -> &[i32] {
        &self.size
    }

    /// Exclusive upper corner.
    pub fn hi(&self) -> Coord {
        self.lo.iter().zip(&self.size).map(|(&l, &s)| l + s).collect()
    }

    /// Number of cells.
    pub fn area(&self) -> usize {
        self.size.iter().map(|&s| s as usize).product()
    }

    /// Row-major strides in cells, last axis stride 1.
    pub fn strides(&self) -> SmallVec<[usize; 4]> {
        let mut strides: SmallVec<[usize; 4]> = SmallVec::from_elem(1, self.ndim());
        for axis in (0..self.ndim().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.size[axis + 1] as usize;
        }
        strides
    }

    /// Whether `point` lies inside the rectangle.
    ///
    /// A point of the wrong dimensionality is never contained.
    pub fn contains(&self, point: &[i32]) -> bool {
        point.len() == self.ndim()
            && point
                .iter()
                .zip(self.lo.iter().zip(&self.size))
                .all(|(&p, (&l, &s))| p >= l && p < l + s)
    }

    /// Whether `other` lies wholly inside this rectangle.
    pub fn contains_rect(&self, other: &IntRect) -> bool {
        other.ndim() == self.ndim()
            && (0..self.ndim()).all(|a| {
                other.lo[a] >= self.lo[a]
                    && other.lo[a] + other.size[a] <= self.lo[a] + self.size[a]
            })
    }

    /// The cells shared by both rectangles, or `None` if they are
    /// disjoint or of different dimensionality.
    pub fn intersect(&self, other: &IntRect) -> Option<IntRect> {
        if other.ndim() != self.ndim() {
            return None;
        }
        let mut lo = Coord::with_capacity(self.ndim());
        let mut size = Coord::with_capacity(self.ndim());
        for a in 0..self.ndim() {
            let l = self.lo[a].max(other.lo[a]);
            let h = (self.lo[a] + self.size[a]).min(other.lo[a] + other.size[a]);
            if h <= l {
                return None;
            }
            lo.push(l);
            size.push(h - l);
        }
        Some(IntRect { lo, size })
    }

    /// Whether the rectangles share at least one cell.
    pub fn intersects(&self, other: &IntRect) -> bool {
        other.ndim() == self.ndim()
            && (0..self.ndim()).all(|a| {
                self.lo[a] < other.lo[a] + other.size[a]
                    && other.lo[a] < self.lo[a] + self.size[a]
            })
    }

    /// The same rectangle translated by `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` has a different dimensionality.
    pub fn shift(&self, offset: &[i32]) -> IntRect {
        assert_eq!(offset.len(), self.ndim(), "shift dimensionality mismatch");
        IntRect {
            lo: self.lo.iter().zip(offset).map(|(&l, &o)| l + o).collect(),
            size: self.size.clone(),
        }
    }

    /// The rectangle grown by `margin` cells on both sides of every axis.
    ///
    /// A negative margin shrinks the rectangle; returns `None` if that
    /// would leave an axis empty or a corner overflows `i32`.
    pub fn expand(&self, margin: i32) -> Option<IntRect> {
        let mut lo = Coord::with_capacity(self.ndim());
        let mut size = Coord::with_capacity(self.ndim());
        for a in 0..self.ndim() {
            let s = margin
                .checked_mul(2)
                .and_then(|m| self.size[a].checked_add(m))?;
            let l = self.lo[a].checked_sub(margin)?;
            if s <= 0 || l.checked_add(s).is_none() {
                return None;
            }
            lo.push(l);
            size.push(s);
        }
        Some(IntRect { lo, size })
    }

    /// Row-major index of `point` relative to the lower corner, or `None`
    /// if the point lies outside.
    pub fn flat_index(&self, point: &[i32]) -> Option<usize> {
        if !self.contains(point) {
            return None;
        }
        let mut idx = 0usize;
        for a in 0..self.ndim() {
            idx = idx * self.size[a] as usize + (point[a] - self.lo[a]) as usize;
        }
        Some(idx)
    }

    /// The point at row-major position `index`, inverse of
    /// [`flat_index`](Self::flat_index).
    pub fn point_at(&self, index: usize) -> Option<Coord> {
        if index >= self.area() {
            return None;
        }
        let mut rem = index;
        let mut point: Coord = SmallVec::from_elem(0, self.ndim());
        for a in (0..self.ndim()).rev() {
            let s = self.size[a] as usize;
            point[a] = self.lo[a] + (rem % s) as i32;
            rem /= s;
        }
        Some(point)
    }

    /// Iterate over every cell in row-major order.
    pub fn iter_points(&self) -> PointIter<'_> {
        PointIter {
            rect: self,
            next: Some(self.lo.clone()),
        }
    }
}

impl fmt::Display for IntRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}..{:?}", self.lo.as_slice(), self.hi().as_slice())
    }
}

/// Row-major iterator over the cells of an [`IntRect`].
pub struct PointIter<'a> {
    rect: &'a IntRect,
    next: Option<Coord>,
}

impl Iterator for PointIter<'_> {
    type Item = Coord;

    fn next(&mut self) -> Option<Coord> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        for a in (0..self.rect.ndim()).rev() {
            succ[a] += 1;
            if succ[a] < self.rect.lo[a] + self.rect.size[a] {
                self.next = Some(succ);
                return Some(current);
            }
            succ[a] = self.rect.lo[a];
        }
        Some(current)
    }
}

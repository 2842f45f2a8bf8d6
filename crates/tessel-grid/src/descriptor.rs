//! Transfer descriptors: where sub-rectangles sit inside a strided buffer.
//!
//! A [`TransferDescriptor`] answers "which elements of a row-major buffer
//! over `bounds` make up these rectangles, and in what order?". It is
//! pure geometry: building one twice from the same arguments yields the
//! same descriptor, and both ends of a transfer build their own from
//! shared partition data instead of exchanging it.

use smallvec::SmallVec;
use tessel_core::{GeometryError, IntRect};

/// A contiguous span of elements in the bounding buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Run {
    /// First element, as a row-major index into the bounding box.
    pub start: usize,
    /// Number of consecutive elements.
    pub len: usize,
}

/// How to pack one or more disjoint rectangles of a buffer laid out
/// row-major over a bounding box.
///
/// Rectangles are packed in the order supplied, each in row-major
/// order. Trailing axes a rectangle spans completely are folded into
/// its runs, so a rectangle covering whole rows of the bounds packs as
/// a single run.
///
/// # Examples
///
/// ```
/// use tessel_core::IntRect;
/// use tessel_grid::TransferDescriptor;
///
/// let bounds = IntRect::from_corners(&[0, 0], &[10, 10]).unwrap();
/// let rect = IntRect::from_corners(&[2, 2], &[4, 4]).unwrap();
/// let d = TransferDescriptor::single(&rect, &bounds, 4).unwrap();
/// assert_eq!(d.element_count(), 4);
/// assert_eq!(d.byte_offsets(), &[88]);
/// assert_eq!(d.pack_size_bytes(), 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransferDescriptor {
    bounds: IntRect,
    element_size: usize,
    /// Rectangles in bounds-local coordinates (lower corner of `bounds`
    /// at the origin).
    rects: Vec<IntRect>,
    byte_offsets: Vec<usize>,
    runs: Vec<Run>,
    element_count: usize,
}

impl TransferDescriptor {
    /// Descriptor for a single rectangle.
    pub fn single(
        rect: &IntRect,
        bounds: &IntRect,
        element_size: usize,
    ) -> Result<Self, GeometryError> {
        Self::multi(std::slice::from_ref(rect), bounds, element_size)
    }

    /// Descriptor concatenating several disjoint rectangles in list
    /// order.
    ///
    /// Each rectangle's byte offset comes from its own position inside
    /// `bounds`, independent of the others. Fails if the list is empty,
    /// a rectangle is not inside `bounds`, any two rectangles overlap,
    /// or `element_size` is zero.
    pub fn multi(
        rects: &[IntRect],
        bounds: &IntRect,
        element_size: usize,
    ) -> Result<Self, GeometryError> {
        if element_size == 0 {
            return Err(GeometryError::ZeroElementSize);
        }
        if rects.is_empty() {
            return Err(GeometryError::EmptyRectList);
        }
        for rect in rects {
            if rect.ndim() != bounds.ndim() {
                return Err(GeometryError::DimensionMismatch {
                    expected: bounds.ndim(),
                    got: rect.ndim(),
                });
            }
            if !bounds.contains_rect(rect) {
                return Err(GeometryError::NotContained {
                    rect: rect.clone(),
                    bounds: bounds.clone(),
                });
            }
        }
        for (i, a) in rects.iter().enumerate() {
            if let Some(j) = rects[i + 1..].iter().position(|b| a.intersects(b)) {
                return Err(GeometryError::Overlap {
                    first: i,
                    second: i + 1 + j,
                });
            }
        }

        let strides = bounds.strides();
        let to_local: SmallVec<[i32; 4]> = bounds.lo().iter().map(|&l| -l).collect();
        let mut local_rects = Vec::with_capacity(rects.len());
        let mut byte_offsets = Vec::with_capacity(rects.len());
        let mut runs = Vec::new();
        let mut element_count = 0;
        for rect in rects {
            let local = rect.shift(&to_local);
            let corner: usize = local
                .lo()
                .iter()
                .zip(&strides)
                .map(|(&l, &s)| l as usize * s)
                .sum();
            byte_offsets.push(corner * element_size);
            push_runs(&local, bounds.size(), &strides, &mut runs);
            element_count += local.area();
            local_rects.push(local);
        }

        Ok(Self {
            bounds: bounds.clone(),
            element_size,
            rects: local_rects,
            byte_offsets,
            runs,
            element_count,
        })
    }

    /// The bounding box of the buffer this descriptor addresses.
    pub fn bounds(&self) -> &IntRect {
        &self.bounds
    }

    /// Bytes per element (per cell).
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// The rectangles, in pack order, relative to the bounds' lower
    /// corner.
    pub fn rects(&self) -> &[IntRect] {
        &self.rects
    }

    /// Byte offset of each rectangle's lower corner in the bounding
    /// buffer.
    pub fn byte_offsets(&self) -> &[usize] {
        &self.byte_offsets
    }

    /// Contiguous element runs in pack order.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Total number of elements addressed.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Exact size of the packed buffer.
    pub fn pack_size_bytes(&self) -> usize {
        self.element_count * self.element_size
    }
}

/// Append the runs of one bounds-local rectangle.
///
/// Axes after `fold` are spanned completely, so everything from axis
/// `fold` inward is one contiguous block per outer index.
fn push_runs(local: &IntRect, bounds_size: &[i32], strides: &[usize], runs: &mut Vec<Run>) {
    let ndim = local.ndim();
    let mut fold = ndim - 1;
    while fold > 0 && local.size()[fold] == bounds_size[fold] {
        fold -= 1;
    }
    let len = local.size()[fold] as usize * strides[fold];
    let inner: usize = (fold..ndim)
        .map(|a| local.lo()[a] as usize * strides[a])
        .sum();

    let outer_count: usize = local.size()[..fold].iter().map(|&s| s as usize).product();
    let mut outer: SmallVec<[i32; 4]> = SmallVec::from_elem(0, fold);
    for _ in 0..outer_count {
        let base: usize = (0..fold)
            .map(|a| (local.lo()[a] + outer[a]) as usize * strides[a])
            .sum();
        runs.push(Run {
            start: base + inner,
            len,
        });
        for a in (0..fold).rev() {
            outer[a] += 1;
            if outer[a] < local.size()[a] {
                break;
            }
            outer[a] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rect(lo: &[i32], hi: &[i32]) -> IntRect {
        IntRect::from_corners(lo, hi).unwrap()
    }

    #[test]
    fn single_rect_offsets_and_runs() {
        let bounds = rect(&[0, 0], &[10, 10]);
        let d = TransferDescriptor::single(&rect(&[2, 2], &[4, 4]), &bounds, 4).unwrap();
        assert_eq!(d.element_count(), 4);
        assert_eq!(d.byte_offsets(), &[88]);
        assert_eq!(
            d.runs(),
            &[Run { start: 22, len: 2 }, Run { start: 32, len: 2 }]
        );
        assert_eq!(d.rects()[0], rect(&[2, 2], &[4, 4]));
    }

    #[test]
    fn build_is_reproducible() {
        let bounds = rect(&[0, 0], &[10, 10]);
        let r = rect(&[2, 2], &[4, 4]);
        assert_eq!(
            TransferDescriptor::single(&r, &bounds, 4).unwrap(),
            TransferDescriptor::single(&r, &bounds, 4).unwrap()
        );
    }

    #[test]
    fn offsets_are_relative_to_bounds_corner() {
        let bounds = rect(&[-1, -1], &[5, 5]);
        let d = TransferDescriptor::single(&rect(&[0, 0], &[1, 1]), &bounds, 8).unwrap();
        assert_eq!(d.rects()[0], rect(&[1, 1], &[2, 2]));
        assert_eq!(d.byte_offsets(), &[(6 + 1) * 8]);
    }

    #[test]
    fn full_rows_fold_into_one_run() {
        let bounds = rect(&[0, 0, 0], &[4, 3, 5]);
        let d = TransferDescriptor::single(&rect(&[1, 0, 0], &[3, 3, 5]), &bounds, 1).unwrap();
        assert_eq!(d.runs(), &[Run { start: 15, len: 30 }]);
        let whole = TransferDescriptor::single(&bounds, &bounds, 1).unwrap();
        assert_eq!(whole.runs(), &[Run { start: 0, len: 60 }]);
    }

    #[test]
    fn multi_keeps_supply_order() {
        let bounds = rect(&[0, 0], &[4, 4]);
        let a = rect(&[3, 0], &[4, 4]);
        let b = rect(&[0, 0], &[1, 4]);
        let d = TransferDescriptor::multi(&[a, b], &bounds, 2).unwrap();
        assert_eq!(d.byte_offsets(), &[24, 0]);
        assert_eq!(d.runs()[0].start, 12);
        assert_eq!(d.pack_size_bytes(), 16);
    }

    #[test]
    fn geometry_errors() {
        let bounds = rect(&[0, 0], &[4, 4]);
        assert_eq!(
            TransferDescriptor::multi(&[], &bounds, 4),
            Err(GeometryError::EmptyRectList)
        );
        assert_eq!(
            TransferDescriptor::single(&bounds, &bounds, 0),
            Err(GeometryError::ZeroElementSize)
        );
        assert!(matches!(
            TransferDescriptor::single(&rect(&[3, 3], &[5, 5]), &bounds, 4),
            Err(GeometryError::NotContained { .. })
        ));
        assert_eq!(
            TransferDescriptor::multi(
                &[rect(&[0, 0], &[2, 2]), rect(&[3, 3], &[4, 4]), rect(&[1, 1], &[3, 3])],
                &bounds,
                4
            ),
            Err(GeometryError::Overlap { first: 0, second: 2 })
        );
        assert!(matches!(
            TransferDescriptor::single(&rect(&[0], &[1]), &bounds, 4),
            Err(GeometryError::DimensionMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn runs_cover_exactly_the_rect_cells(
            x in 0i32..6, y in 0i32..6, z in 0i32..3,
            w in 1i32..6, h in 1i32..6, d in 1i32..4,
        ) {
            let bounds = rect(&[0, 0, 0], &[6, 6, 3]);
            let r = IntRect::new(&[x, y, z], &[w, h, d]).unwrap();
            prop_assume!(bounds.contains_rect(&r));
            let desc = TransferDescriptor::single(&r, &bounds, 1).unwrap();
            let from_runs: Vec<usize> = desc
                .runs()
                .iter()
                .flat_map(|run| run.start..run.start + run.len)
                .collect();
            let from_cells: Vec<usize> = r
                .iter_points()
                .map(|p| bounds.flat_index(&p).unwrap())
                .collect();
            prop_assert_eq!(from_runs, from_cells);
        }
    }
}

//! Reusable per-axis coordinate output for neighbour queries.

use smallvec::SmallVec;
use tessel_core::Coord;

/// Coordinates produced by a neighbour query, stored column-wise.
///
/// Column `a` holds the axis-`a` component of every result, so
/// `axis(0)[i], axis(1)[i], ...` is the `i`-th point. A query clears and
/// repopulates the buffer; keeping one buffer per agent loop avoids
/// allocating on every call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighbourBuffer {
    columns: SmallVec<[Vec<i32>; 4]>,
    len: usize,
}

impl NeighbourBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the buffer and shape it for `ndim`-axis points, keeping the
    /// column allocations.
    pub fn reset(&mut self, ndim: usize) {
        self.columns.truncate(ndim);
        while self.columns.len() < ndim {
            self.columns.push(Vec::new());
        }
        for column in &mut self.columns {
            column.clear();
        }
        self.len = 0;
    }

    /// Append one point.
    ///
    /// # Panics
    ///
    /// Panics if `point` does not match the buffer's dimensionality.
    pub fn push(&mut self, point: &[i32]) {
        assert_eq!(point.len(), self.columns.len(), "point dimensionality");
        for (column, &v) in self.columns.iter_mut().zip(point) {
            column.push(v);
        }
        self.len += 1;
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no points.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.columns.len()
    }

    /// The axis-`axis` component of every point.
    pub fn axis(&self, axis: usize) -> &[i32] {
        &self.columns[axis]
    }

    /// The `i`-th point.
    pub fn get(&self, i: usize) -> Option<Coord> {
        (i < self.len).then(|| self.columns.iter().map(|c| c[i]).collect())
    }

    /// Iterate over the points in result order.
    pub fn iter(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.len).map(move |i| self.columns.iter().map(|c| c[i]).collect())
    }

    /// Whether `point` is among the results (linear scan).
    pub fn contains(&self, point: &[i32]) -> bool {
        point.len() == self.ndim()
            && (0..self.len).any(|i| self.columns.iter().zip(point).all(|(c, &v)| c[i] == v))
    }

    /// Collect the points into owned coordinates.
    pub fn to_vec(&self) -> Vec<Coord> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_shape_and_clears() {
        let mut buf = NeighbourBuffer::new();
        buf.reset(2);
        buf.push(&[1, 2]);
        buf.push(&[3, 4]);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.axis(1), &[2, 4]);
        assert!(buf.contains(&[3, 4]));
        assert!(!buf.contains(&[4, 3]));

        buf.reset(3);
        assert!(buf.is_empty());
        assert_eq!(buf.ndim(), 3);
        buf.push(&[0, 0, 1]);
        assert_eq!(buf.get(0).unwrap().as_slice(), &[0, 0, 1]);
        assert_eq!(buf.get(1), None);
    }
}

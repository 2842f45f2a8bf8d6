//! Dense row-major storage over a rectangle.

use std::fmt;

use tessel_core::{Coord, IntRect};

use crate::descriptor::TransferDescriptor;
use crate::element::Element;
use crate::error::StorageError;

/// A flat buffer holding `components` values of `T` for every cell of a
/// rectangular region.
///
/// Cells are laid out row-major (last axis fastest) and a cell's
/// components are adjacent. The buffer length is always
/// `region.area() * components`. Storage is never resized in place;
/// [`resize`](Self::resize) returns a fresh buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct GridStorage<T> {
    region: IntRect,
    components: usize,
    data: Vec<T>,
}

impl<T: Element> GridStorage<T> {
    /// Default-initialized storage, one component per cell.
    pub fn allocate(region: IntRect) -> Self {
        Self::filled(region, T::default())
    }

    /// Storage with every cell set to `value`.
    pub fn filled(region: IntRect, value: T) -> Self {
        let data = vec![value; region.area()];
        Self {
            region,
            components: 1,
            data,
        }
    }

    /// Default-initialized storage with `components` values per cell.
    pub fn allocate_with_components(
        region: IntRect,
        components: usize,
    ) -> Result<Self, StorageError> {
        if components == 0 {
            return Err(StorageError::ZeroComponents);
        }
        let data = vec![T::default(); region.area() * components];
        Ok(Self {
            region,
            components,
            data,
        })
    }

    /// The rectangle this storage covers.
    pub fn region(&self) -> &IntRect {
        &self.region
    }

    /// Values per cell.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Encoded bytes per cell: the element size transfer descriptors for
    /// this storage must use.
    pub fn cell_bytes(&self) -> usize {
        self.components * T::BYTES
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.region.area()
    }

    /// Flat cell index of `coord`.
    pub fn index_of(&self, coord: &[i32]) -> Result<usize, StorageError> {
        self.region
            .flat_index(coord)
            .ok_or_else(|| StorageError::OutOfBounds {
                coord: Coord::from_slice(coord),
                region: self.region.clone(),
            })
    }

    /// First component of the cell at `coord`.
    pub fn get(&self, coord: &[i32]) -> Result<T, StorageError> {
        let i = self.index_of(coord)?;
        Ok(self.data[i * self.components])
    }

    /// Overwrite the first component of the cell at `coord`.
    pub fn set(&mut self, coord: &[i32], value: T) -> Result<(), StorageError> {
        let i = self.index_of(coord)?;
        self.data[i * self.components] = value;
        Ok(())
    }

    /// Every component of the cell at `coord`.
    pub fn cell(&self, coord: &[i32]) -> Result<&[T], StorageError> {
        let i = self.index_of(coord)? * self.components;
        Ok(&self.data[i..i + self.components])
    }

    /// Mutable view of the cell at `coord`.
    pub fn cell_mut(&mut self, coord: &[i32]) -> Result<&mut [T], StorageError> {
        let i = self.index_of(coord)? * self.components;
        Ok(&mut self.data[i..i + self.components])
    }

    /// Overwrite every component of the cell at `coord`.
    pub fn set_cell(&mut self, coord: &[i32], values: &[T]) -> Result<(), StorageError> {
        if values.len() != self.components {
            return Err(StorageError::ComponentMismatch {
                expected: self.components,
                got: values.len(),
            });
        }
        self.cell_mut(coord)?.copy_from_slice(values);
        Ok(())
    }

    /// The raw buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The raw buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Set every value to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Descriptor for `rects` over this storage's region and cell size.
    pub fn descriptor(&self, rects: &[IntRect]) -> Result<TransferDescriptor, StorageError> {
        Ok(TransferDescriptor::multi(
            rects,
            &self.region,
            self.cell_bytes(),
        )?)
    }

    /// Serialize the cells `descriptor` addresses, in descriptor order.
    pub fn pack(&self, descriptor: &TransferDescriptor) -> Result<Vec<u8>, StorageError> {
        let mut out = Vec::with_capacity(descriptor.pack_size_bytes());
        self.pack_into(descriptor, &mut out)?;
        Ok(out)
    }

    /// Append the packed cells to `out`.
    pub fn pack_into(
        &self,
        descriptor: &TransferDescriptor,
        out: &mut Vec<u8>,
    ) -> Result<(), StorageError> {
        self.check_descriptor(descriptor)?;
        out.reserve(descriptor.pack_size_bytes());
        for run in descriptor.runs() {
            let span = run.start * self.components..(run.start + run.len) * self.components;
            for &v in &self.data[span] {
                v.write_le(out);
            }
        }
        Ok(())
    }

    /// Overwrite exactly the cells `descriptor` addresses from a packed
    /// buffer. Inverse of [`pack`](Self::pack).
    pub fn unpack(
        &mut self,
        descriptor: &TransferDescriptor,
        buffer: &[u8],
    ) -> Result<(), StorageError> {
        self.check_descriptor(descriptor)?;
        if buffer.len() != descriptor.pack_size_bytes() {
            return Err(StorageError::BufferSize {
                expected: descriptor.pack_size_bytes(),
                got: buffer.len(),
            });
        }
        let mut chunks = buffer.chunks_exact(T::BYTES);
        for run in descriptor.runs() {
            let span = run.start * self.components..(run.start + run.len) * self.components;
            for (slot, bytes) in self.data[span].iter_mut().zip(&mut chunks) {
                *slot = T::read_le(bytes);
            }
        }
        Ok(())
    }

    /// Fresh default-initialized storage over `region` with the same
    /// cell layout. Nothing is copied.
    pub fn resize(&self, region: IntRect) -> Self {
        let data = vec![T::default(); region.area() * self.components];
        Self {
            region,
            components: self.components,
            data,
        }
    }

    /// Copy the cells of `rect` that both storages cover from `other`.
    ///
    /// Returns the number of cells copied.
    pub fn copy_region_from(
        &mut self,
        other: &GridStorage<T>,
        rect: &IntRect,
    ) -> Result<usize, StorageError> {
        if other.components != self.components {
            return Err(StorageError::ComponentMismatch {
                expected: self.components,
                got: other.components,
            });
        }
        let Some(shared) = rect
            .intersect(&self.region)
            .and_then(|r| r.intersect(&other.region))
        else {
            return Ok(0);
        };
        for point in shared.iter_points() {
            let src = other.index_of(&point)? * self.components;
            let dst = self.index_of(&point)? * self.components;
            self.data[dst..dst + self.components]
                .copy_from_slice(&other.data[src..src + self.components]);
        }
        Ok(shared.area())
    }

    /// Copy the cells of `src` onto the same-shaped rectangle `dst`
    /// within this storage.
    pub fn copy_rect(&mut self, src: &IntRect, dst: &IntRect) -> Result<(), StorageError> {
        if src.size() != dst.size() {
            return Err(StorageError::DescriptorMismatch {
                reason: format!("copy from {src} to differently shaped {dst}"),
            });
        }
        let from = self.descriptor(std::slice::from_ref(src))?;
        let to = self.descriptor(std::slice::from_ref(dst))?;
        let bytes = self.pack(&from)?;
        self.unpack(&to, &bytes)
    }

    fn check_descriptor(&self, descriptor: &TransferDescriptor) -> Result<(), StorageError> {
        if descriptor.bounds() != &self.region {
            return Err(StorageError::DescriptorMismatch {
                reason: format!(
                    "descriptor bounds {} differ from storage region {}",
                    descriptor.bounds(),
                    self.region
                ),
            });
        }
        if descriptor.element_size() != self.cell_bytes() {
            return Err(StorageError::DescriptorMismatch {
                reason: format!(
                    "descriptor element size {} differs from cell size {}",
                    descriptor.element_size(),
                    self.cell_bytes()
                ),
            });
        }
        Ok(())
    }
}

/// Two-dimensional storage prints one line per axis-0 index with the
/// first component of each cell; other shapes print the flat buffer.
impl<T: Element + fmt::Display> fmt::Display for GridStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.region)?;
        if self.region.ndim() != 2 {
            for (i, v) in self.data.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{v}")?;
            }
            return writeln!(f);
        }
        let row = self.region.size()[1] as usize * self.components;
        for line in self.data.chunks(row) {
            let mut first = true;
            for v in line.iter().step_by(self.components) {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{v}")?;
                first = false;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rect(lo: &[i32], hi: &[i32]) -> IntRect {
        IntRect::from_corners(lo, hi).unwrap()
    }

    fn numbered(region: IntRect) -> GridStorage<f64> {
        let mut g = GridStorage::allocate(region);
        for (i, v) in g.as_mut_slice().iter_mut().enumerate() {
            *v = i as f64;
        }
        g
    }

    #[test]
    fn get_set_and_bounds() {
        let mut g = GridStorage::<i32>::allocate(rect(&[-1, -1], &[3, 3]));
        g.set(&[-1, 2], 7).unwrap();
        assert_eq!(g.get(&[-1, 2]).unwrap(), 7);
        assert_eq!(g.as_slice()[3], 7);
        assert!(matches!(
            g.get(&[3, 0]),
            Err(StorageError::OutOfBounds { .. })
        ));
        assert!(g.set(&[0, -2], 1).is_err());
    }

    #[test]
    fn multi_component_cells() {
        let mut g = GridStorage::<f64>::allocate_with_components(rect(&[0], &[3]), 2).unwrap();
        g.set_cell(&[1], &[1.0, 2.0]).unwrap();
        assert_eq!(g.cell(&[1]).unwrap(), &[1.0, 2.0]);
        assert_eq!(g.get(&[1]).unwrap(), 1.0);
        assert_eq!(g.cell_bytes(), 16);
        assert_eq!(
            g.set_cell(&[0], &[1.0]),
            Err(StorageError::ComponentMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            GridStorage::<f64>::allocate_with_components(rect(&[0], &[3]), 0),
            Err(StorageError::ZeroComponents)
        );
    }

    #[test]
    fn pack_orders_by_descriptor() {
        let g = numbered(rect(&[0, 0], &[4, 4]));
        let d = g
            .descriptor(&[rect(&[3, 2], &[4, 4]), rect(&[0, 0], &[1, 1])])
            .unwrap();
        let bytes = g.pack(&d).unwrap();
        let values: Vec<f64> = bytes.chunks(8).map(f64::read_le).collect();
        assert_eq!(values, vec![14.0, 15.0, 0.0]);
    }

    #[test]
    fn unpack_writes_only_addressed_cells() {
        let src = numbered(rect(&[0, 0], &[4, 4]));
        let mut dst = GridStorage::filled(rect(&[0, 0], &[4, 4]), -1.0);
        let d = src.descriptor(&[rect(&[1, 1], &[3, 3])]).unwrap();
        dst.unpack(&d, &src.pack(&d).unwrap()).unwrap();
        assert_eq!(dst.get(&[1, 1]).unwrap(), 5.0);
        assert_eq!(dst.get(&[2, 2]).unwrap(), 10.0);
        assert_eq!(dst.get(&[0, 0]).unwrap(), -1.0);
        assert_eq!(dst.get(&[3, 3]).unwrap(), -1.0);
    }

    #[test]
    fn mismatched_descriptor_and_buffer_rejected() {
        let mut g = GridStorage::<f32>::allocate(rect(&[0, 0], &[4, 4]));
        let other_bounds =
            TransferDescriptor::single(&rect(&[0, 0], &[1, 1]), &rect(&[0, 0], &[5, 5]), 4)
                .unwrap();
        assert!(matches!(
            g.pack(&other_bounds),
            Err(StorageError::DescriptorMismatch { .. })
        ));
        let wrong_size =
            TransferDescriptor::single(&rect(&[0, 0], &[1, 1]), &rect(&[0, 0], &[4, 4]), 8)
                .unwrap();
        assert!(g.pack(&wrong_size).is_err());
        let d = g.descriptor(&[rect(&[0, 0], &[2, 2])]).unwrap();
        assert_eq!(
            g.unpack(&d, &[0u8; 4]),
            Err(StorageError::BufferSize {
                expected: 16,
                got: 4
            })
        );
    }

    #[test]
    fn resize_is_fresh() {
        let g = numbered(rect(&[0, 0], &[2, 2]));
        let r = g.resize(rect(&[0, 0], &[3, 3]));
        assert_eq!(r.cell_count(), 9);
        assert!(r.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn copy_region_and_rect() {
        let src = numbered(rect(&[0, 0], &[4, 4]));
        let mut dst = GridStorage::<f64>::allocate(rect(&[2, 2], &[6, 6]));
        let n = dst.copy_region_from(&src, &rect(&[0, 0], &[10, 10])).unwrap();
        assert_eq!(n, 4);
        assert_eq!(dst.get(&[3, 3]).unwrap(), 15.0);

        let mut g = numbered(rect(&[0, 0], &[4, 4]));
        g.copy_rect(&rect(&[0, 0], &[1, 4]), &rect(&[3, 0], &[4, 4])).unwrap();
        assert_eq!(g.get(&[3, 2]).unwrap(), 2.0);
    }

    #[test]
    fn display_prints_rows() {
        let mut g = GridStorage::<i32>::allocate(rect(&[0, 0], &[2, 3]));
        g.set(&[1, 2], 5).unwrap();
        assert_eq!(g.to_string(), "[0, 0]..[2, 3]\n0 0 0\n0 0 5\n");
    }

    proptest! {
        #[test]
        fn unpack_of_pack_leaves_storage_unchanged(
            seed in any::<u64>(),
            ax in 0i32..3, ay in 0i32..6, bx in 3i32..6, by in 0i32..6,
        ) {
            let region = rect(&[0, 0], &[6, 6]);
            let mut g = GridStorage::<u64>::allocate(region);
            for (i, v) in g.as_mut_slice().iter_mut().enumerate() {
                *v = seed.wrapping_mul(i as u64 + 1);
            }
            let before = g.clone();
            let a = rect(&[ax, ay], &[ax + 1, 6]);
            let b = rect(&[bx, by], &[6, by + 1]);
            let d = g.descriptor(&[a, b]).unwrap();
            let packed = g.pack(&d).unwrap();
            prop_assert_eq!(packed.len(), d.pack_size_bytes());
            g.unpack(&d, &packed).unwrap();
            prop_assert_eq!(g, before);
        }
    }
}

//! Field storage variants.
//!
//! A field holds one of a closed set of cell kinds, chosen when the
//! field is created. [`FieldStorage`] dispatches the storage capability
//! (region, pack, unpack, resize, copy) to the concrete grid so the halo
//! exchange and the scheduler never care which kind they are moving.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tessel_core::IntRect;

use crate::descriptor::TransferDescriptor;
use crate::error::StorageError;
use crate::grid::GridStorage;

/// The kind of value every cell of a field holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// One `f64` per cell (temperature, concentration).
    Scalar,
    /// One `i32` per cell (counts, occupancy, labels).
    Integer,
    /// One `f64` amount per named resource per cell.
    Composite {
        /// Resource names, in storage order.
        resources: Vec<String>,
    },
}

impl FieldKind {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Integer => "integer",
            Self::Composite { .. } => "composite",
        }
    }
}

/// Struct-of-resources cells: a fixed, named set of `f64` amounts per
/// cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeStorage {
    resources: IndexSet<String>,
    grid: GridStorage<f64>,
}

impl CompositeStorage {
    /// Zeroed storage over `region` with one amount per resource. Resource
    /// names must be distinct.
    pub fn allocate(region: IntRect, resources: &[String]) -> Result<Self, StorageError> {
        let mut names = IndexSet::with_capacity(resources.len());
        for name in resources {
            if !names.insert(name.clone()) {
                return Err(StorageError::DuplicateResource { name: name.clone() });
            }
        }
        let resources = names;
        let grid = GridStorage::allocate_with_components(region, resources.len())?;
        Ok(Self { resources, grid })
    }

    /// Resource names in storage order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(String::as_str)
    }

    /// Component index of `name`.
    pub fn resource_index(&self, name: &str) -> Result<usize, StorageError> {
        self.resources
            .get_index_of(name)
            .ok_or_else(|| StorageError::UnknownResource {
                name: name.to_string(),
            })
    }

    /// Amount of `name` at `coord`.
    pub fn amount(&self, coord: &[i32], name: &str) -> Result<f64, StorageError> {
        let k = self.resource_index(name)?;
        Ok(self.grid.cell(coord)?[k])
    }

    /// Set the amount of `name` at `coord`.
    pub fn set_amount(&mut self, coord: &[i32], name: &str, value: f64) -> Result<(), StorageError> {
        let k = self.resource_index(name)?;
        self.grid.cell_mut(coord)?[k] = value;
        Ok(())
    }

    /// The underlying multi-component grid.
    pub fn grid(&self) -> &GridStorage<f64> {
        &self.grid
    }

    /// The underlying grid, mutably.
    pub fn grid_mut(&mut self) -> &mut GridStorage<f64> {
        &mut self.grid
    }
}

/// Storage for one field, of one of the supported cell kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldStorage {
    /// `f64` per cell.
    Scalar(GridStorage<f64>),
    /// `i32` per cell.
    Integer(GridStorage<i32>),
    /// Named `f64` amounts per cell.
    Composite(CompositeStorage),
}

/// Dispatch an expression over the grid inside every variant.
macro_rules! with_grid {
    ($storage:expr, $g:ident => $body:expr) => {
        match $storage {
            FieldStorage::Scalar($g) => $body,
            FieldStorage::Integer($g) => $body,
            FieldStorage::Composite(c) => {
                let $g = &c.grid;
                $body
            }
        }
    };
}

macro_rules! with_grid_mut {
    ($storage:expr, $g:ident => $body:expr) => {
        match $storage {
            FieldStorage::Scalar($g) => $body,
            FieldStorage::Integer($g) => $body,
            FieldStorage::Composite(c) => {
                let $g = &mut c.grid;
                $body
            }
        }
    };
}

impl FieldStorage {
    /// Zeroed storage of `kind` over `region`.
    pub fn allocate(kind: &FieldKind, region: IntRect) -> Result<Self, StorageError> {
        Ok(match kind {
            FieldKind::Scalar => Self::Scalar(GridStorage::allocate(region)),
            FieldKind::Integer => Self::Integer(GridStorage::allocate(region)),
            FieldKind::Composite { resources } => {
                Self::Composite(CompositeStorage::allocate(region, resources)?)
            }
        })
    }

    /// The kind this storage was created with.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Scalar(_) => FieldKind::Scalar,
            Self::Integer(_) => FieldKind::Integer,
            Self::Composite(c) => FieldKind::Composite {
                resources: c.resources().map(str::to_string).collect(),
            },
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Integer(_) => "integer",
            Self::Composite(_) => "composite",
        }
    }

    /// The rectangle this storage covers.
    pub fn region(&self) -> &IntRect {
        with_grid!(self, g => g.region())
    }

    /// Encoded bytes per cell.
    pub fn cell_bytes(&self) -> usize {
        with_grid!(self, g => g.cell_bytes())
    }

    /// Descriptor for `rects` over this storage.
    pub fn descriptor(&self, rects: &[IntRect]) -> Result<TransferDescriptor, StorageError> {
        with_grid!(self, g => g.descriptor(rects))
    }

    /// Serialize the addressed cells.
    pub fn pack(&self, descriptor: &TransferDescriptor) -> Result<Vec<u8>, StorageError> {
        with_grid!(self, g => g.pack(descriptor))
    }

    /// Append the addressed cells to `out`.
    pub fn pack_into(
        &self,
        descriptor: &TransferDescriptor,
        out: &mut Vec<u8>,
    ) -> Result<(), StorageError> {
        with_grid!(self, g => g.pack_into(descriptor, out))
    }

    /// Overwrite the addressed cells from a packed buffer.
    pub fn unpack(
        &mut self,
        descriptor: &TransferDescriptor,
        buffer: &[u8],
    ) -> Result<(), StorageError> {
        with_grid_mut!(self, g => g.unpack(descriptor, buffer))
    }

    /// Fresh zeroed storage of the same kind over `region`.
    pub fn resize(&self, region: IntRect) -> Self {
        match self {
            Self::Scalar(g) => Self::Scalar(g.resize(region)),
            Self::Integer(g) => Self::Integer(g.resize(region)),
            Self::Composite(c) => Self::Composite(CompositeStorage {
                resources: c.resources.clone(),
                grid: c.grid.resize(region),
            }),
        }
    }

    /// Copy the cells of `rect` both storages cover from `other`, which
    /// must be of the same kind.
    pub fn copy_region_from(
        &mut self,
        other: &FieldStorage,
        rect: &IntRect,
    ) -> Result<usize, StorageError> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a.copy_region_from(b, rect),
            (Self::Integer(a), Self::Integer(b)) => a.copy_region_from(b, rect),
            (Self::Composite(a), Self::Composite(b)) => a.grid.copy_region_from(&b.grid, rect),
            (a, b) => Err(StorageError::KindMismatch {
                expected: a.kind_name(),
                got: b.kind_name(),
            }),
        }
    }

    /// Copy `src` onto the same-shaped `dst` within this storage.
    pub fn copy_rect(&mut self, src: &IntRect, dst: &IntRect) -> Result<(), StorageError> {
        with_grid_mut!(self, g => g.copy_rect(src, dst))
    }

    /// Numeric value of `component` at `coord`, whatever the kind.
    pub fn value_at(&self, coord: &[i32], component: usize) -> Result<f64, StorageError> {
        match self {
            Self::Scalar(g) => component_of(g.cell(coord)?, component).copied(),
            Self::Integer(g) => component_of(g.cell(coord)?, component).map(|&v| f64::from(v)),
            Self::Composite(c) => component_of(c.grid.cell(coord)?, component).copied(),
        }
    }

    /// Scalar view, if this is a scalar field.
    pub fn as_scalar(&self) -> Option<&GridStorage<f64>> {
        match self {
            Self::Scalar(g) => Some(g),
            _ => None,
        }
    }

    /// Mutable scalar view.
    pub fn as_scalar_mut(&mut self) -> Option<&mut GridStorage<f64>> {
        match self {
            Self::Scalar(g) => Some(g),
            _ => None,
        }
    }

    /// Integer view, if this is an integer field.
    pub fn as_integer(&self) -> Option<&GridStorage<i32>> {
        match self {
            Self::Integer(g) => Some(g),
            _ => None,
        }
    }

    /// Mutable integer view.
    pub fn as_integer_mut(&mut self) -> Option<&mut GridStorage<i32>> {
        match self {
            Self::Integer(g) => Some(g),
            _ => None,
        }
    }

    /// Composite view, if this is a composite field.
    pub fn as_composite(&self) -> Option<&CompositeStorage> {
        match self {
            Self::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable composite view.
    pub fn as_composite_mut(&mut self) -> Option<&mut CompositeStorage> {
        match self {
            Self::Composite(c) => Some(c),
            _ => None,
        }
    }
}

fn component_of<T>(cell: &[T], component: usize) -> Result<&T, StorageError> {
    cell.get(component).ok_or(StorageError::ComponentMismatch {
        expected: cell.len(),
        got: component + 1,
    })
}

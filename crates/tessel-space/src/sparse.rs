//! Sparse object storage keyed by integer location.

use crate::boundary::{BoundaryMode, Metric};
use crate::buffer::NeighbourBuffer;
use crate::error::SpaceError;
use crate::query::NeighbourQuery;
use indexmap::IndexMap;
use std::hash::Hash;
use tessel_core::Coord;

/// Objects placed at integer locations, several per location.
///
/// Each object has at most one location. Iteration and per-cell object
/// order follow insertion order, so two processes that apply the same
/// placements see the same results.
#[derive(Clone, Debug)]
pub struct SparseGrid<T> {
    cells: IndexMap<Coord, Vec<T>>,
    locations: IndexMap<T, Coord>,
}

impl<T> Default for SparseGrid<T> {
    fn default() -> Self {
        Self {
            cells: IndexMap::new(),
            locations: IndexMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> SparseGrid<T> {
    /// An empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `object` at `at`, moving it if it was already placed.
    ///
    /// Returns the previous location, if any.
    pub fn set_location(&mut self, object: T, at: &[i32]) -> Option<Coord> {
        let previous = self.detach(&object);
        self.cells
            .entry(Coord::from_slice(at))
            .or_default()
            .push(object.clone());
        self.locations.insert(object, Coord::from_slice(at));
        previous
    }

    /// Where `object` is, if placed.
    pub fn location_of(&self, object: &T) -> Option<&[i32]> {
        self.locations.get(object).map(|c| c.as_slice())
    }

    /// Remove `object`, returning its last location.
    pub fn remove(&mut self, object: &T) -> Option<Coord> {
        self.detach(object)
    }

    /// Objects at `at`, in placement order.
    pub fn objects_at(&self, at: &[i32]) -> &[T] {
        self.cells.get(at).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of objects at `at`.
    pub fn count_at(&self, at: &[i32]) -> usize {
        self.objects_at(at).len()
    }

    /// Remove and return every object at `at`.
    pub fn remove_objects_at(&mut self, at: &[i32]) -> Vec<T> {
        let removed = self.cells.shift_remove(at).unwrap_or_default();
        for object in &removed {
            self.locations.shift_remove(object);
        }
        removed
    }

    /// Whether `object` is placed.
    pub fn contains(&self, object: &T) -> bool {
        self.locations.contains_key(object)
    }

    /// Total number of placed objects.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether no objects are placed.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Iterate over `(object, location)` in placement order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &[i32])> {
        self.locations.iter().map(|(o, c)| (o, c.as_slice()))
    }

    /// Collect the objects found at every location in `locations` into
    /// `out` (cleared first). A location listed twice contributes its
    /// objects twice.
    pub fn objects_at_locations(&self, locations: &NeighbourBuffer, out: &mut Vec<T>) {
        out.clear();
        for point in locations.iter() {
            out.extend_from_slice(self.objects_at(&point));
        }
    }

    /// Like [`objects_at_locations`](Self::objects_at_locations), but
    /// also records, for every returned object, the location it was found
    /// at: `positions` ends up parallel to `objects`.
    pub fn objects_and_positions_at(
        &self,
        locations: &NeighbourBuffer,
        objects: &mut Vec<T>,
        positions: &mut NeighbourBuffer,
    ) {
        objects.clear();
        positions.reset(locations.ndim());
        for point in locations.iter() {
            for object in self.objects_at(&point) {
                objects.push(object.clone());
                positions.push(&point);
            }
        }
    }

    /// Objects within Chebyshev `distance` of `center`.
    ///
    /// `cells` receives the visited locations and `out` the objects.
    #[allow(clippy::too_many_arguments)]
    pub fn neighbours_max_distance(
        &self,
        query: &mut NeighbourQuery,
        center: &[i32],
        distance: i32,
        mode: BoundaryMode,
        include_origin: bool,
        cells: &mut NeighbourBuffer,
        out: &mut Vec<T>,
    ) -> Result<(), SpaceError> {
        query.neighbours(center, distance, Metric::Chebyshev, mode, include_origin, cells)?;
        self.objects_at_locations(cells, out);
        Ok(())
    }

    /// Objects within Manhattan `distance` of `center`.
    #[allow(clippy::too_many_arguments)]
    pub fn neighbours_manhattan_distance(
        &self,
        query: &mut NeighbourQuery,
        center: &[i32],
        distance: i32,
        mode: BoundaryMode,
        include_origin: bool,
        cells: &mut NeighbourBuffer,
        out: &mut Vec<T>,
    ) -> Result<(), SpaceError> {
        query.neighbours(center, distance, Metric::Manhattan, mode, include_origin, cells)?;
        self.objects_at_locations(cells, out);
        Ok(())
    }

    fn detach(&mut self, object: &T) -> Option<Coord> {
        let at = self.locations.shift_remove(object)?;
        if let Some(bucket) = self.cells.get_mut(&at) {
            if let Some(pos) = bucket.iter().position(|o| o == object) {
                bucket.remove(pos);
            }
            if bucket.is_empty() {
                self.cells.shift_remove(&at);
            }
        }
        Some(at)
    }
}

use log::debug;
use ndarray::ArrayView2;

use crate::{Error, Real, Vector};
use crate::geometry::{PeriodicBox, UnitCell, Shifts};

/// Data associated with a particle (or one of its periodic images) inside
/// the `CellList`
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry<T, const N: usize> {
    /// index of the particle in the original set of coordinates
    pub index: usize,
    /// number of lattice vectors separating this image from the wrapped
    /// particle, all zeros for the particle itself
    pub shift: [i32; N],
    /// position of this image
    pub position: Vector<T, N>,
}

/// Particles of a single set of coordinates, sorted by cells
#[derive(Debug, Clone)]
pub(crate) struct CellStorage<T, const N: usize> {
    /// positions of the particles wrapped inside the unit cell, indexed by
    /// the original particle index
    pub wrapped: Vec<Vector<T, N>>,
    /// entries sorted by cell, `entries[starts[c]..starts[c + 1]]` are the
    /// entries in the cell with linear index `c` in the padded grid
    pub entries: Vec<Entry<T, N>>,
    pub starts: Vec<usize>,
    /// linear index of all non-empty cells in the real (not padding) part
    /// of the grid
    pub occupied: Vec<usize>,
    /// number of periodic images stored in the padding cells
    pub n_ghosts: usize,
}

impl<T: Real, const N: usize> CellStorage<T, N> {
    fn new() -> CellStorage<T, N> {
        CellStorage {
            wrapped: Vec::new(),
            entries: Vec::new(),
            starts: Vec::new(),
            occupied: Vec::new(),
            n_ghosts: 0,
        }
    }

    /// Get the entries in the cell with the given linear index
    #[inline]
    pub fn cell(&self, linear: usize) -> &[Entry<T, N>] {
        &self.entries[self.starts[linear]..self.starts[linear + 1]]
    }

    /// Sort `positions` in the cells of `periodic_box`. If `with_ghosts` is
    /// true, periodic images of the particles are also added to all padding
    /// cells in reach of the search stencil.
    ///
    /// The positions must already have been checked with `check_positions`.
    fn fill(&mut self, positions: &[Vector<T, N>], periodic_box: &PeriodicBox<T, N>, with_ghosts: bool) {
        let n_cells = periodic_box.n_cells();
        let n_search = periodic_box.n_search();
        let padded = periodic_box.padded_shape();
        let total_padded = padded.iter().product::<usize>();

        self.wrapped.clear();
        self.entries.clear();
        self.occupied.clear();
        self.starts.clear();
        self.starts.resize(total_padded + 1, 0);

        // first pass: find the cell of each particle and count how many
        // entries (including periodic images) each cell will contain
        let mut cells = Vec::with_capacity(positions.len());
        for &position in positions {
            let (wrapped, cell) = periodic_box.cell_index_of(position);
            self.wrapped.push(wrapped);
            cells.push(cell);

            for_each_image(cell, n_cells, n_search, with_ghosts, |_, padded_cell| {
                self.starts[periodic_box.linear_index(padded_cell) + 1] += 1;
            });
        }

        for linear in 0..total_padded {
            self.starts[linear + 1] += self.starts[linear];
        }

        // second pass: store the entries in their cells
        let n_entries = self.starts[total_padded];
        let placeholder = Entry { index: 0, shift: [0; N], position: Vector::zero() };
        self.entries.resize(n_entries, placeholder);

        let mut cursors = self.starts.clone();
        let unit_cell = periodic_box.unit_cell();
        for (index, &cell) in cells.iter().enumerate() {
            let wrapped = self.wrapped[index];
            for_each_image(cell, n_cells, n_search, with_ghosts, |shift, padded_cell| {
                let linear = periodic_box.linear_index(padded_cell);
                self.entries[cursors[linear]] = Entry {
                    index: index,
                    shift: shift,
                    position: image_position(unit_cell, wrapped, shift),
                };
                cursors[linear] += 1;
            });
        }

        let mut real_cells_min = [0; N];
        let mut real_cells_max = [0; N];
        for axis in 0..N {
            real_cells_min[axis] = n_search[axis] as i32;
            real_cells_max[axis] = (n_search[axis] + n_cells[axis]) as i32 - 1;
        }

        for real_cell in Shifts::new(real_cells_min, real_cells_max) {
            let linear = periodic_box.linear_index(real_cell.map(|i| i as usize));
            if self.starts[linear + 1] > self.starts[linear] {
                self.occupied.push(linear);
            }
        }

        self.n_ghosts = n_entries - positions.len();
    }
}

/// Convert `positions` to vectors, checking that there is at least one
/// particle and that all coordinates are finite
fn check_positions<T: Real, const N: usize>(positions: &[[T; N]], name: &str) -> Result<Vec<Vector<T, N>>, Error> {
    if positions.is_empty() {
        return Err(Error::EmptyInput(format!("{} does not contain any particle", name)));
    }

    let mut vectors = Vec::with_capacity(positions.len());
    for (index, &position) in positions.iter().enumerate() {
        let position = Vector::new(position);
        if !position.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "position of particle {} in {} is not finite: {:?}", index, name, position.0
            )));
        }
        vectors.push(position);
    }

    return Ok(vectors);
}

fn image_position<T: Real, const N: usize>(unit_cell: &UnitCell<T, N>, wrapped: Vector<T, N>, shift: [i32; N]) -> Vector<T, N> {
    if shift.iter().all(|&s| s == 0) {
        wrapped
    } else {
        wrapped + unit_cell.translation(shift)
    }
}

/// Call `function(shift, padded_cell)` for the particle in the real cell
/// `cell` (with a zero shift), and if `with_ghosts` is true, for all its
/// periodic images falling in the padding cells around the grid.
#[inline]
fn for_each_image<const N: usize>(
    cell: [usize; N],
    n_cells: [usize; N],
    n_search: [usize; N],
    with_ghosts: bool,
    mut function: impl FnMut([i32; N], [usize; N]),
) {
    let mut padded_cell = [0; N];
    for axis in 0..N {
        padded_cell[axis] = cell[axis] + n_search[axis];
    }

    if !with_ghosts {
        function([0; N], padded_cell);
        return;
    }

    // range of lattice shifts putting the image inside the padded grid,
    // i.e. with a cell index in `-n_search..(n_cells + n_search)`
    let mut min = [0; N];
    let mut max = [0; N];
    for axis in 0..N {
        let cell = cell[axis] as i32;
        let n = n_cells[axis] as i32;
        let search = n_search[axis] as i32;
        min[axis] = (-search - cell).div_euclid(n) + i32::from((-search - cell).rem_euclid(n) != 0);
        max[axis] = (n + search - 1 - cell).div_euclid(n);
    }

    for shift in Shifts::new(min, max) {
        for axis in 0..N {
            let position = cell[axis] as i32 + shift[axis] * n_cells[axis] as i32 + n_search[axis] as i32;
            debug_assert!(position >= 0);
            padded_cell[axis] = position as usize;
        }
        function(shift, padded_cell);
    }
}

/// A `CellList` sorts particles in the cells of a [`PeriodicBox`], so that
/// all pairs closer than the cutoff can be found by looking only at
/// neighboring cells.
///
/// Particles are wrapped inside the unit cell, and periodic images (ghosts)
/// of the particles close to the boundaries are stored in a layer of padding
/// cells around the grid. The traversal can then treat the system as a
/// finite, padded volume, without applying periodic boundary conditions to
/// each pair.
///
/// A cell list can be built from a single set of coordinates, to look for
/// pairs inside this set; or from two sets, to look only for pairs with one
/// particle in each set (see [`CellList::new_cross`]).
///
/// The cell list must be rebuilt (or updated with [`CellList::update`])
/// every time the positions change.
#[derive(Debug, Clone)]
pub struct CellList<T, const N: usize> {
    /// Geometry used to build this cell list
    periodic_box: PeriodicBox<T, N>,
    /// Particles in the first (or only) set of coordinates
    first: CellStorage<T, N>,
    /// Particles in the second set of coordinates, for cross-set lists
    second: Option<CellStorage<T, N>>,
}

impl<T: Real, const N: usize> CellList<T, N> {
    /// Create a cell list for a single set of `positions`.
    #[time_graph::instrument(name = "CellList::new")]
    pub fn new(positions: &[[T; N]], periodic_box: &PeriodicBox<T, N>) -> Result<CellList<T, N>, Error> {
        let mut cell_list = CellList {
            periodic_box: periodic_box.clone(),
            first: CellStorage::new(),
            second: None,
        };
        cell_list.update(positions, periodic_box)?;
        return Ok(cell_list);
    }

    /// Create a cell list to find pairs between particles in `first` and
    /// particles in `second`. Pairs within each set are never considered.
    #[time_graph::instrument(name = "CellList::new_cross")]
    pub fn new_cross(first: &[[T; N]], second: &[[T; N]], periodic_box: &PeriodicBox<T, N>) -> Result<CellList<T, N>, Error> {
        let mut cell_list = CellList {
            periodic_box: periodic_box.clone(),
            first: CellStorage::new(),
            second: Some(CellStorage::new()),
        };
        cell_list.update_cross(first, second, periodic_box)?;
        return Ok(cell_list);
    }

    /// Create a cell list from a flat array of coordinates, containing `N`
    /// values for each particle.
    pub fn from_flat(positions: &[T], periodic_box: &PeriodicBox<T, N>) -> Result<CellList<T, N>, Error> {
        let positions = flat_to_positions(positions)?;
        return CellList::new(&positions, periodic_box);
    }

    /// Create a cell list from an array of coordinates with shape
    /// `(n_particles, N)`.
    pub fn from_array(positions: ArrayView2<'_, T>, periodic_box: &PeriodicBox<T, N>) -> Result<CellList<T, N>, Error> {
        let positions = array_to_positions(positions)?;
        return CellList::new(&positions, periodic_box);
    }

    /// Rebuild this single-set cell list with new `positions` (and possibly a
    /// new `periodic_box`), re-using already allocated memory.
    pub fn update(&mut self, positions: &[[T; N]], periodic_box: &PeriodicBox<T, N>) -> Result<(), Error> {
        if self.second.is_some() {
            return Err(Error::DimensionMismatch(
                "can not update a cross-set cell list with a single set of positions".into()
            ));
        }

        // validate everything before touching the current state, so that a
        // failed update leaves a usable cell list behind
        let positions = check_positions(positions, "positions")?;
        if self.periodic_box != *periodic_box {
            self.periodic_box = periodic_box.clone();
        }
        self.first.fill(&positions, periodic_box, true);

        debug!(
            "cell list with {} particles and {} periodic images in {} non-empty cells",
            positions.len(), self.first.n_ghosts, self.first.occupied.len()
        );

        return Ok(());
    }

    /// Rebuild this cross-set cell list with new positions (and possibly a
    /// new `periodic_box`), re-using already allocated memory.
    pub fn update_cross(&mut self, first: &[[T; N]], second: &[[T; N]], periodic_box: &PeriodicBox<T, N>) -> Result<(), Error> {
        let second_storage = match self.second {
            Some(ref mut storage) => storage,
            None => {
                return Err(Error::DimensionMismatch(
                    "can not update a single-set cell list with two sets of positions".into()
                ));
            }
        };

        let first = check_positions(first, "first set of positions")?;
        let second = check_positions(second, "second set of positions")?;
        if self.periodic_box != *periodic_box {
            self.periodic_box = periodic_box.clone();
        }

        // only the particles in the second set need periodic images, since
        // the particles in the first set are the centers of the search
        self.first.fill(&first, periodic_box, false);
        second_storage.fill(&second, periodic_box, true);

        debug!(
            "cross-set cell list with {} + {} particles and {} periodic images",
            first.len(), second.len(), second_storage.n_ghosts
        );

        return Ok(());
    }

    /// Is this a cell list over two sets of coordinates?
    pub fn is_cross(&self) -> bool {
        self.second.is_some()
    }

    /// Get the number of particles in the first (or only) set of coordinates
    pub fn n_particles(&self) -> usize {
        self.first.wrapped.len()
    }

    /// Get the number of particles in the second set of coordinates, or 0
    /// for single-set cell lists
    pub fn n_particles_second(&self) -> usize {
        self.second.as_ref().map_or(0, |second| second.wrapped.len())
    }

    /// Get the number of periodic images stored in this cell list
    pub fn n_ghosts(&self) -> usize {
        self.first.n_ghosts + self.second.as_ref().map_or(0, |second| second.n_ghosts)
    }

    /// Get the number of cells containing at least one particle of the first
    /// (or only) set of coordinates
    pub fn n_occupied_cells(&self) -> usize {
        self.first.occupied.len()
    }

    /// Get the positions of the particles in the first (or only) set,
    /// wrapped inside the unit cell
    pub fn wrapped_positions(&self) -> &[Vector<T, N>] {
        &self.first.wrapped
    }

    /// Check that this cell list was built with the given box
    pub(crate) fn check_box(&self, periodic_box: &PeriodicBox<T, N>) -> Result<(), Error> {
        if self.periodic_box != *periodic_box {
            return Err(Error::DimensionMismatch(
                "this cell list was built with a different periodic box".into()
            ));
        }
        return Ok(());
    }

    pub(crate) fn first(&self) -> &CellStorage<T, N> {
        &self.first
    }

    pub(crate) fn second(&self) -> Option<&CellStorage<T, N>> {
        self.second.as_ref()
    }
}

/// Convert a flat array of values to a list of positions
pub(crate) fn flat_to_positions<T: Real, const N: usize>(values: &[T]) -> Result<Vec<[T; N]>, Error> {
    if N == 0 || values.len() % N != 0 {
        return Err(Error::DimensionMismatch(format!(
            "expected a multiple of {} values in flat positions, got {}", N, values.len()
        )));
    }

    let positions = values.chunks_exact(N).map(|chunk| {
        let mut position = [T::zero(); N];
        position.copy_from_slice(chunk);
        position
    }).collect();

    return Ok(positions);
}

/// Convert a `(n_particles, N)` array to a list of positions
pub(crate) fn array_to_positions<T: Real, const N: usize>(array: ArrayView2<'_, T>) -> Result<Vec<[T; N]>, Error> {
    if array.ncols() != N {
        return Err(Error::DimensionMismatch(format!(
            "expected positions with shape (n_particles, {}), got shape {:?}", N, array.shape()
        )));
    }

    let positions = array.rows().into_iter().map(|row| {
        let mut position = [T::zero(); N];
        for (value, &row_value) in position.iter_mut().zip(row.iter()) {
            *value = row_value;
        }
        position
    }).collect();

    return Ok(positions);
}

use log::{debug, warn};

use crate::{Error, Real, Vector};
use super::{UnitCell, Shifts, is_lexicographically_positive};

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a small cutoff (or a large `lcell`) in a large unit cell
pub(crate) const MAX_NUMBER_OF_CELLS: f64 = 1e7;

/// A `PeriodicBox` combines a [`UnitCell`] with a cutoff, and defines the grid
/// used to sort particles in a [`CellList`](crate::CellList).
///
/// The grid is laid out in fractional coordinates: the cell is divided in
/// `n_cells()[k]` slices along each lattice vector. The number of slices is
/// chosen so that the width of each slice, measured perpendicular to the
/// corresponding faces, is at least `cutoff / lcell`. Looking `lcell` cells
/// away in each direction is then enough to find all pairs closer than the
/// cutoff, regardless of the skew of the unit cell.
///
/// Larger values of `lcell` make the search volume hug the cutoff sphere
/// more tightly (fewer pairs to reject by distance), at the cost of more
/// cells and more periodic images to store.
///
/// A `PeriodicBox` is immutable; use [`PeriodicBox::update_cutoff`] or
/// [`PeriodicBox::update_unit_cell`] to create a new one when the geometry
/// changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicBox<T, const N: usize> {
    unit_cell: UnitCell<T, N>,
    cutoff: T,
    cutoff2: T,
    lcell: usize,
    /// Number of real cells along each axis
    n_cells: [usize; N],
    /// How many cells do we need to look at when searching neighbors to
    /// include all neighbors below cutoff. This is also the number of
    /// padding cells containing periodic images on each side of the grid.
    n_search: [usize; N],
    /// Linear index strides in the padded grid
    strides: [usize; N],
    /// Linear offsets to the neighboring cells in the half-space stencil
    half_stencil: Vec<isize>,
    /// Linear offsets to all neighboring cells, including the cell itself
    full_stencil: Vec<isize>,
    /// Lattice shifts to check when more than one periodic image of a
    /// particle can be within the cutoff of another one
    image_shifts: Vec<[i32; N]>,
}

impl<T: Real, const N: usize> PeriodicBox<T, N> {
    /// Create a new `PeriodicBox` for the given `unit_cell` and `cutoff`, with
    /// `lcell = 1`.
    pub fn new(unit_cell: UnitCell<T, N>, cutoff: T) -> Result<PeriodicBox<T, N>, Error> {
        PeriodicBox::with_lcell(unit_cell, cutoff, 1)
    }

    /// Create a new `PeriodicBox` for the given `unit_cell` and `cutoff`, where
    /// each cell is (at least) `cutoff / lcell` wide.
    pub fn with_lcell(unit_cell: UnitCell<T, N>, cutoff: T, lcell: usize) -> Result<PeriodicBox<T, N>, Error> {
        if lcell == 0 {
            return Err(Error::InvalidParameter("lcell must be at least 1".into()));
        }

        if !cutoff.is_finite() || cutoff <= T::zero() {
            return Err(Error::InvalidGeometry(format!(
                "cutoff must be a positive number, got {:?}", cutoff
            )));
        }

        let faces = unit_cell.distances_between_faces();
        for axis in 0..N {
            if faces[axis] < cutoff {
                return Err(Error::InvalidGeometry(format!(
                    "the unit cell is too small for this cutoff: distance between \
                    faces along axis {} is {:?}, which is smaller than the cutoff ({:?})",
                    axis, faces[axis], cutoff
                )));
            }
        }

        let faces = faces.0.map(Real::to_f64);
        let n_cells = grid_shape(faces, cutoff.to_f64(), lcell);
        let n_search = [lcell; N];

        let mut padded = [0; N];
        for axis in 0..N {
            padded[axis] = n_cells[axis] + 2 * n_search[axis];
        }

        let mut strides = [1; N];
        for axis in (0..N.saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * padded[axis + 1];
        }

        let mut half_stencil = Vec::new();
        let mut full_stencil = Vec::new();
        for delta in Shifts::symmetric(n_search.map(|n| n as i32)) {
            let offset = delta.iter().zip(&strides)
                .map(|(&d, &stride)| d as isize * stride as isize)
                .sum::<isize>();

            full_stencil.push(offset);
            if is_lexicographically_positive(&delta) {
                half_stencil.push(offset);
            }
        }

        let image_shifts = image_shifts(&unit_cell, faces, cutoff.to_f64());

        debug!(
            "periodic box with {:?} cells, searching {:?} cells around each one, {} alternative periodic images",
            n_cells, n_search, image_shifts.len()
        );

        return Ok(PeriodicBox {
            unit_cell: unit_cell,
            cutoff: cutoff,
            cutoff2: cutoff * cutoff,
            lcell: lcell,
            n_cells: n_cells,
            n_search: n_search,
            strides: strides,
            half_stencil: half_stencil,
            full_stencil: full_stencil,
            image_shifts: image_shifts,
        });
    }

    /// Create a new box with the same unit cell and `lcell`, and a different
    /// cutoff
    pub fn update_cutoff(&self, cutoff: T) -> Result<PeriodicBox<T, N>, Error> {
        PeriodicBox::with_lcell(self.unit_cell, cutoff, self.lcell)
    }

    /// Create a new box with the same cutoff and `lcell`, and a different
    /// unit cell
    pub fn update_unit_cell(&self, unit_cell: UnitCell<T, N>) -> Result<PeriodicBox<T, N>, Error> {
        PeriodicBox::with_lcell(unit_cell, self.cutoff, self.lcell)
    }

    /// Get the unit cell of this box
    pub fn unit_cell(&self) -> &UnitCell<T, N> {
        &self.unit_cell
    }

    /// Get the cutoff of this box
    pub fn cutoff(&self) -> T {
        self.cutoff
    }

    /// Get the squared cutoff of this box
    pub fn cutoff2(&self) -> T {
        self.cutoff2
    }

    /// Get the number of cells per cutoff distance
    pub fn lcell(&self) -> usize {
        self.lcell
    }

    /// Get the number of cells along each lattice vector
    pub fn n_cells(&self) -> [usize; N] {
        self.n_cells
    }

    /// Get the total number of cells in the grid, not including the padding
    /// cells containing periodic images
    pub fn total_cells(&self) -> usize {
        self.n_cells.iter().product()
    }

    /// Get the number of neighboring cells searched along each direction
    pub fn n_search(&self) -> [usize; N] {
        self.n_search
    }

    /// Get the shape of the grid including the padding cells on each side
    pub fn padded_shape(&self) -> [usize; N] {
        let mut padded = self.n_cells;
        for axis in 0..N {
            padded[axis] += 2 * self.n_search[axis];
        }
        return padded;
    }

    /// Get the width of the cells, measured perpendicular to the faces of
    /// the unit cell
    pub fn cell_widths(&self) -> Vector<T, N> {
        let mut widths = self.unit_cell.distances_between_faces();
        for axis in 0..N {
            widths[axis] /= T::from_f64(self.n_cells[axis] as f64);
        }
        return widths;
    }

    /// Wrap `position` inside the unit cell, and find the real cell
    /// containing it, as integer coordinates in `0..n_cells()[k]`.
    pub fn cell_index_of(&self, position: Vector<T, N>) -> (Vector<T, N>, [usize; N]) {
        let wrapped = self.unit_cell.wrap(position);
        let fractional = self.unit_cell.fractional(wrapped);

        let mut index = [0; N];
        for axis in 0..N {
            let n_cells = self.n_cells[axis];
            let f = fractional[axis].to_f64();
            // rounding errors in `wrap` can produce values slightly outside of
            // [0, 1), clamping puts them back in the closest cell
            let i = f64::floor(f * n_cells as f64);
            index[axis] = if i < 0.0 {
                0
            } else {
                usize::min(i as usize, n_cells - 1)
            };
        }

        return (wrapped, index);
    }

    /// Linear offsets to the neighboring cells in half of the search stencil:
    /// for any pair of opposite offsets, exactly one is included. The zero
    /// offset (the cell itself) is not included.
    pub fn half_stencil(&self) -> &[isize] {
        &self.half_stencil
    }

    /// Linear offsets to all the neighboring cells in the search stencil,
    /// including the cell itself.
    pub fn full_stencil(&self) -> &[isize] {
        &self.full_stencil
    }

    /// Lattice shifts leading to other periodic images possibly within the
    /// cutoff. This is empty when the cell is more than twice as large as the
    /// cutoff in every direction.
    pub(crate) fn image_shifts(&self) -> &[[i32; N]] {
        &self.image_shifts
    }

    /// Get the linear index in the padded grid of a cell with the given
    /// coordinates in the padded grid
    #[inline]
    pub(crate) fn linear_index(&self, padded: [usize; N]) -> usize {
        padded.iter().zip(&self.strides).map(|(i, stride)| i * stride).sum()
    }
}

/// Number of cells along each axis, such that the cells are at least `cutoff
/// / lcell` wide, and the total number of cells stays below
/// `MAX_NUMBER_OF_CELLS`.
fn grid_shape<const N: usize>(faces: [f64; N], cutoff: f64, lcell: usize) -> [usize; N] {
    let width = cutoff / lcell as f64;

    let mut n_cells = [1.0; N];
    for axis in 0..N {
        let mut n = f64::max(f64::floor(faces[axis] / width), 1.0);
        // floor can round up when faces / width is very close to an integer
        while n > 1.0 && faces[axis] / n < width {
            n -= 1.0;
        }
        n_cells[axis] = n;
    }

    // limit memory consumption by ensuring we have less than
    // `MAX_NUMBER_OF_CELLS` cells, while keeping roughly the ratio of cells
    // in each direction. Making cells larger never breaks the search.
    let total = n_cells.iter().product::<f64>();
    if total > MAX_NUMBER_OF_CELLS {
        let scale = f64::powf(total / MAX_NUMBER_OF_CELLS, 1.0 / N as f64);
        for n in &mut n_cells {
            *n = f64::max(f64::floor(*n / scale), 1.0);
        }

        while n_cells.iter().product::<f64>() > MAX_NUMBER_OF_CELLS {
            let mut largest = 0;
            for axis in 1..N {
                if n_cells[axis] > n_cells[largest] {
                    largest = axis;
                }
            }
            n_cells[largest] -= 1.0;
        }

        warn!(
            "too many cells for cutoff {} and lcell = {}, the grid was reduced to {:?} cells",
            cutoff, lcell, n_cells
        );
    }

    return n_cells.map(|n| n as usize);
}

/// Get the list of non-zero lattice shifts `m` such that a particle and its
/// periodic image translated by `m` could both be within `cutoff` of another
/// particle, i.e. the translation is shorter than twice the cutoff.
fn image_shifts<T: Real, const N: usize>(unit_cell: &UnitCell<T, N>, faces: [f64; N], cutoff: f64) -> Vec<[i32; N]> {
    let minimal_face = faces.iter().copied().fold(f64::INFINITY, f64::min);
    if 2.0 * cutoff < minimal_face {
        return Vec::new();
    }

    // a translation by m has a length of at least |m[k]| * faces[k]
    let range = faces.map(|face| f64::ceil(2.0 * cutoff / face) as i32);
    let max_length2 = 4.0 * cutoff * cutoff * (1.0 + 1e-9);

    return Shifts::symmetric(range)
        .filter(|shift| shift.iter().any(|&s| s != 0))
        .filter(|&shift| unit_cell.translation(shift).norm2().to_f64() <= max_length2)
        .collect();
}

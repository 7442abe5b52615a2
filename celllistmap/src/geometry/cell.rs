//! The `UnitCell` type represents the periodic repeat unit of a simulated
//! system, in 2 or 3 dimensions.
use crate::{Error, Real, Vector};

use super::{check_dimension, Shifts};

/// The shape of a cell determine how we will be able to compute the periodic
/// boundaries condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    /// Orthorhombic unit cell, with axis aligned sides
    Orthorhombic,
    /// Triclinic unit cell, with arbitrary parallelepiped shape
    Triclinic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lattice<T, const N: usize> {
    Orthorhombic {
        /// Side lengths of the cell
        sides: Vector<T, N>,
    },
    Triclinic {
        /// Lattice vectors, `vectors[k]` is the k-th vector
        vectors: [Vector<T, N>; N],
        /// Reciprocal vectors, such that `reciprocal[k] * vectors[l]` is 1 if
        /// `k == l` and 0 otherwise
        reciprocal: [Vector<T, N>; N],
    },
}

/// An `UnitCell` defines the periodic boundary conditions of a system.
///
/// The cell is either orthorhombic (axis-aligned sides) or triclinic
/// (arbitrary lattice vectors). Both shapes expose the same set of geometric
/// operations, the shape only selects the most efficient way to compute them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell<T, const N: usize> {
    lattice: Lattice<T, N>,
}

impl<T: Real, const N: usize> UnitCell<T, N> {
    /// Create an orthorhombic unit cell with the given side lengths.
    pub fn orthorhombic(sides: [T; N]) -> Result<UnitCell<T, N>, Error> {
        check_dimension::<N>()?;

        for (axis, &side) in sides.iter().enumerate() {
            if !side.is_finite() || side <= T::zero() {
                return Err(Error::InvalidGeometry(format!(
                    "cell lengths must be positive, got {:?} along axis {}", side, axis
                )));
            }
        }

        return Ok(UnitCell {
            lattice: Lattice::Orthorhombic { sides: Vector::new(sides) },
        });
    }

    /// Create a cubic unit cell, with all sides equal to `length`.
    pub fn cubic(length: T) -> Result<UnitCell<T, N>, Error> {
        UnitCell::orthorhombic([length; N])
    }

    /// Create a triclinic unit cell from its lattice vectors, `vectors[k]`
    /// being the k-th vector. The vectors must be linearly independent and
    /// form a right-handed basis.
    pub fn triclinic(vectors: [[T; N]; N]) -> Result<UnitCell<T, N>, Error> {
        check_dimension::<N>()?;

        let vectors = vectors.map(Vector::new);
        if !vectors.iter().all(Vector::is_finite) {
            return Err(Error::InvalidGeometry(
                "lattice vectors must be finite".into()
            ));
        }

        let volume = triple_product(&vectors);
        let norms = vectors.iter().fold(T::one(), |acc, v| acc * v.norm());
        // reject nearly colinear vectors as well as left-handed bases
        if !(volume > T::from_f64(1e-10) * norms) {
            return Err(Error::InvalidGeometry(format!(
                "lattice vectors must be independent and right-handed, got a volume of {:?}", volume
            )));
        }

        let reciprocal = reciprocal_vectors(&vectors, volume);
        return Ok(UnitCell {
            lattice: Lattice::Triclinic { vectors, reciprocal },
        });
    }

    /// Get the cell shape
    pub fn shape(&self) -> CellShape {
        match self.lattice {
            Lattice::Orthorhombic { .. } => CellShape::Orthorhombic,
            Lattice::Triclinic { .. } => CellShape::Triclinic,
        }
    }

    /// Get the lattice vectors of this cell, `vectors()[k]` being the k-th
    /// vector
    pub fn vectors(&self) -> [Vector<T, N>; N] {
        match self.lattice {
            Lattice::Orthorhombic { sides } => {
                let mut vectors = [Vector::zero(); N];
                for (axis, vector) in vectors.iter_mut().enumerate() {
                    vector[axis] = sides[axis];
                }
                vectors
            }
            Lattice::Triclinic { vectors, .. } => vectors,
        }
    }

    /// Get the volume of the cell (the area for 2D cells)
    pub fn volume(&self) -> T {
        match self.lattice {
            Lattice::Orthorhombic { sides } => sides.0.iter().fold(T::one(), |acc, &side| acc * side),
            Lattice::Triclinic { vectors, .. } => triple_product(&vectors),
        }
    }

    /// Get the distances between opposite faces of the unit cell, which is
    /// the width of the cell measured perpendicular to each pair of faces.
    pub fn distances_between_faces(&self) -> Vector<T, N> {
        match self.lattice {
            Lattice::Orthorhombic { sides } => sides,
            Lattice::Triclinic { reciprocal, .. } => {
                let mut distances = Vector::zero();
                for axis in 0..N {
                    distances[axis] = T::one() / reciprocal[axis].norm();
                }
                distances
            }
        }
    }
}

/// Geometric operations using periodic boundary conditions
impl<T: Real, const N: usize> UnitCell<T, N> {
    /// Get the fractional representation of the `vector` in this cell
    pub fn fractional(&self, vector: Vector<T, N>) -> Vector<T, N> {
        match self.lattice {
            Lattice::Orthorhombic { sides } => {
                let mut fractional = vector;
                for axis in 0..N {
                    fractional[axis] /= sides[axis];
                }
                fractional
            }
            Lattice::Triclinic { reciprocal, .. } => {
                let mut fractional = Vector::zero();
                for axis in 0..N {
                    fractional[axis] = reciprocal[axis] * vector;
                }
                fractional
            }
        }
    }

    /// Get the Cartesian representation of the `fractional` vector in this
    /// cell
    pub fn cartesian(&self, fractional: Vector<T, N>) -> Vector<T, N> {
        match self.lattice {
            Lattice::Orthorhombic { sides } => {
                let mut cartesian = fractional;
                for axis in 0..N {
                    cartesian[axis] *= sides[axis];
                }
                cartesian
            }
            Lattice::Triclinic { vectors, .. } => {
                let mut cartesian = Vector::zero();
                for axis in 0..N {
                    cartesian += vectors[axis] * fractional[axis];
                }
                cartesian
            }
        }
    }

    /// Get the cartesian translation corresponding to an integer number of
    /// lattice vectors along each axis
    pub fn translation(&self, shift: [i32; N]) -> Vector<T, N> {
        match self.lattice {
            Lattice::Orthorhombic { sides } => {
                let mut translation = Vector::zero();
                for axis in 0..N {
                    if shift[axis] != 0 {
                        translation[axis] = sides[axis] * T::from_f64(shift[axis] as f64);
                    }
                }
                translation
            }
            Lattice::Triclinic { vectors, .. } => {
                let mut translation = Vector::zero();
                for axis in 0..N {
                    if shift[axis] != 0 {
                        translation += vectors[axis] * T::from_f64(shift[axis] as f64);
                    }
                }
                translation
            }
        }
    }

    /// Wrap a position in the unit cell, obeying the periodic boundary
    /// conditions. For an orthorhombic cell of sides `L`, this produce a
    /// vector with all components in `[0, L)`, up to rounding errors.
    pub fn wrap(&self, position: Vector<T, N>) -> Vector<T, N> {
        match self.lattice {
            Lattice::Orthorhombic { sides } => {
                let mut wrapped = position;
                for axis in 0..N {
                    wrapped[axis] -= (position[axis] / sides[axis]).floor() * sides[axis];
                }
                wrapped
            }
            Lattice::Triclinic { .. } => {
                let mut fractional = self.fractional(position);
                for axis in 0..N {
                    let floor = fractional[axis].floor();
                    fractional[axis] -= floor;
                }
                self.cartesian(fractional)
            }
        }
    }

    /// Find the shortest periodic image of the displacement `vector`.
    ///
    /// For orthorhombic cells this is done by rounding each component. For
    /// triclinic cells, rounding the fractional coordinates is not enough
    /// when the cell is skewed, so all lattice translations that could lead
    /// to a shorter vector are also checked.
    pub fn minimum_image(&self, vector: Vector<T, N>) -> Vector<T, N> {
        match self.lattice {
            Lattice::Orthorhombic { sides } => {
                let mut image = vector;
                for axis in 0..N {
                    image[axis] -= (vector[axis] / sides[axis]).round() * sides[axis];
                }
                image
            }
            Lattice::Triclinic { .. } => {
                let mut fractional = self.fractional(vector);
                for axis in 0..N {
                    let round = fractional[axis].round();
                    fractional[axis] -= round;
                }
                let rounded = self.cartesian(fractional);

                // any shorter image must be within `|rounded|` of the origin,
                // limiting how many lattice vectors we can add along each axis
                let length = rounded.norm().to_f64();
                let distances = self.distances_between_faces();
                let mut range = [0; N];
                for axis in 0..N {
                    range[axis] = f64::ceil(length / distances[axis].to_f64() + 0.5) as i32;
                }

                let mut best = rounded;
                let mut best_norm2 = rounded.norm2();
                for shift in Shifts::symmetric(range) {
                    let candidate = rounded + self.translation(shift);
                    let norm2 = candidate.norm2();
                    if norm2 < best_norm2 {
                        best = candidate;
                        best_norm2 = norm2;
                    }
                }
                best
            }
        }
    }

    /// Periodic boundary conditions squared distance between the point `u` and
    /// the point `v`
    pub fn distance2(&self, u: Vector<T, N>, v: Vector<T, N>) -> T {
        self.minimum_image(v - u).norm2()
    }
}

/// Signed volume of the parallelepiped defined by `vectors` (the signed area
/// of the parallelogram in 2D)
fn triple_product<T: Real, const N: usize>(vectors: &[Vector<T, N>; N]) -> T {
    let v: &[Vector<T, N>] = vectors;
    if N == 2 {
        v[0][0] * v[1][1] - v[0][1] * v[1][0]
    } else {
        debug_assert_eq!(N, 3);
        v[0] * cross(&v[1], &v[2])
    }
}

fn cross<T: Real, const N: usize>(u: &Vector<T, N>, v: &Vector<T, N>) -> Vector<T, N> {
    debug_assert_eq!(N, 3);
    let mut result = Vector::zero();
    result[0] = u[1] * v[2] - u[2] * v[1];
    result[1] = u[2] * v[0] - u[0] * v[2];
    result[2] = u[0] * v[1] - u[1] * v[0];
    return result;
}

fn reciprocal_vectors<T: Real, const N: usize>(vectors: &[Vector<T, N>; N], volume: T) -> [Vector<T, N>; N] {
    let v: &[Vector<T, N>] = vectors;
    let mut reciprocal = [Vector::zero(); N];
    if N == 2 {
        reciprocal[0][0] = v[1][1] / volume;
        reciprocal[0][1] = -v[1][0] / volume;
        reciprocal[1][0] = -v[0][1] / volume;
        reciprocal[1][1] = v[0][0] / volume;
    } else {
        debug_assert_eq!(N, 3);
        for axis in 0..3 {
            reciprocal[axis] = cross(&v[(axis + 1) % 3], &v[(axis + 2) % 3]) / volume;
        }
    }
    return reciprocal;
}

use crate::{CellList, Error, PeriodicBox, Real, UnitCell};
use crate::{map_pairwise_with, MapOptions, Pair};

/// Compute the list of all pairs of particles closer than `cutoff` in the
/// periodic system defined by `unit_cell`.
///
/// Each pair is given as `(i, j, distance)` with `i < j`, and the pairs are
/// sorted by `(i, j)`. When more than one periodic image of `j` is within the
/// cutoff of `i`, only the closest one is included.
#[time_graph::instrument(name = "neighbor_list")]
pub fn neighbor_list<T: Real, const N: usize>(
    positions: &[[T; N]],
    unit_cell: UnitCell<T, N>,
    cutoff: T,
) -> Result<Vec<(usize, usize, T)>, Error> {
    let periodic_box = PeriodicBox::new(unit_cell, cutoff)?;
    let cell_list = CellList::new(positions, &periodic_box)?;
    return pairs_list(&periodic_box, &cell_list);
}

/// Compute the list of all pairs with one particle in `first` and the other
/// one in `second`, closer than `cutoff` in the periodic system defined by
/// `unit_cell`.
///
/// Each pair is given as `(i, j, distance)` where `i` is an index in `first`
/// and `j` an index in `second`, and the pairs are sorted by `(i, j)`.
#[time_graph::instrument(name = "cross_neighbor_list")]
pub fn cross_neighbor_list<T: Real, const N: usize>(
    first: &[[T; N]],
    second: &[[T; N]],
    unit_cell: UnitCell<T, N>,
    cutoff: T,
) -> Result<Vec<(usize, usize, T)>, Error> {
    let periodic_box = PeriodicBox::new(unit_cell, cutoff)?;
    let cell_list = CellList::new_cross(first, second, &periodic_box)?;
    return pairs_list(&periodic_box, &cell_list);
}

fn pairs_list<T: Real, const N: usize>(periodic_box: &PeriodicBox<T, N>, cell_list: &CellList<T, N>) -> Result<Vec<(usize, usize, T)>, Error> {
    let mut pairs = map_pairwise_with(
        |pair: &Pair<T, N>, mut pairs: Vec<(usize, usize, T)>| {
            pairs.push((pair.first, pair.second, pair.distance()));
            pairs
        },
        Vec::new(),
        periodic_box,
        cell_list,
        |pairs: &mut Vec<(usize, usize, T)>, partial: Vec<(usize, usize, T)>| pairs.extend(partial),
        MapOptions::default(),
    )?;

    // sort the pairs to make sure the output does not depend on the number of
    // threads
    pairs.sort_unstable_by_key(|pair| (pair.0, pair.1));

    return Ok(pairs);
}

#[cfg(test)]
mod tests {
    use approx::{assert_relative_eq, assert_ulps_eq};

    use super::*;

    #[test]
    fn large_cell_small_cutoff() {
        let cell = UnitCell::<f64, 3>::cubic(54.0).unwrap();
        let positions = [
            [0.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 2.0],
            // particles outside the cell natural boundaries
            [-6.0, 0.0, 0.0],
            [-6.0, -2.0, 0.0],
            [-6.0, 0.0, -2.0],
        ];

        let pairs = neighbor_list(&positions, cell, 2.1).unwrap();

        let expected = [(0, 1), (0, 2), (3, 4), (3, 5)];
        assert_eq!(pairs.len(), expected.len());
        for (pair, expected) in pairs.iter().zip(&expected) {
            assert_eq!(pair.0, expected.0);
            assert_eq!(pair.1, expected.1);
            assert_relative_eq!(pair.2, 2.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn periodic_wrap() {
        let cell = UnitCell::<f64, 3>::cubic(1.0).unwrap();
        let pairs = neighbor_list(&[[0.01, 0.0, 0.0], [0.99, 0.0, 0.0]], cell, 0.05).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].0, pairs[0].1), (0, 1));
        assert_relative_eq!(pairs[0].2, 0.02, max_relative = 1e-9);
    }

    #[test]
    fn skewed_cell() {
        let cell = UnitCell::triclinic([
            [10.0, 0.0, 0.0],
            [0.0, 10.0, 0.0],
            [0.0, 20.0, 10.0],
        ]).unwrap();

        // the second particle is a periodic image of (1.0, 0.2, 0.7), 0.5 away
        // from the first one along z
        let positions = [[1.0, 0.2, 0.2], [1.0, 20.2, 10.7]];
        let pairs = neighbor_list(&positions, cell, 1.2).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_relative_eq!(pairs[0].2, 0.5, max_relative = 1e-9);
    }

    #[test]
    fn small_cell_large_cutoff() {
        // all the images of the second particle are at the same distance of
        // the first one, only one of them is included
        let cell = UnitCell::<f64, 3>::cubic(1.0).unwrap();
        let positions = [[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]];
        let pairs = neighbor_list(&positions, cell, 0.9).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_ulps_eq!(pairs[0].2, f64::sqrt(0.75));
    }

    #[test]
    fn cross() {
        let cell = UnitCell::orthorhombic([10.0, 10.0]).unwrap();
        let first = [[0.5, 0.5], [5.0, 5.0], [9.8, 9.8]];
        let second = [[9.5, 0.5], [5.0, 5.5], [0.2, 0.2]];

        let pairs = cross_neighbor_list(&first, &second, cell, 1.5).unwrap();
        let indexes = pairs.iter().map(|pair| (pair.0, pair.1)).collect::<Vec<_>>();
        assert_eq!(indexes, [(0, 0), (0, 2), (1, 1), (2, 0), (2, 2)]);

        assert_relative_eq!(pairs[0].2, 1.0, max_relative = 1e-12);
        assert_relative_eq!(pairs[1].2, f64::sqrt(0.18), max_relative = 1e-12);
        assert_relative_eq!(pairs[2].2, 0.5, max_relative = 1e-12);
    }

    #[test]
    fn errors() {
        let cell = UnitCell::<f64, 3>::cubic(10.0).unwrap();
        assert!(matches!(neighbor_list::<f64, 3>(&[], cell, 1.0), Err(Error::EmptyInput(_))));
        assert!(matches!(neighbor_list(&[[0.0; 3]], cell, 20.0), Err(Error::InvalidGeometry(_))));
        assert!(matches!(cross_neighbor_list(&[[0.0; 3]], &[], cell, 1.0), Err(Error::EmptyInput(_))));
    }
}

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;

use celllistmap::{UnitCell, Vector};

/// Pair of particles as `(first, second, distance2)`
pub type PairData = (usize, usize, f64);

/// All lattice shifts with components in `-2..=2`. This is enough to find
/// all images within the cutoff of wrapped particles, since the cutoff is
/// never larger than the distance between faces of the cell.
fn all_shifts<const N: usize>() -> Vec<[i32; N]> {
    let mut shifts = Vec::new();
    for linear in 0..5_usize.pow(N as u32) {
        let mut shift = [0; N];
        let mut remaining = linear;
        for value in &mut shift {
            *value = (remaining % 5) as i32 - 2;
            remaining /= 5;
        }
        shifts.push(shift);
    }
    return shifts;
}

/// Squared distance between `first` and the closest explicit periodic image
/// of `second`
fn closest_image<const N: usize>(cell: &UnitCell<f64, N>, first: Vector<f64, N>, second: Vector<f64, N>) -> f64 {
    let first = cell.wrap(first);
    let second = cell.wrap(second);

    let mut best = f64::INFINITY;
    for shift in all_shifts::<N>() {
        let distance2 = (second + cell.translation(shift) - first).norm2();
        best = f64::min(best, distance2);
    }
    return best;
}

/// Brute force search of all pairs within the cutoff, replicating the
/// particles explicitly
pub fn brute_force<const N: usize>(positions: &[[f64; N]], cell: &UnitCell<f64, N>, cutoff: f64) -> Vec<PairData> {
    let mut pairs = Vec::new();
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let distance2 = closest_image(cell, Vector::new(positions[i]), Vector::new(positions[j]));
            if distance2 <= cutoff * cutoff {
                pairs.push((i, j, distance2));
            }
        }
    }
    return pairs;
}

/// Brute force search of all pairs between two sets within the cutoff
pub fn brute_force_cross<const N: usize>(first: &[[f64; N]], second: &[[f64; N]], cell: &UnitCell<f64, N>, cutoff: f64) -> Vec<PairData> {
    let mut pairs = Vec::new();
    for (i, &a) in first.iter().enumerate() {
        for (j, &b) in second.iter().enumerate() {
            let distance2 = closest_image(cell, Vector::new(a), Vector::new(b));
            if distance2 <= cutoff * cutoff {
                pairs.push((i, j, distance2));
            }
        }
    }
    return pairs;
}

/// Check that `actual` contains the same pairs as `expected`, without
/// duplicates. Pairs right at the cutoff distance can be missing from one of
/// the lists, since rounding errors differ between both computations.
pub fn assert_same_pairs(actual: &[PairData], expected: &[PairData], cutoff: f64) {
    let cutoff2 = cutoff * cutoff;
    let tolerance = 1e-9 * cutoff2;

    let mut seen = BTreeSet::new();
    for &(i, j, _) in actual {
        assert!(seen.insert((i, j)), "pair ({}, {}) was found twice", i, j);
    }

    let expected = expected.iter()
        .map(|&(i, j, distance2)| ((i, j), distance2))
        .collect::<BTreeMap<_, _>>();

    for &(i, j, distance2) in actual {
        match expected.get(&(i, j)) {
            Some(&reference) => {
                assert!(
                    (distance2 - reference).abs() <= tolerance,
                    "wrong distance for pair ({}, {}): {} vs {}", i, j, distance2, reference
                );
            }
            None => {
                assert!(
                    (distance2 - cutoff2).abs() <= tolerance,
                    "unexpected pair ({}, {}) with distance2 = {}", i, j, distance2
                );
            }
        }
    }

    for (&(i, j), &distance2) in &expected {
        if !seen.contains(&(i, j)) {
            assert!(
                (distance2 - cutoff2).abs() <= tolerance,
                "missing pair ({}, {}) with distance2 = {}", i, j, distance2
            );
        }
    }
}

/// Strategy generating a skewed 3D unit cell
pub fn triclinic_cell_3d() -> impl Strategy<Value = UnitCell<f64, 3>> {
    (
        (5.0..12.0, 5.0..12.0, 5.0..12.0),
        (-5.0..5.0, -5.0..5.0, -5.0..5.0),
    ).prop_map(|((a, b, c), (ab, ac, bc))| {
        UnitCell::triclinic([
            [a, 0.0, 0.0],
            [ab, b, 0.0],
            [ac, bc, c],
        ]).expect("lower triangular cells with positive diagonal are valid")
    })
}

/// Strategy generating a skewed 2D unit cell
pub fn triclinic_cell_2d() -> impl Strategy<Value = UnitCell<f64, 2>> {
    (5.0..12.0, 5.0..12.0, -5.0..5.0).prop_map(|(a, b, ab)| {
        UnitCell::triclinic([[a, 0.0], [ab, b]]).expect("valid cell")
    })
}

/// Strategy generating an orthorhombic 3D unit cell
pub fn orthorhombic_cell_3d() -> impl Strategy<Value = UnitCell<f64, 3>> {
    (3.0..15.0, 3.0..15.0, 3.0..15.0).prop_map(|(a, b, c)| {
        UnitCell::orthorhombic([a, b, c]).expect("valid cell")
    })
}

/// Strategy generating up to `max` positions, given in fractional
/// coordinates. Some of the particles are outside of the unit cell.
pub fn fractional_positions<const N: usize>(max: usize) -> impl Strategy<Value = Vec<[f64; N]>> {
    prop::collection::vec(prop::array::uniform::<_, N>(-0.5..1.5), 1..max)
}

/// Convert fractional positions to cartesian positions in `cell`
pub fn to_cartesian<const N: usize>(cell: &UnitCell<f64, N>, fractional: &[[f64; N]]) -> Vec<[f64; N]> {
    fractional.iter()
        .map(|&f| cell.cartesian(Vector::new(f)).into_array())
        .collect()
}

/// Get a cutoff for `cell`, as a `fraction` of the smallest distance between
/// faces of the cell
pub fn cutoff_for<const N: usize>(cell: &UnitCell<f64, N>, fraction: f64) -> f64 {
    let faces = cell.distances_between_faces();
    let smallest = faces.0.iter().copied().fold(f64::INFINITY, f64::min);
    return fraction * smallest;
}

/// Generate `n` random positions inside `cell`, always the same ones
pub fn random_positions<const N: usize>(cell: &UnitCell<f64, N>, n: usize) -> Vec<[f64; N]> {
    let mut runner = TestRunner::deterministic();
    let strategy = prop::collection::vec(prop::array::uniform::<_, N>(0.0..1.0), n);
    let fractional = strategy.new_tree(&mut runner)
        .expect("failed to generate positions")
        .current();
    return to_cartesian(cell, &fractional);
}

//! Periodic geometry: the [`UnitCell`] describing the periodic boundary
//! conditions, and the [`PeriodicBox`] combining a unit cell with a cutoff to
//! define the grid used by cell lists.

use crate::Error;

mod cell;
pub use self::cell::{UnitCell, CellShape};

mod periodic_box;
pub use self::periodic_box::PeriodicBox;

/// Only 2 and 3 dimensional systems are supported
pub(crate) fn check_dimension<const N: usize>() -> Result<(), Error> {
    if N == 2 || N == 3 {
        Ok(())
    } else {
        Err(Error::DimensionMismatch(format!(
            "only 2 and 3 dimensional systems are supported, got N = {}", N
        )))
    }
}

/// Iterator over all integer vectors between `min` and `max` (both
/// included), in lexicographic order with the first axis being the most
/// significant.
#[derive(Debug, Clone)]
pub(crate) struct Shifts<const N: usize> {
    min: [i32; N],
    max: [i32; N],
    current: Option<[i32; N]>,
}

impl<const N: usize> Shifts<N> {
    pub fn new(min: [i32; N], max: [i32; N]) -> Shifts<N> {
        let empty = min.iter().zip(&max).any(|(min, max)| min > max);
        Shifts {
            min: min,
            max: max,
            current: if empty { None } else { Some(min) },
        }
    }

    /// All shifts with components in `-range[k]..=range[k]`
    pub fn symmetric(range: [i32; N]) -> Shifts<N> {
        Shifts::new(range.map(|r| -r), range)
    }
}

impl<const N: usize> Iterator for Shifts<N> {
    type Item = [i32; N];

    fn next(&mut self) -> Option<[i32; N]> {
        let current = self.current?;

        let mut next = current;
        let mut axis = N;
        loop {
            if axis == 0 {
                self.current = None;
                break;
            }
            axis -= 1;

            if next[axis] < self.max[axis] {
                next[axis] += 1;
                self.current = Some(next);
                break;
            }
            next[axis] = self.min[axis];
        }

        return Some(current);
    }
}

/// Check if the first non-zero component of `shift` is positive
pub(crate) fn is_lexicographically_positive<const N: usize>(shift: &[i32; N]) -> bool {
    for &value in shift {
        if value != 0 {
            return value > 0;
        }
    }
    return false;
}

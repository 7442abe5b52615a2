use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};

use log::trace;

use crate::{CellList, Error, PeriodicBox, Real, Vector};
use crate::cell_list::{CellStorage, Entry};
use crate::geometry::is_lexicographically_positive;

use super::Pair;

/// Enumeration of all the pairs within the cutoff in a cell list, over a
/// subset of the cells.
pub(crate) struct Traversal<'a, T, const N: usize> {
    periodic_box: &'a PeriodicBox<T, N>,
    /// particles at the center of the search, this is the only set for
    /// single-set cell lists
    centers: &'a CellStorage<T, N>,
    /// particles in the second set for cross-set cell lists
    others: Option<&'a CellStorage<T, N>>,
}

impl<'a, T: Real, const N: usize> Traversal<'a, T, N> {
    pub fn new(periodic_box: &'a PeriodicBox<T, N>, cell_list: &'a CellList<T, N>) -> Result<Traversal<'a, T, N>, Error> {
        cell_list.check_box(periodic_box)?;
        return Ok(Traversal {
            periodic_box: periodic_box,
            centers: cell_list.first(),
            others: cell_list.second(),
        });
    }

    /// Split the occupied cells into at most `n_batches` contiguous batches,
    /// containing approximately the same number of particles.
    pub fn batches(&self, n_batches: usize) -> Vec<&'a [usize]> {
        let centers = self.centers;
        let occupied = &centers.occupied[..];
        if occupied.is_empty() {
            return Vec::new();
        }

        let n_batches = n_batches.clamp(1, occupied.len());
        let count = |linear: usize| centers.starts[linear + 1] - centers.starts[linear];
        let total = occupied.iter().map(|&linear| count(linear)).sum::<usize>();

        let mut batches = Vec::with_capacity(n_batches);
        let mut start = 0;
        let mut accumulated = 0;
        for (i, &linear) in occupied.iter().enumerate() {
            accumulated += count(linear);

            let remaining_batches = n_batches - batches.len() - 1;
            if remaining_batches == 0 {
                break;
            }

            // each batch must contain at least one cell
            let remaining_cells = occupied.len() - i - 1;
            if accumulated * n_batches >= total * (batches.len() + 1) || remaining_cells == remaining_batches {
                batches.push(&occupied[start..=i]);
                start = i + 1;
            }
        }
        batches.push(&occupied[start..]);

        trace!(
            "split {} occupied cells containing {} particles in {} batches",
            occupied.len(), total, batches.len()
        );

        return batches;
    }

    /// Visit all the pairs with a first particle in the given `cells`, calling
    /// `visit` with an accumulator and each pair. Stops early (returning the
    /// current accumulator) when `abort` is set by another batch.
    pub fn fold<A, E, G>(&self, cells: &[usize], init: A, abort: Option<&AtomicBool>, mut visit: G) -> Result<A, E>
        where G: FnMut(A, &Pair<T, N>) -> Result<A, E>
    {
        let mut accumulator = init;
        for &linear in cells {
            if abort.is_some_and(|abort| abort.load(Ordering::Relaxed)) {
                return Ok(accumulator);
            }

            let centers = self.centers.cell(linear);
            if let Some(others) = self.others {
                for &offset in self.periodic_box.full_stencil() {
                    for center in centers {
                        for other in others.cell(neighbor(linear, offset)) {
                            accumulator = self.cross_pair(accumulator, center, other, others, &mut visit)?;
                        }
                    }
                }
            } else {
                for (slot, first) in centers.iter().enumerate() {
                    for second in &centers[slot + 1..] {
                        accumulator = self.single_pair(accumulator, first, second, &mut visit)?;
                    }
                }

                for &offset in self.periodic_box.half_stencil() {
                    let neighbors = self.centers.cell(neighbor(linear, offset));
                    for center in centers {
                        for other in neighbors {
                            accumulator = self.single_pair(accumulator, center, other, &mut visit)?;
                        }
                    }
                }
            }
        }

        return Ok(accumulator);
    }

    /// Call `visit` for all the pairs with a first particle in the given
    /// `cells`
    pub fn for_each<G>(&self, cells: &[usize], mut visit: G) where G: FnMut(&Pair<T, N>) {
        let result = self.fold(cells, (), None, |(), pair| {
            visit(pair);
            Ok::<(), Infallible>(())
        });

        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Pair between a `center` particle in a real cell and `other`, which can
    /// be a periodic image. The pair is oriented from the particle with the
    /// smallest index to the other one.
    #[inline]
    fn single_pair<A, E, G>(&self, accumulator: A, center: &Entry<T, N>, other: &Entry<T, N>, visit: &mut G) -> Result<A, E>
        where G: FnMut(A, &Pair<T, N>) -> Result<A, E>
    {
        if center.index == other.index {
            // a particle and its own periodic image
            return Ok(accumulator);
        }

        let wrapped = &self.centers.wrapped;
        if center.index < other.index {
            let candidate = Candidate {
                first: center.index,
                second: other.index,
                shift: other.shift,
                x: center.position,
                displacement: other.position - center.position,
                second_wrapped: wrapped[other.index],
            };
            return self.accept(accumulator, candidate, visit);
        } else {
            let candidate = Candidate {
                first: other.index,
                second: center.index,
                shift: other.shift.map(|s| -s),
                x: wrapped[other.index],
                displacement: center.position - other.position,
                second_wrapped: center.position,
            };
            return self.accept(accumulator, candidate, visit);
        }
    }

    /// Pair between a `center` particle from the first set and `other` (or
    /// one of its periodic images) from the second set
    #[inline]
    fn cross_pair<A, E, G>(
        &self,
        accumulator: A,
        center: &Entry<T, N>,
        other: &Entry<T, N>,
        others: &CellStorage<T, N>,
        visit: &mut G,
    ) -> Result<A, E>
        where G: FnMut(A, &Pair<T, N>) -> Result<A, E>
    {
        let candidate = Candidate {
            first: center.index,
            second: other.index,
            shift: other.shift,
            x: center.position,
            displacement: other.position - center.position,
            second_wrapped: others.wrapped[other.index],
        };
        return self.accept(accumulator, candidate, visit);
    }

    /// Check the distance of a candidate pair against the cutoff, and call
    /// `visit` if it should be included.
    #[inline]
    fn accept<A, E, G>(&self, accumulator: A, candidate: Candidate<T, N>, visit: &mut G) -> Result<A, E>
        where G: FnMut(A, &Pair<T, N>) -> Result<A, E>
    {
        let cutoff2 = self.periodic_box.cutoff2();
        let image_shifts = self.periodic_box.image_shifts();

        if image_shifts.is_empty() {
            let distance2 = candidate.displacement.norm2();
            if distance2 > cutoff2 {
                return Ok(accumulator);
            }

            let pair = Pair {
                first: candidate.first,
                second: candidate.second,
                x: candidate.x,
                y: candidate.x + candidate.displacement,
                distance2: distance2,
            };
            return visit(accumulator, &pair);
        }

        // Multiple periodic images of the second particle can be within the
        // cutoff of the first one, only the closest one gives a pair. All the
        // images are compared using the same expression, so that exactly one
        // of them is accepted, the one with the smallest shift in lexicographic
        // order in case of ties.
        let unit_cell = self.periodic_box.unit_cell();
        let base = candidate.second_wrapped - candidate.x;
        let displacement = base + unit_cell.translation(candidate.shift);
        let distance2 = displacement.norm2();
        if distance2 > cutoff2 {
            return Ok(accumulator);
        }

        for image_shift in image_shifts {
            let mut shift = candidate.shift;
            for axis in 0..N {
                shift[axis] += image_shift[axis];
            }

            let other_distance2 = (base + unit_cell.translation(shift)).norm2();
            if other_distance2 < distance2 {
                return Ok(accumulator);
            }

            if other_distance2 == distance2 && !is_lexicographically_positive(image_shift) {
                return Ok(accumulator);
            }
        }

        let pair = Pair {
            first: candidate.first,
            second: candidate.second,
            x: candidate.x,
            y: candidate.x + displacement,
            distance2: distance2,
        };
        return visit(accumulator, &pair);
    }
}

/// A possible pair, before checking the distance
struct Candidate<T, const N: usize> {
    first: usize,
    second: usize,
    /// lattice shift from the wrapped position of `second` to the image
    /// considered for this pair
    shift: [i32; N],
    /// wrapped position of `first`
    x: Vector<T, N>,
    /// displacement from `first` to the image of `second`
    displacement: Vector<T, N>,
    /// wrapped position of `second`
    second_wrapped: Vector<T, N>,
}

#[inline]
fn neighbor(linear: usize, offset: isize) -> usize {
    debug_assert!(linear as isize + offset >= 0);
    (linear as isize + offset) as usize
}

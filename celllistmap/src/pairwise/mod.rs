//! Mapping a function over all the pairs of particles closer than a cutoff.
//!
//! The main entry point is [`map_pairwise`], calling a function for all the
//! pairs in a [`CellList`] and accumulating the results in an output value.
//! The work is split in batches of cells, running in parallel on rayon's
//! thread pool, each batch accumulating in its own copy of the output. The
//! partial outputs are then merged with a [`Reducer`].

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::{CellList, Error, PeriodicBox, Real, UnitCell, Vector};
use crate::options::MapOptions;

mod reduce;
pub use self::reduce::{Reduce, Reducer, Additive, BoundedPairList};

mod traversal;
use self::traversal::Traversal;

/// A pair of particles closer than the cutoff.
///
/// In a single-set cell list, `first < second` and both are indexes in the
/// set of positions. In a cross-set cell list, `first` is an index in the
/// first set and `second` an index in the second set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pair<T, const N: usize> {
    /// Index of the first particle
    pub first: usize,
    /// Index of the second particle
    pub second: usize,
    /// Position of the first particle, wrapped inside the unit cell
    pub x: Vector<T, N>,
    /// Position of the image of the second particle closest to `x`. This is
    /// not necessarily inside the unit cell.
    pub y: Vector<T, N>,
    /// Squared distance between `x` and `y`
    pub distance2: T,
}

impl<T: Real, const N: usize> Pair<T, N> {
    /// Get the distance between the two particles
    pub fn distance(&self) -> T {
        self.distance2.sqrt()
    }

    /// Get the minimum image displacement vector from the first to the second
    /// particle, i.e. `y - x`
    pub fn displacement(&self) -> Vector<T, N> {
        self.y - self.x
    }
}

/// Call `function` for all pairs closer than the cutoff in `cell_list`,
/// accumulating results in `output`.
///
/// `function` receives each pair once, together with the current value of
/// the output, and must return the updated output. Pairs are visited in an
/// unspecified order, so the way `function` updates the output should not
/// depend on this order.
///
/// This uses the default [`MapOptions`] and the [`Additive`] reduction: the
/// pairs are split between multiple batches, each one starting from a zero
/// copy of the output, and the partial results are added together (and to
/// the initial `output`).
///
/// ```
/// # use celllistmap::{UnitCell, PeriodicBox, CellList, map_pairwise};
/// let unit_cell = UnitCell::cubic(10.0)?;
/// let periodic_box = PeriodicBox::new(unit_cell, 1.5)?;
///
/// let positions = [[0.5, 0.5, 0.5], [9.5, 0.5, 0.5], [5.0, 5.0, 5.0]];
/// let cell_list = CellList::new(&positions, &periodic_box)?;
///
/// let n_pairs = map_pairwise(|_, count: usize| count + 1, 0, &periodic_box, &cell_list)?;
/// assert_eq!(n_pairs, 1);
/// # Ok::<(), celllistmap::Error>(())
/// ```
pub fn map_pairwise<T, const N: usize, O, F>(
    function: F,
    output: O,
    periodic_box: &PeriodicBox<T, N>,
    cell_list: &CellList<T, N>,
) -> Result<O, Error> where
    T: Real,
    O: Reduce,
    F: Fn(&Pair<T, N>, O) -> O + Sync,
{
    return map_pairwise_with(function, output, periodic_box, cell_list, Additive, MapOptions::default());
}

/// Same as [`map_pairwise`], with a custom `reducer` and `options`.
///
/// Custom reducers are typically closures `Fn(&mut O, O)`, merging a partial
/// output into the accumulated one. With a closure, every batch starts from
/// a clone of the initial `output`.
pub fn map_pairwise_with<T, const N: usize, O, F, R>(
    function: F,
    output: O,
    periodic_box: &PeriodicBox<T, N>,
    cell_list: &CellList<T, N>,
    reducer: R,
    options: MapOptions,
) -> Result<O, Error> where
    T: Real,
    O: Clone + Send,
    F: Fn(&Pair<T, N>, O) -> O + Sync,
    R: Reducer<O>,
{
    return map_batches(
        |output, pair| Ok(function(pair, output)),
        output, periodic_box, cell_list, &reducer, options,
    );
}

/// Same as [`map_pairwise_with`], for a `function` that can fail.
///
/// The first error returned by `function` stops the whole mapping, and is
/// returned as [`Error::Callback`].
pub fn try_map_pairwise<T, const N: usize, O, F, E, R>(
    function: F,
    output: O,
    periodic_box: &PeriodicBox<T, N>,
    cell_list: &CellList<T, N>,
    reducer: R,
    options: MapOptions,
) -> Result<O, Error> where
    T: Real,
    O: Clone + Send,
    F: Fn(&Pair<T, N>, O) -> Result<O, E> + Sync,
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    R: Reducer<O>,
{
    return map_batches(
        |output, pair| function(pair, output).map_err(|error| Error::Callback(error.into())),
        output, periodic_box, cell_list, &reducer, options,
    );
}

/// Call `function` for all pairs closer than the cutoff in `cell_list`,
/// updating `output` in place.
///
/// This is useful for large outputs (for example forces on all particles),
/// since the first batch directly updates `output` without making a copy.
/// The other batches update a zero copy of the output, which is then added
/// to `output`. This returns `output` to allow chaining calls.
///
/// If `function` panics, the panic is propagated to the caller and `output`
/// is left in an unspecified state.
pub fn map_pairwise_in_place<'o, T, const N: usize, O, F>(
    function: F,
    output: &'o mut O,
    periodic_box: &PeriodicBox<T, N>,
    cell_list: &CellList<T, N>,
) -> Result<&'o mut O, Error> where
    T: Real,
    O: Reduce,
    F: Fn(&Pair<T, N>, &mut O) + Sync,
{
    return map_pairwise_in_place_with(function, output, periodic_box, cell_list, Additive, MapOptions::default());
}

/// Same as [`map_pairwise_in_place`], with a custom `reducer` and `options`.
#[time_graph::instrument(name = "map_pairwise_in_place")]
pub fn map_pairwise_in_place_with<'o, T, const N: usize, O, F, R>(
    function: F,
    output: &'o mut O,
    periodic_box: &PeriodicBox<T, N>,
    cell_list: &CellList<T, N>,
    reducer: R,
    options: MapOptions,
) -> Result<&'o mut O, Error> where
    T: Real,
    O: Clone + Send,
    F: Fn(&Pair<T, N>, &mut O) + Sync,
    R: Reducer<O>,
{
    let traversal = Traversal::new(periodic_box, cell_list)?;
    let batches = traversal.batches(options.n_batches()?);
    let (first, others) = match batches.split_first() {
        Some(split) => split,
        None => return Ok(output),
    };

    let mut copies = Vec::with_capacity(others.len());
    for _ in 0..others.len() {
        let mut copy = output.clone();
        reducer.prepare(&mut copy);
        copies.push(copy);
    }

    let mut run_first = || {
        traversal.for_each(first, |pair| function(pair, &mut *output));
    };

    let run_others = |(mut copy, cells): (O, &&[usize])| -> O {
        traversal.for_each(cells, |pair| function(pair, &mut copy));
        copy
    };

    let partials = if options.parallel {
        let ((), partials) = rayon::join(run_first, || {
            copies.into_par_iter()
                .zip(others.par_iter())
                .map(run_others)
                .collect::<Vec<_>>()
        });
        partials
    } else {
        run_first();
        copies.into_iter()
            .zip(others.iter())
            .map(run_others)
            .collect::<Vec<_>>()
    };

    for partial in partials {
        reducer.reduce(output, partial);
    }

    return Ok(output);
}

/// Run `visit` over all the batches of cells, and merge the partial outputs
/// in batch order
#[time_graph::instrument(name = "map_pairwise")]
fn map_batches<T, const N: usize, O, G, R>(
    visit: G,
    output: O,
    periodic_box: &PeriodicBox<T, N>,
    cell_list: &CellList<T, N>,
    reducer: &R,
    options: MapOptions,
) -> Result<O, Error> where
    T: Real,
    O: Clone + Send,
    G: Fn(O, &Pair<T, N>) -> Result<O, Error> + Sync,
    R: Reducer<O>,
{
    let traversal = Traversal::new(periodic_box, cell_list)?;
    let batches = traversal.batches(options.n_batches()?);
    let (first, others) = match batches.split_first() {
        Some(split) => split,
        None => return Ok(output),
    };

    let mut copies = Vec::with_capacity(others.len());
    for _ in 0..others.len() {
        let mut copy = output.clone();
        reducer.prepare(&mut copy);
        copies.push(copy);
    }

    let abort = AtomicBool::new(false);
    let run = |start: O, cells: &[usize]| -> Result<O, Error> {
        let result = traversal.fold(cells, start, Some(&abort), &visit);
        if result.is_err() {
            // stop the other batches early
            abort.store(true, Ordering::Relaxed);
        }
        result
    };

    let (first_result, partials) = if options.parallel {
        rayon::join(|| run(output, *first), || {
            copies.into_par_iter()
                .zip(others.par_iter())
                .map(|(copy, cells)| run(copy, *cells))
                .collect::<Result<Vec<_>, _>>()
        })
    } else {
        let first_result = run(output, *first);
        let partials = copies.into_iter()
            .zip(others.iter())
            .map(|(copy, cells)| run(copy, *cells))
            .collect::<Result<Vec<_>, _>>();
        (first_result, partials)
    };

    let mut output = first_result?;
    for partial in partials? {
        reducer.reduce(&mut output, partial);
    }

    return Ok(output);
}

/// Call `function` for all pairs of particles closer than `cutoff`, by
/// checking all the pairs with the minimum image convention.
///
/// This is much slower than [`map_pairwise`] for anything but very small
/// systems, and is mainly useful as a reference implementation. The pairs
/// are visited in order, with `first < second`.
pub fn map_pairwise_naive<T, const N: usize, O, F>(
    mut function: F,
    output: O,
    unit_cell: &UnitCell<T, N>,
    cutoff: T,
    positions: &[[T; N]],
) -> Result<O, Error> where
    T: Real,
    F: FnMut(&Pair<T, N>, O) -> O,
{
    if !cutoff.is_finite() || cutoff <= T::zero() {
        return Err(Error::InvalidGeometry(format!(
            "cutoff must be a positive number, got {:?}", cutoff
        )));
    }

    if positions.is_empty() {
        return Err(Error::EmptyInput("positions does not contain any particle".into()));
    }

    let mut wrapped = Vec::with_capacity(positions.len());
    for (index, &position) in positions.iter().enumerate() {
        let position = Vector::new(position);
        if !position.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "position of particle {} is not finite: {:?}", index, position.0
            )));
        }
        wrapped.push(unit_cell.wrap(position));
    }

    let cutoff2 = cutoff * cutoff;
    let mut output = output;
    for first in 0..wrapped.len() {
        for second in (first + 1)..wrapped.len() {
            let displacement = unit_cell.minimum_image(wrapped[second] - wrapped[first]);
            let distance2 = displacement.norm2();
            if distance2 <= cutoff2 {
                let pair = Pair {
                    first: first,
                    second: second,
                    x: wrapped[first],
                    y: wrapped[first] + displacement,
                    distance2: distance2,
                };
                output = function(&pair, output);
            }
        }
    }

    return Ok(output);
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn setup() -> (PeriodicBox<f64, 2>, CellList<f64, 2>) {
        let periodic_box = PeriodicBox::new(UnitCell::orthorhombic([10.0, 8.0]).unwrap(), 1.6).unwrap();
        let mut positions = Vec::new();
        for i in 0..20 {
            for j in 0..16 {
                positions.push([0.5 * i as f64 + 0.1, 0.5 * j as f64 + 0.2]);
            }
        }
        let cell_list = CellList::new(&positions, &periodic_box).unwrap();
        return (periodic_box, cell_list);
    }

    #[test]
    fn pair() {
        let pair = Pair {
            first: 0,
            second: 3,
            x: Vector::new([1.0, 1.0]),
            y: Vector::new([4.0, 5.0]),
            distance2: 25.0,
        };
        assert_eq!(pair.distance(), 5.0);
        assert_eq!(pair.displacement(), Vector::new([3.0, 4.0]));
    }

    #[test]
    fn count_pairs() {
        let (periodic_box, cell_list) = setup();
        let positions = cell_list.wrapped_positions().iter().map(|p| p.0).collect::<Vec<_>>();

        let expected = map_pairwise_naive(|_, n: usize| n + 1, 0, periodic_box.unit_cell(), periodic_box.cutoff(), &positions).unwrap();
        let n_pairs = map_pairwise(|_, n: usize| n + 1, 0, &periodic_box, &cell_list).unwrap();
        assert_eq!(n_pairs, expected);

        // the initial value is only counted once with additive reductions
        let n_pairs = map_pairwise(|_, n: usize| n + 1, 10, &periodic_box, &cell_list).unwrap();
        assert_eq!(n_pairs, expected + 10);
    }

    #[test]
    fn batches_and_reducers() {
        let (periodic_box, cell_list) = setup();

        let sum_distances = |pair: &Pair<f64, 2>, sum: f64| sum + pair.distance();
        let reference = map_pairwise_with(
            sum_distances, 0.0, &periodic_box, &cell_list, Additive, MapOptions::serial()
        ).unwrap();

        for n_batches in [1, 2, 3, 7] {
            let serial = MapOptions { parallel: false, n_batches: Some(n_batches) };
            let parallel = MapOptions { parallel: true, n_batches: Some(n_batches) };

            let serial = map_pairwise_with(sum_distances, 0.0, &periodic_box, &cell_list, Additive, serial).unwrap();
            let parallel = map_pairwise_with(sum_distances, 0.0, &periodic_box, &cell_list, Additive, parallel).unwrap();
            assert_eq!(serial, parallel);
            assert_relative_eq!(serial, reference, max_relative = 1e-12);
        }

        // custom reducers get a clone of the initial output in all batches
        let options = MapOptions { parallel: true, n_batches: Some(4) };
        let max_distance = |pair: &Pair<f64, 2>, max: f64| f64::max(max, pair.distance());
        let maximum = |output: &mut f64, partial: f64| *output = f64::max(*output, partial);
        let max = map_pairwise_with(max_distance, -1.0, &periodic_box, &cell_list, maximum, options).unwrap();
        assert!(max > 1.5 && max <= 1.6);

        let options = MapOptions { parallel: true, n_batches: Some(0) };
        let error = map_pairwise_with(max_distance, 0.0, &periodic_box, &cell_list, maximum, options).unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));
    }

    #[test]
    fn in_place() {
        let (periodic_box, cell_list) = setup();
        let n_particles = cell_list.n_particles();

        let count_neighbors = |pair: &Pair<f64, 2>, counts: &mut Vec<usize>| {
            counts[pair.first] += 1;
            counts[pair.second] += 1;
        };

        let mut counts = vec![0; n_particles];
        map_pairwise_in_place(count_neighbors, &mut counts, &periodic_box, &cell_list).unwrap();

        // all particles are on a regular grid with spacing 0.5, and have the
        // same number of neighbors: 36 points of the grid are within 1.6
        assert!(counts.iter().all(|&count| count == 36));

        let options = MapOptions { parallel: false, n_batches: Some(3) };
        let mut serial = vec![0; n_particles];
        map_pairwise_in_place_with(count_neighbors, &mut serial, &periodic_box, &cell_list, Additive, options)
            .unwrap()
            .iter_mut()
            .for_each(|count| *count *= 2);
        assert!(serial.iter().all(|&count| count == 72));
    }

    #[test]
    fn callback_errors() {
        let (periodic_box, cell_list) = setup();

        let options = MapOptions { parallel: true, n_batches: Some(4) };
        let error = try_map_pairwise(
            |pair: &Pair<f64, 2>, count: usize| {
                if pair.first == 42 {
                    Err(format!("bad particle {}", pair.first))
                } else {
                    Ok(count + 1)
                }
            },
            0, &periodic_box, &cell_list, Additive, options,
        ).unwrap_err();
        assert_eq!(error.to_string(), "error in callback: bad particle 42");

        let count = try_map_pairwise(
            |_: &Pair<f64, 2>, count: usize| Ok::<_, Error>(count + 1),
            0, &periodic_box, &cell_list, Additive, options,
        ).unwrap();
        assert_eq!(count, map_pairwise(|_, n: usize| n + 1, 0, &periodic_box, &cell_list).unwrap());
    }

    #[test]
    fn naive() {
        let unit_cell = UnitCell::orthorhombic([10.0, 10.0]).unwrap();
        let positions = [[0.5, 0.5], [9.5, 0.5], [5.0, 5.0], [5.0, 5.5]];

        let pairs = map_pairwise_naive(|pair, mut pairs: Vec<(usize, usize, f64)>| {
            pairs.push((pair.first, pair.second, pair.distance2));
            pairs
        }, Vec::new(), &unit_cell, 1.5, &positions).unwrap();
        assert_eq!(pairs, [(0, 1, 1.0), (2, 3, 0.25)]);

        let error = map_pairwise_naive(|_, n: usize| n, 0, &unit_cell, 1.5, &[]).unwrap_err();
        assert!(matches!(error, Error::EmptyInput(_)));
        let error = map_pairwise_naive(|_, n: usize| n, 0, &unit_cell, -1.5, &positions).unwrap_err();
        assert!(matches!(error, Error::InvalidGeometry(_)));
    }
}

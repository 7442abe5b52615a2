use std::cmp::Ordering;
use std::ops::AddAssign;

use ndarray::{Array, Dimension};
use num_traits::Zero;

use crate::{Error, Real, Vector};

/// Types that can be used as the output of an additive pairwise mapping.
///
/// When splitting the work between multiple batches, each batch accumulates
/// pairs in its own copy of the output, starting from the identity value (see
/// [`Reduce::reset`]); the partial outputs are then merged into the final
/// output with [`Reduce::reduce`].
///
/// The merge must give the same result regardless of the order in which
/// partial outputs are merged (up to floating point rounding).
pub trait Reduce: Clone + Send {
    /// Set this value to the identity of the reduction (zero for sums, an
    /// empty list for lists, ...)
    fn reset(&mut self);
    /// Merge `partial` into this value
    fn reduce(&mut self, partial: Self);
}

macro_rules! impl_reduce_for_number {
    ($($type: ty),*) => {$(
        impl Reduce for $type {
            #[inline]
            fn reset(&mut self) {
                *self = <$type as Zero>::zero();
            }

            #[inline]
            fn reduce(&mut self, partial: Self) {
                *self += partial;
            }
        }
    )*};
}

impl_reduce_for_number!(f32, f64, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<T: Real, const N: usize> Reduce for Vector<T, N> {
    fn reset(&mut self) {
        *self = Vector::zero();
    }

    fn reduce(&mut self, partial: Self) {
        *self += partial;
    }
}

impl<R: Reduce> Reduce for Vec<R> {
    fn reset(&mut self) {
        for value in self {
            value.reset();
        }
    }

    fn reduce(&mut self, partial: Self) {
        let mut partial = partial.into_iter();
        for (value, other) in self.iter_mut().zip(&mut partial) {
            value.reduce(other);
        }
        self.extend(partial);
    }
}

impl<R: Reduce, const K: usize> Reduce for [R; K] {
    fn reset(&mut self) {
        for value in self {
            value.reset();
        }
    }

    fn reduce(&mut self, partial: Self) {
        for (value, other) in self.iter_mut().zip(partial) {
            value.reduce(other);
        }
    }
}

macro_rules! impl_reduce_for_tuple {
    ($(($($name: ident: $index: tt),+)),*) => {$(
        impl<$($name: Reduce),+> Reduce for ($($name,)+) {
            fn reset(&mut self) {
                $(self.$index.reset();)+
            }

            fn reduce(&mut self, partial: Self) {
                $(self.$index.reduce(partial.$index);)+
            }
        }
    )*};
}

impl_reduce_for_tuple!(
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3)
);

impl<A, D> Reduce for Array<A, D> where
    A: Clone + Zero + AddAssign + Send,
    D: Dimension,
{
    fn reset(&mut self) {
        self.fill(A::zero());
    }

    fn reduce(&mut self, partial: Self) {
        *self += &partial;
    }
}

/// Strategy used to merge the partial outputs of different batches.
///
/// This is implemented by [`Additive`] for all types implementing
/// [`Reduce`], and by any closure `Fn(&mut O, O)` merging a partial output
/// into the accumulated one.
pub trait Reducer<O>: Sync {
    /// Prepare the copy of the initial output given to a batch other than
    /// the first one. The first batch always starts from the initial output
    /// itself. The default implementation keeps the copy unchanged.
    fn prepare(&self, copy: &mut O) {
        let _ = copy;
    }

    /// Merge `partial` into `output`
    fn reduce(&self, output: &mut O, partial: O);
}

/// Default reduction, merging partial outputs with [`Reduce::reduce`].
///
/// Batches other than the first one start from a [reset](Reduce::reset)
/// copy of the initial output, so that the initial value is only counted
/// once in the final output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Additive;

impl<O: Reduce> Reducer<O> for Additive {
    fn prepare(&self, copy: &mut O) {
        copy.reset();
    }

    fn reduce(&self, output: &mut O, partial: O) {
        output.reduce(partial);
    }
}

/// Custom reduction. Batches other than the first start from a clone of the
/// initial output, which the closure is responsible for handling.
impl<O, F> Reducer<O> for F where F: Fn(&mut O, O) + Sync {
    fn reduce(&self, output: &mut O, partial: O) {
        self(output, partial);
    }
}

/// A list of at most `k` pairs, keeping the pairs with the smallest
/// distances.
///
/// Each entry is `(first, second, distance)`, and the entries are kept sorted
/// by increasing distance. Pairs with the same distance stay in insertion
/// order. Merging two lists (with [`Reduce::reduce`]) inserts all the
/// entries of the partial list one by one, so the result still contains the
/// `k` smallest pairs of both lists.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedPairList<T> {
    k: usize,
    pairs: Vec<(usize, usize, T)>,
}

impl<T: Real> BoundedPairList<T> {
    /// Create an empty list keeping at most `k` pairs
    pub fn new(k: usize) -> Result<BoundedPairList<T>, Error> {
        if k == 0 {
            return Err(Error::InvalidParameter(
                "a bounded pair list must be able to contain at least one pair".into()
            ));
        }

        return Ok(BoundedPairList {
            k: k,
            pairs: Vec::with_capacity(k),
        });
    }

    /// Maximal number of pairs in this list
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of pairs currently in this list
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Is this list empty?
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Get the pairs in this list, sorted by increasing distance
    pub fn pairs(&self) -> &[(usize, usize, T)] {
        &self.pairs
    }

    /// Get the largest distance in this list, if the list is full. Pairs
    /// with a larger distance will not be inserted.
    pub fn worst(&self) -> Option<T> {
        if self.pairs.len() == self.k {
            self.pairs.last().map(|pair| pair.2)
        } else {
            None
        }
    }

    /// Insert a new pair in this list, removing the pair with the largest
    /// distance if the list is full. Returns `true` if the pair was inserted.
    pub fn insert(&mut self, first: usize, second: usize, distance: T) -> bool {
        if let Some(worst) = self.worst() {
            if distance.partial_cmp(&worst) != Some(Ordering::Less) {
                return false;
            }
            self.pairs.pop();
        }

        let position = self.pairs.partition_point(|pair| pair.2 <= distance);
        self.pairs.insert(position, (first, second, distance));
        return true;
    }

    /// Remove all pairs from this list
    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}

impl<T: Real> Reduce for BoundedPairList<T> {
    fn reset(&mut self) {
        self.clear();
    }

    fn reduce(&mut self, partial: Self) {
        for (first, second, distance) in partial.pairs {
            self.insert(first, second, distance);
        }
    }
}

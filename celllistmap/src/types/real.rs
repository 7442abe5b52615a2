use std::fmt::Debug;
use std::ops::{Add, Sub, Mul, Div, Neg};
use std::ops::{AddAssign, SubAssign, MulAssign, DivAssign};

use num_traits::{Zero, One};

/// Scalar type usable for coordinates, cutoffs and squared distances.
///
/// The engine only ever adds, subtracts, multiplies, divides and compares
/// values of this type, so it can be implemented by types carrying more
/// than a plain number: dual numbers for automatic differentiation,
/// quantities with units, or values with propagated uncertainties. For such
/// types, [`Real::to_f64`] should return the "primal" value; it is only used
/// to decide in which cell of the grid a point belongs and to size the grid.
pub trait Real:
    Copy + Debug + Send + Sync + PartialOrd + 'static
    + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign + SubAssign + MulAssign + DivAssign
    + Zero + One
{
    /// Create a value of this type from a plain `f64`
    fn from_f64(value: f64) -> Self;

    /// Get the plain numeric value of `self`, dropping any additional
    /// information (derivatives, units, uncertainty)
    fn to_f64(self) -> f64;

    /// Square root of `self`
    fn sqrt(self) -> Self;

    /// Largest integer-valued `Self` less than or equal to `self`.
    ///
    /// The result is piecewise constant, so the default implementation drops
    /// any additional information attached to `self` (e.g. the derivative
    /// of dual numbers). Wrapping `x` in a cell of size `L` as
    /// `x - floor(x / L) * L` then keeps the derivatives of `x` and `L`.
    fn floor(self) -> Self {
        Self::from_f64(f64::floor(self.to_f64()))
    }

    /// Nearest integer-valued `Self`, rounding half-way cases away from zero
    fn round(self) -> Self {
        Self::from_f64(f64::round(self.to_f64()))
    }

    /// Check that the plain value is neither infinite nor NaN
    fn is_finite(self) -> bool {
        self.to_f64().is_finite()
    }
}

macro_rules! impl_real_for_float {
    ($($float: ty),+) => {
        $(
            impl Real for $float {
                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $float
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn sqrt(self) -> Self {
                    <$float>::sqrt(self)
                }

                #[inline]
                fn floor(self) -> Self {
                    <$float>::floor(self)
                }

                #[inline]
                fn round(self) -> Self {
                    <$float>::round(self)
                }

                #[inline]
                fn is_finite(self) -> bool {
                    <$float>::is_finite(self)
                }
            }
        )+
    };
}

impl_real_for_float!(f32, f64);

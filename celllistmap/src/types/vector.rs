use std::ops::{Add, Sub, Mul, Div, Neg, Index, IndexMut};
use std::ops::{AddAssign, SubAssign, MulAssign, DivAssign};

use super::Real;

/// A `N`-dimensional vector with components of type `T`, used for positions
/// and displacements.
///
/// Multiplying two vectors (`u * v`) gives the dot product, following the
/// usual convention in this crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector<T, const N: usize>(pub [T; N]);

impl<T: Real, const N: usize> Vector<T, N> {
    /// Create a vector from its components
    #[inline]
    pub fn new(components: [T; N]) -> Vector<T, N> {
        Vector(components)
    }

    /// Create a vector with all components set to zero
    #[inline]
    pub fn zero() -> Vector<T, N> {
        Vector([T::zero(); N])
    }

    /// Squared euclidean norm of this vector
    #[inline]
    pub fn norm2(&self) -> T {
        let mut norm2 = T::zero();
        for &value in &self.0 {
            norm2 += value * value;
        }
        return norm2;
    }

    /// Euclidean norm of this vector
    #[inline]
    pub fn norm(&self) -> T {
        self.norm2().sqrt()
    }

    /// Get the components of this vector as an array
    #[inline]
    pub fn into_array(self) -> [T; N] {
        self.0
    }

    /// Check if all components of this vector are finite
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl<T: Real, const N: usize> Default for Vector<T, N> {
    fn default() -> Self {
        Vector::zero()
    }
}

impl<T, const N: usize> From<[T; N]> for Vector<T, N> {
    #[inline]
    fn from(components: [T; N]) -> Self {
        Vector(components)
    }
}

impl<T, const N: usize> From<Vector<T, N>> for [T; N] {
    #[inline]
    fn from(vector: Vector<T, N>) -> Self {
        vector.0
    }
}

impl<T, const N: usize> AsRef<[T; N]> for Vector<T, N> {
    fn as_ref(&self) -> &[T; N] {
        &self.0
    }
}

impl<T, const N: usize> Index<usize> for Vector<T, N> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.0[index]
    }
}

impl<T, const N: usize> IndexMut<usize> for Vector<T, N> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.0[index]
    }
}

/// Implement component-wise `$Op` between two vectors, for all combinations
/// of values and references.
macro_rules! impl_componentwise {
    ($Op: ident, $op: ident, $OpAssign: ident, $op_assign: ident) => {
        impl<T: Real, const N: usize> $OpAssign<Vector<T, N>> for Vector<T, N> {
            #[inline]
            fn $op_assign(&mut self, other: Vector<T, N>) {
                for i in 0..N {
                    self.0[i].$op_assign(other.0[i]);
                }
            }
        }

        impl<'a, T: Real, const N: usize> $OpAssign<&'a Vector<T, N>> for Vector<T, N> {
            #[inline]
            fn $op_assign(&mut self, other: &'a Vector<T, N>) {
                self.$op_assign(*other);
            }
        }

        impl<T: Real, const N: usize> $Op<Vector<T, N>> for Vector<T, N> {
            type Output = Vector<T, N>;
            #[inline]
            fn $op(mut self, other: Vector<T, N>) -> Vector<T, N> {
                self.$op_assign(other);
                return self;
            }
        }

        impl<'a, T: Real, const N: usize> $Op<&'a Vector<T, N>> for Vector<T, N> {
            type Output = Vector<T, N>;
            #[inline]
            fn $op(mut self, other: &'a Vector<T, N>) -> Vector<T, N> {
                self.$op_assign(*other);
                return self;
            }
        }

        impl<'a, T: Real, const N: usize> $Op<Vector<T, N>> for &'a Vector<T, N> {
            type Output = Vector<T, N>;
            #[inline]
            fn $op(self, other: Vector<T, N>) -> Vector<T, N> {
                (*self).$op(other)
            }
        }

        impl<'a, 'b, T: Real, const N: usize> $Op<&'a Vector<T, N>> for &'b Vector<T, N> {
            type Output = Vector<T, N>;
            #[inline]
            fn $op(self, other: &'a Vector<T, N>) -> Vector<T, N> {
                (*self).$op(*other)
            }
        }
    };
}

impl_componentwise!(Add, add, AddAssign, add_assign);
impl_componentwise!(Sub, sub, SubAssign, sub_assign);

/// Implement `$Op` between a vector and a scalar
macro_rules! impl_scalar {
    ($Op: ident, $op: ident, $OpAssign: ident, $op_assign: ident) => {
        impl<T: Real, const N: usize> $OpAssign<T> for Vector<T, N> {
            #[inline]
            fn $op_assign(&mut self, other: T) {
                for value in &mut self.0 {
                    value.$op_assign(other);
                }
            }
        }

        impl<T: Real, const N: usize> $Op<T> for Vector<T, N> {
            type Output = Vector<T, N>;
            #[inline]
            fn $op(mut self, other: T) -> Vector<T, N> {
                self.$op_assign(other);
                return self;
            }
        }

        impl<'a, T: Real, const N: usize> $Op<T> for &'a Vector<T, N> {
            type Output = Vector<T, N>;
            #[inline]
            fn $op(self, other: T) -> Vector<T, N> {
                (*self).$op(other)
            }
        }
    };
}

impl_scalar!(Mul, mul, MulAssign, mul_assign);
impl_scalar!(Div, div, DivAssign, div_assign);

impl<T: Real, const N: usize> Neg for Vector<T, N> {
    type Output = Vector<T, N>;

    #[inline]
    fn neg(mut self) -> Vector<T, N> {
        for value in &mut self.0 {
            *value = -*value;
        }
        return self;
    }
}

// dot product
impl<T: Real, const N: usize> Mul<Vector<T, N>> for Vector<T, N> {
    type Output = T;

    #[inline]
    fn mul(self, other: Vector<T, N>) -> T {
        let mut dot = T::zero();
        for i in 0..N {
            dot += self.0[i] * other.0[i];
        }
        return dot;
    }
}

impl<'a, 'b, T: Real, const N: usize> Mul<&'a Vector<T, N>> for &'b Vector<T, N> {
    type Output = T;

    #[inline]
    fn mul(self, other: &'a Vector<T, N>) -> T {
        *self * *other
    }
}

impl<T, const N: usize> approx::AbsDiffEq for Vector<T, N> where T: approx::AbsDiffEq + Copy, T::Epsilon: Copy {
    type Epsilon = T::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        T::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| T::abs_diff_eq(a, b, epsilon))
    }
}

impl<T, const N: usize> approx::RelativeEq for Vector<T, N> where T: approx::RelativeEq + Copy, T::Epsilon: Copy {
    fn default_max_relative() -> Self::Epsilon {
        T::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| T::relative_eq(a, b, epsilon, max_relative))
    }
}

impl<T, const N: usize> approx::UlpsEq for Vector<T, N> where T: approx::UlpsEq + Copy, T::Epsilon: Copy {
    fn default_max_ulps() -> u32 {
        T::default_max_ulps()
    }

    fn ulps_eq(&self, other: &Self, epsilon: Self::Epsilon, max_ulps: u32) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| T::ulps_eq(a, b, epsilon, max_ulps))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_ulps_eq;

    use super::*;

    #[test]
    fn arithmetic() {
        let u = Vector::new([1.0_f64, 2.0, 3.0]);
        let v = Vector::new([4.0_f64, -5.0, 6.0]);

        assert_eq!(u + v, Vector::new([5.0, -3.0, 9.0]));
        assert_eq!(&u - &v, Vector::new([-3.0, 7.0, -3.0]));
        assert_eq!(u * 2.0, Vector::new([2.0, 4.0, 6.0]));
        assert_eq!(v / 2.0, Vector::new([2.0, -2.5, 3.0]));
        assert_eq!(-u, Vector::new([-1.0, -2.0, -3.0]));
        assert_eq!(u * v, 12.0);

        let mut w = u;
        w += v;
        w -= &u;
        assert_eq!(w, v);
        w *= 0.5;
        assert_eq!(w[1], -2.5);
    }

    #[test]
    fn norms() {
        let u = Vector::new([3.0_f32, 4.0]);
        assert_eq!(u.norm2(), 25.0);
        assert_eq!(u.norm(), 5.0);
        assert_eq!(Vector::<f64, 3>::zero().norm(), 0.0);

        assert!(u.is_finite());
        assert!(!Vector::new([1.0, f64::NAN]).is_finite());
    }

    #[test]
    fn approx() {
        let u = Vector::new([0.1 + 0.2, 1.0]);
        assert_ulps_eq!(u, Vector::new([0.3, 1.0]));
    }
}

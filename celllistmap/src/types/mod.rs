//! This module provides the numeric interface and the small fixed-size
//! vectors used in all other modules.

mod real;
pub use self::real::Real;

mod vector;
pub use self::vector::Vector;

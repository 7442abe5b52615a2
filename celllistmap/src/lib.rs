#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names, clippy::similar_names, clippy::too_many_lines)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Cell lists to compute properties depending on all pairs of particles
//! closer than a cutoff, in periodic systems.
//!
//! The typical workflow is to define the periodic [`UnitCell`], combine it
//! with a cutoff in a [`PeriodicBox`], sort the particles in a [`CellList`],
//! and finally call [`map_pairwise`] with a function accumulating the
//! contribution of each pair in an output value.

pub mod types;
pub use types::*;

mod errors;
pub use self::errors::Error;

mod geometry;
pub use self::geometry::{UnitCell, CellShape, PeriodicBox};

mod cell_list;
pub use self::cell_list::CellList;

mod options;
pub use self::options::MapOptions;

mod pairwise;
pub use self::pairwise::{Pair, Reduce, Reducer, Additive, BoundedPairList};
pub use self::pairwise::{map_pairwise, map_pairwise_with, try_map_pairwise};
pub use self::pairwise::{map_pairwise_in_place, map_pairwise_in_place_with};
pub use self::pairwise::map_pairwise_naive;

mod neighbors;
pub use self::neighbors::{neighbor_list, cross_neighbor_list};

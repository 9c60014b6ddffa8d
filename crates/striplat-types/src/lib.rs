//! Value types and pure index arithmetic for the cylinder lattice.

pub mod cell;
pub mod geometry;

pub use cell::{Cell, CellValue};
pub use geometry::{Direction, Geometry, Half, swap_capacity};

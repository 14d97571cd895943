//! Structural equality and edit-script diffing of arrays.

pub mod diff;
mod equal;
mod options;

pub use equal::{array_approx_equal, array_equal, slice_approx_equal, slice_equal};
pub use options::{DEFAULT_ABS_TOLERANCE, EqualOptions};

//! Arrays of the quiver columnar format: the shared physical description of
//! an array ([`ArrayData`]), typed read-only views over it ([`array`]),
//! append-only builders ([`builder`]), and the algorithms that combine and
//! compare arrays: dictionary encoding and unification ([`dictionary`]),
//! concatenation ([`concat`]), and equality and diff ([`compare`]).
//!
//! Arrays are immutable once built. Slicing, cloning and concatenation
//! share buffers by reference count instead of copying bytes wherever the
//! layout allows it.

pub mod array;
pub mod builder;
pub mod compare;
pub mod concat;
pub mod data;
pub mod dictionary;
pub mod marshal;
pub mod offset;

pub use array::{Array, ArrayRef, make_array};
pub use builder::{ArrayBuilder, make_builder};
pub use compare::{
    EqualOptions, array_approx_equal, array_equal, diff::diff, slice_approx_equal, slice_equal,
};
pub use concat::{concatenate, concatenate_data};
pub use data::{ArrayData, ArrayDataBuilder};
pub use marshal::MarshalValue;

pub use quiver_bytes::Buffer;
pub use quiver_format::{DataType, Field};

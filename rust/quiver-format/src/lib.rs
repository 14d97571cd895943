//! Logical type system of the quiver columnar format.
//!
//! [`DataType`] is the closed set of logical types an array can have.
//! Each type has a fixed physical [`layout`](crate::layout) that determines
//! how many buffers an array of that type carries and what they contain.
//! Native value representations (integers, `f16`, [`i256`], interval
//! records) live in [`native`], and user-defined types plug in through the
//! [`extension`] registry.

pub mod datatype;
pub mod decimal;
pub mod extension;
pub mod field;
pub mod bigint;
pub mod layout;
pub mod native;
pub mod temporal;

pub use datatype::{DataType, IntervalUnit, TimeUnit, TypeId, UnionMode};
pub use extension::{ExtensionRef, ExtensionType};
pub use field::{Field, FieldRef, Fields, UnionFields};
pub use half::f16;
pub use bigint::i256;
pub use layout::{BufferKind, DataTypeLayout};
pub use native::{IntervalDayTime, IntervalMonthDayNano, NativeType};

//! Append-only builders producing [`ArrayData`].
//!
//! Every builder implements [`ArrayBuilder`], so nested builders can own
//! their children as `Box<dyn ArrayBuilder>` and [`make_builder`] can
//! construct a builder for any [`DataType`]. Typed builders also expose an
//! inherent `finish` returning their concrete array.

use std::{any::Any, fmt::Debug};

use quiver_common::{Result, error::Error};
use quiver_format::{DataType, IntervalDayTime, IntervalMonthDayNano, IntervalUnit, i256};

use crate::{
    array::{ArrayRef, BinaryViewType, NULL_VALUE_STR, StringViewType, make_array},
    data::ArrayData,
};

mod boolean;
mod buffer;
mod byte;
mod byte_view;
mod dictionary;
mod extension;
mod fixed_size_binary;
mod fixed_size_list;
mod list;
mod list_view;
mod map;
mod null;
mod parse;
mod primitive;
mod run_end;
mod struct_builder;
mod union;
mod validity;

pub use boolean::BooleanBuilder;
pub use buffer::{BufferBuilder, OffsetsBuilder};
pub use byte::{
    BinaryBuilder, GenericByteBuilder, LargeBinaryBuilder, LargeStringBuilder, StringBuilder,
};
pub use byte_view::{BinaryViewBuilder, ByteViewBuilder, StringViewBuilder};
pub use dictionary::DictionaryBuilder;
pub use extension::ExtensionBuilder;
pub use fixed_size_binary::FixedSizeBinaryBuilder;
pub use fixed_size_list::FixedSizeListBuilder;
pub use list::{GenericListBuilder, LargeListBuilder, ListBuilder};
pub use list_view::{GenericListViewBuilder, LargeListViewBuilder, ListViewBuilder};
pub use map::MapBuilder;
pub use null::NullBuilder;
pub use primitive::*;
pub use run_end::RunEndEncodedBuilder;
pub use struct_builder::StructBuilder;
pub use union::UnionBuilder;
pub use validity::ValidityBuilder;

/// Common interface of all builders.
pub trait ArrayBuilder: Any + Debug + Send + Sync {
    /// Logical type of the arrays this builder produces.
    fn data_type(&self) -> &DataType;

    /// Number of slots appended since the last finish.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots that fit without reallocating.
    fn capacity(&self) -> usize;

    fn null_count(&self) -> usize;

    fn append_null(&mut self);

    fn append_nulls(&mut self, n: usize) {
        for _ in 0..n {
            self.append_null();
        }
    }

    /// Appends a valid slot holding the type's zero value (`0`, `""`,
    /// empty list, struct of empty values).
    fn append_empty_value(&mut self);

    fn append_empty_values(&mut self, n: usize) {
        for _ in 0..n {
            self.append_empty_value();
        }
    }

    /// Reserves room for `additional` more slots.
    fn reserve(&mut self, additional: usize);

    /// Grows the capacity to `len` slots, or drops slots past `len` when
    /// fewer are requested than were appended.
    fn resize(&mut self, len: usize);

    /// Produces the data of everything appended so far and resets the
    /// builder for reuse.
    fn finish_data(&mut self) -> ArrayData;

    /// Like [`finish_data`](Self::finish_data), wrapped as an array.
    fn finish(&mut self) -> ArrayRef {
        make_array(self.finish_data())
    }

    /// Parses the text form of one value and appends it. `"(null)"` appends
    /// a null.
    fn append_value_from_str(&mut self, s: &str) -> Result<()>;

    /// Appends one value given as a JSON document. Scalars accept JSON
    /// strings holding their text form as well as plain JSON numbers and
    /// booleans.
    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        match value {
            serde_json::Value::Null => {
                self.append_null();
                Ok(())
            }
            serde_json::Value::String(s) => self.append_value_from_str(s),
            other => self.append_value_from_str(&other.to_string()),
        }
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Downcasts a builder to its concrete type.
///
/// # Panics
///
/// Panics when `builder` is not a `B`.
pub fn downcast_builder_mut<B: ArrayBuilder>(builder: &mut dyn ArrayBuilder) -> &mut B {
    let data_type = builder.data_type().clone();
    builder.as_any_mut().downcast_mut::<B>().unwrap_or_else(|| {
        panic!(
            "cannot downcast {data_type} builder to {}",
            std::any::type_name::<B>()
        )
    })
}

/// Parses `s` as JSON and appends it through [`ArrayBuilder::append_json`].
/// Used by nested builders for their text form.
pub(crate) fn append_json_text(builder: &mut dyn ArrayBuilder, s: &str) -> Result<()> {
    if s == NULL_VALUE_STR {
        builder.append_null();
        return Ok(());
    }
    let value: serde_json::Value = serde_json::from_str(s)
        .map_err(|e| Error::parse(s, builder.data_type(), e.to_string()))?;
    builder.append_json(&value)
}

/// Creates an empty builder for arrays of `data_type`.
pub fn make_builder(data_type: &DataType) -> Box<dyn ArrayBuilder> {
    make_builder_with_capacity(data_type, 0)
}

/// Creates an empty builder for arrays of `data_type` with room for
/// `capacity` slots.
pub fn make_builder_with_capacity(data_type: &DataType, capacity: usize) -> Box<dyn ArrayBuilder> {
    macro_rules! primitive {
        ($t:ty) => {
            Box::new(PrimitiveBuilder::<$t>::with_capacity(capacity).with_data_type(data_type.clone()))
        };
    }

    match data_type {
        DataType::Null => Box::new(NullBuilder::new()),
        DataType::Boolean => Box::new(BooleanBuilder::with_capacity(capacity)),
        DataType::Int8 => primitive!(i8),
        DataType::Int16 => primitive!(i16),
        DataType::Int32
        | DataType::Date32
        | DataType::Time32(_)
        | DataType::Decimal32(..)
        | DataType::Interval(IntervalUnit::YearMonth) => primitive!(i32),
        DataType::Int64
        | DataType::Date64
        | DataType::Time64(_)
        | DataType::Timestamp(..)
        | DataType::Duration(_)
        | DataType::Decimal64(..) => primitive!(i64),
        DataType::UInt8 => primitive!(u8),
        DataType::UInt16 => primitive!(u16),
        DataType::UInt32 => primitive!(u32),
        DataType::UInt64 => primitive!(u64),
        DataType::Float16 => primitive!(half::f16),
        DataType::Float32 => primitive!(f32),
        DataType::Float64 => primitive!(f64),
        DataType::Interval(IntervalUnit::DayTime) => primitive!(IntervalDayTime),
        DataType::Interval(IntervalUnit::MonthDayNano) => primitive!(IntervalMonthDayNano),
        DataType::Decimal128(..) => primitive!(i128),
        DataType::Decimal256(..) => primitive!(i256),
        DataType::Utf8 => Box::new(StringBuilder::with_capacity(capacity, 0)),
        DataType::LargeUtf8 => Box::new(LargeStringBuilder::with_capacity(capacity, 0)),
        DataType::Binary => Box::new(BinaryBuilder::with_capacity(capacity, 0)),
        DataType::LargeBinary => Box::new(LargeBinaryBuilder::with_capacity(capacity, 0)),
        DataType::Utf8View => Box::new(ByteViewBuilder::<StringViewType>::with_capacity(capacity)),
        DataType::BinaryView => {
            Box::new(ByteViewBuilder::<BinaryViewType>::with_capacity(capacity))
        }
        DataType::FixedSizeBinary(width) => {
            Box::new(FixedSizeBinaryBuilder::with_capacity(*width, capacity))
        }
        DataType::List(field) => Box::new(ListBuilder::with_field(field.clone(), capacity)),
        DataType::LargeList(field) => {
            Box::new(LargeListBuilder::with_field(field.clone(), capacity))
        }
        DataType::ListView(field) => {
            Box::new(ListViewBuilder::with_field(field.clone(), capacity))
        }
        DataType::LargeListView(field) => {
            Box::new(LargeListViewBuilder::with_field(field.clone(), capacity))
        }
        DataType::FixedSizeList(field, size) => {
            Box::new(FixedSizeListBuilder::with_field(field.clone(), *size, capacity))
        }
        DataType::Struct(fields) => Box::new(StructBuilder::with_capacity(fields.clone(), capacity)),
        DataType::Map(..) => Box::new(MapBuilder::with_data_type(data_type.clone(), capacity)),
        DataType::Union(fields, mode) => {
            Box::new(UnionBuilder::with_capacity(fields.clone(), *mode, capacity))
        }
        DataType::Dictionary(..) => Box::new(DictionaryBuilder::new(data_type.clone())),
        DataType::RunEndEncoded(..) => Box::new(RunEndEncodedBuilder::new(data_type.clone())),
        DataType::Extension(ext) => Box::new(ExtensionBuilder::new(ext.clone())),
    }
}

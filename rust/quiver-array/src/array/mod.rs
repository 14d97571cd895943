//! Typed read-only views over [`ArrayData`].
//!
//! Every concrete array wraps one `ArrayData` and exposes typed accessors.
//! [`make_array`] picks the concrete array for a data's logical type.

use std::{any::Any, fmt, sync::Arc};

use quiver_format::{DataType, IntervalUnit, i256};

use crate::{data::ArrayData, marshal::MarshalValue};

mod boolean;
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
mod primitive;
mod run_end;
mod struct_array;
mod union;

pub use boolean::BooleanArray;
pub use byte::{
    BinaryArray, ByteArrayType, GenericBinaryType, GenericByteArray, GenericStringType,
    LargeBinaryArray, LargeStringArray, StringArray,
};
pub use byte_view::{
    BinaryViewArray, BinaryViewType, ByteView, ByteViewArray, ByteViewType, StringViewArray,
    StringViewType,
};
pub use dictionary::DictionaryArray;
pub use extension::ExtensionArray;
pub use fixed_size_binary::FixedSizeBinaryArray;
pub use fixed_size_list::FixedSizeListArray;
pub use list::{GenericListArray, LargeListArray, ListArray};
pub use list_view::{GenericListViewArray, LargeListViewArray, ListViewArray, range_of_values_used};
pub use map::MapArray;
pub use null::NullArray;
pub use primitive::*;
pub use run_end::RunEndEncodedArray;
pub(crate) use run_end::{
    find_physical_index, find_physical_length, find_physical_offset, run_end_at,
};
pub use struct_array::StructArray;
pub use union::UnionArray;

/// Text rendered for null slots.
pub const NULL_VALUE_STR: &str = "(null)";

pub type ArrayRef = Arc<dyn Array>;

/// Common interface of all arrays.
pub trait Array: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    fn data(&self) -> &ArrayData;

    /// Text form of the valid slot `i`.
    fn value_text(&self, i: usize) -> String;

    /// Marshalling form of the valid slot `i`.
    fn marshal_value(&self, i: usize) -> MarshalValue;

    fn to_data(&self) -> ArrayData {
        self.data().clone()
    }

    fn data_type(&self) -> &DataType {
        self.data().data_type()
    }

    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    fn offset(&self) -> usize {
        self.data().offset()
    }

    fn null_count(&self) -> usize {
        self.data().null_count()
    }

    fn is_null(&self, i: usize) -> bool {
        self.data().is_null(i)
    }

    fn is_valid(&self, i: usize) -> bool {
        !self.is_null(i)
    }

    /// Text form of slot `i`, `"(null)"` for nulls.
    fn value_str(&self, i: usize) -> String {
        if self.is_null(i) {
            NULL_VALUE_STR.to_string()
        } else {
            self.value_text(i)
        }
    }

    /// Value of slot `i` for external encoders, [`MarshalValue::Null`] for
    /// nulls.
    fn get_one_for_marshal(&self, i: usize) -> MarshalValue {
        if self.is_null(i) {
            MarshalValue::Null
        } else {
            self.marshal_value(i)
        }
    }

    /// How slot `i` appears in the `Display` form of the array.
    fn display_value(&self, i: usize) -> String {
        self.value_str(i)
    }

    /// Zero-copy slice `[i, j)`.
    fn slice(&self, i: usize, j: usize) -> ArrayRef {
        make_array(self.data().slice(i, j))
    }
}

impl fmt::Display for dyn Array + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for i in 0..self.len() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&self.display_value(i))?;
        }
        f.write_str("]")
    }
}

/// Downcasts `array` to the concrete array type `T`.
///
/// # Panics
///
/// Panics when `array` is not a `T`.
pub fn downcast_array<T: Array>(array: &dyn Array) -> &T {
    array.as_any().downcast_ref::<T>().unwrap_or_else(|| {
        panic!(
            "cannot downcast {} array to {}",
            array.data_type(),
            std::any::type_name::<T>()
        )
    })
}

/// Wraps `data` in the concrete array type of its logical type.
pub fn make_array(data: ArrayData) -> ArrayRef {
    match data.data_type() {
        DataType::Null => Arc::new(NullArray::from_data(data)),
        DataType::Boolean => Arc::new(BooleanArray::from_data(data)),
        DataType::Int8 => Arc::new(Int8Array::from_data(data)),
        DataType::Int16 => Arc::new(Int16Array::from_data(data)),
        DataType::Int32
        | DataType::Date32
        | DataType::Time32(_)
        | DataType::Decimal32(..)
        | DataType::Interval(IntervalUnit::YearMonth) => Arc::new(Int32Array::from_data(data)),
        DataType::Int64
        | DataType::Date64
        | DataType::Time64(_)
        | DataType::Timestamp(..)
        | DataType::Duration(_)
        | DataType::Decimal64(..) => Arc::new(Int64Array::from_data(data)),
        DataType::UInt8 => Arc::new(UInt8Array::from_data(data)),
        DataType::UInt16 => Arc::new(UInt16Array::from_data(data)),
        DataType::UInt32 => Arc::new(UInt32Array::from_data(data)),
        DataType::UInt64 => Arc::new(UInt64Array::from_data(data)),
        DataType::Float16 => Arc::new(Float16Array::from_data(data)),
        DataType::Float32 => Arc::new(Float32Array::from_data(data)),
        DataType::Float64 => Arc::new(Float64Array::from_data(data)),
        DataType::Interval(IntervalUnit::DayTime) => {
            Arc::new(IntervalDayTimeArray::from_data(data))
        }
        DataType::Interval(IntervalUnit::MonthDayNano) => {
            Arc::new(IntervalMonthDayNanoArray::from_data(data))
        }
        DataType::Decimal128(..) => Arc::new(PrimitiveArray::<i128>::from_data(data)),
        DataType::Decimal256(..) => Arc::new(PrimitiveArray::<i256>::from_data(data)),
        DataType::Utf8 => Arc::new(StringArray::from_data(data)),
        DataType::LargeUtf8 => Arc::new(LargeStringArray::from_data(data)),
        DataType::Binary => Arc::new(BinaryArray::from_data(data)),
        DataType::LargeBinary => Arc::new(LargeBinaryArray::from_data(data)),
        DataType::Utf8View => Arc::new(StringViewArray::from_data(data)),
        DataType::BinaryView => Arc::new(BinaryViewArray::from_data(data)),
        DataType::FixedSizeBinary(_) => Arc::new(FixedSizeBinaryArray::from_data(data)),
        DataType::List(_) => Arc::new(ListArray::from_data(data)),
        DataType::LargeList(_) => Arc::new(LargeListArray::from_data(data)),
        DataType::ListView(_) => Arc::new(ListViewArray::from_data(data)),
        DataType::LargeListView(_) => Arc::new(LargeListViewArray::from_data(data)),
        DataType::FixedSizeList(..) => Arc::new(FixedSizeListArray::from_data(data)),
        DataType::Struct(_) => Arc::new(StructArray::from_data(data)),
        DataType::Map(..) => Arc::new(MapArray::from_data(data)),
        DataType::Union(..) => Arc::new(UnionArray::from_data(data)),
        DataType::Dictionary(..) => Arc::new(DictionaryArray::from_data(data)),
        DataType::RunEndEncoded(..) => Arc::new(RunEndEncodedArray::from_data(data)),
        DataType::Extension(_) => Arc::new(ExtensionArray::from_data(data)),
    }
}

/// Marshal values of `array`, one per slot.
pub(crate) fn marshal_all(array: &dyn Array) -> Vec<MarshalValue> {
    (0..array.len()).map(|i| array.get_one_for_marshal(i)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_format::DataType;

    use super::*;

    #[test]
    fn test_make_array_dispatch() {
        let data = Int32Array::from_values(vec![1, 2, 3]).to_data();
        let date = make_array(data.with_data_type(DataType::Date32));
        assert_eq!(date.data_type(), &DataType::Date32);
        assert!(date.as_any().downcast_ref::<Int32Array>().is_some());
        assert_eq!(date.value_str(0), "1970-01-02");
    }

    #[test]
    fn test_display_and_nulls() {
        let array: ArrayRef = Arc::new(Int64Array::from_options(vec![Some(1), None, Some(3)]));
        assert_eq!(array.to_string(), "[1 (null) 3]");
        assert_eq!(array.value_str(1), NULL_VALUE_STR);
        assert!(array.get_one_for_marshal(1).is_null());
    }

    #[test]
    fn test_slice_through_trait() {
        let array: ArrayRef = Arc::new(StringArray::from(vec!["a", "b", "c"]));
        let slice = array.slice(1, 3);
        assert_eq!(slice.to_string(), r#"["b" "c"]"#);
        assert_eq!(slice.offset(), 1);
    }

    #[test]
    #[should_panic(expected = "cannot downcast")]
    fn test_bad_downcast_panics() {
        let array: ArrayRef = Arc::new(Int8Array::from_values(vec![1]));
        downcast_array::<StringArray>(array.as_ref());
    }
}

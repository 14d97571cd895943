//! Integer widths used for offsets, list-view sizes and run ends.

use num_traits::{FromPrimitive, PrimInt, ToPrimitive};
use quiver_bytes::Buffer;
use quiver_format::{DataType, NativeType};

/// Offset width of variable-length layouts: `i32` for the regular variants,
/// `i64` for the "large" ones.
pub trait OffsetSize: NativeType + PrimInt + FromPrimitive + ToPrimitive + Ord {
    const IS_LARGE: bool;
    const PREFIX: &'static str;

    /// Converts a non-negative offset to `usize`.
    #[inline]
    fn as_usize(self) -> usize {
        self.to_usize().unwrap_or_else(|| panic!("negative offset {self:?}"))
    }

    /// Converts `v` into an offset, `None` if it does not fit.
    #[inline]
    fn from_usize_checked(v: usize) -> Option<Self> {
        <Self as FromPrimitive>::from_usize(v)
    }
}

impl OffsetSize for i32 {
    const IS_LARGE: bool = false;
    const PREFIX: &'static str = "";
}

impl OffsetSize for i64 {
    const IS_LARGE: bool = true;
    const PREFIX: &'static str = "Large";
}

/// Whether `data_type` can hold run ends.
pub fn is_run_end_type(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Int16 | DataType::Int32 | DataType::Int64)
}

/// Whether `data_type` can hold dictionary indices.
pub fn is_dictionary_index_type(data_type: &DataType) -> bool {
    data_type.is_integer()
}

/// Reads the `i`-th value of a buffer of integers of type `data_type`,
/// widened to `i64`. Unsigned 64-bit values above `i64::MAX` wrap to
/// negative numbers, which every caller treats as out of range.
///
/// # Panics
///
/// Panics when `data_type` is not an integer type.
pub fn integer_value(data_type: &DataType, values: &Buffer, i: usize) -> i64 {
    match data_type {
        DataType::Int8 => values.typed_data::<i8>()[i] as i64,
        DataType::Int16 => values.typed_data::<i16>()[i] as i64,
        DataType::Int32 => values.typed_data::<i32>()[i] as i64,
        DataType::Int64 => values.typed_data::<i64>()[i],
        DataType::UInt8 => values.typed_data::<u8>()[i] as i64,
        DataType::UInt16 => values.typed_data::<u16>()[i] as i64,
        DataType::UInt32 => values.typed_data::<u32>()[i] as i64,
        DataType::UInt64 => values.typed_data::<u64>()[i] as i64,
        other => panic!("{other} is not an integer type"),
    }
}

/// Largest value representable by the integer type `data_type`.
pub fn integer_max(data_type: &DataType) -> Option<u64> {
    Some(match data_type {
        DataType::Int8 => i8::MAX as u64,
        DataType::Int16 => i16::MAX as u64,
        DataType::Int32 => i32::MAX as u64,
        DataType::Int64 => i64::MAX as u64,
        DataType::UInt8 => u8::MAX as u64,
        DataType::UInt16 => u16::MAX as u64,
        DataType::UInt32 => u32::MAX as u64,
        DataType::UInt64 => u64::MAX,
        _ => return None,
    })
}

/// Packs `values` into a buffer of integers of type `data_type`.
///
/// Values are narrowed with `as`; callers check that they fit.
///
/// # Panics
///
/// Panics when `data_type` is not an integer type.
pub fn integer_buffer(data_type: &DataType, values: impl Iterator<Item = i64>) -> Buffer {
    macro_rules! pack {
        ($t:ty) => {
            Buffer::from_typed_slice(&values.map(|v| v as $t).collect::<Vec<$t>>())
        };
    }
    match data_type {
        DataType::Int8 => pack!(i8),
        DataType::Int16 => pack!(i16),
        DataType::Int32 => pack!(i32),
        DataType::Int64 => pack!(i64),
        DataType::UInt8 => pack!(u8),
        DataType::UInt16 => pack!(u16),
        DataType::UInt32 => pack!(u32),
        DataType::UInt64 => pack!(u64),
        other => panic!("{other} is not an integer type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_conversions() {
        assert_eq!(OffsetSize::as_usize(5i32), 5);
        assert_eq!(<i32 as OffsetSize>::from_usize_checked(i32::MAX as usize), Some(i32::MAX));
        assert_eq!(<i32 as OffsetSize>::from_usize_checked(i32::MAX as usize + 1), None);
        assert_eq!(<i64 as OffsetSize>::from_usize_checked(1 << 40), Some(1 << 40));
        assert!(i64::IS_LARGE && !i32::IS_LARGE);
    }

    #[test]
    #[should_panic(expected = "negative offset")]
    fn test_negative_offset_panics() {
        OffsetSize::as_usize(-1i64);
    }

    #[test]
    fn test_integer_value_widening() {
        let buffer = Buffer::from_typed_slice(&[-1i8, 5]);
        assert_eq!(integer_value(&DataType::Int8, &buffer, 0), -1);
        assert_eq!(integer_value(&DataType::UInt8, &buffer, 0), 255);
        assert_eq!(integer_max(&DataType::UInt16), Some(65535));
        assert_eq!(integer_max(&DataType::Utf8), None);
    }

    #[test]
    fn test_integer_buffer_narrowing() {
        let buffer = integer_buffer(&DataType::Int16, [1i64, -2, 300].into_iter());
        assert_eq!(buffer.typed_data::<i16>(), &[1, -2, 300]);
        assert_eq!(integer_value(&DataType::Int16, &buffer, 1), -2);
    }

    #[test]
    fn test_type_predicates() {
        assert!(is_run_end_type(&DataType::Int16));
        assert!(!is_run_end_type(&DataType::UInt32));
        assert!(is_dictionary_index_type(&DataType::UInt8));
        assert!(!is_dictionary_index_type(&DataType::Float32));
    }
}

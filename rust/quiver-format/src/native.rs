//! Native (in-buffer) value representations of fixed-width logical types.

use std::fmt::Debug;

use bytemuck::{Pod, Zeroable};
use half::f16;
use serde::Serialize;

use crate::{
    bigint::i256,
    datatype::{DataType, IntervalUnit},
};

/// A fixed-width value that can be stored in and viewed from a buffer.
///
/// `DATA_TYPE` is the logical type a builder uses when none is given; other
/// logical types with the same width (dates, times, decimals) share the
/// native type.
pub trait NativeType: Pod + Debug + Default + PartialEq + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    /// Byte width of one value.
    const WIDTH: usize = std::mem::size_of::<Self>();

    /// Whether `data_type` stores its values as `Self`.
    fn is_compatible(data_type: &DataType) -> bool {
        data_type.storage_type().primitive_width() == Some(Self::WIDTH)
            && !matches!(data_type.storage_type(), DataType::FixedSizeBinary(_))
            && Self::matches_kind(data_type.storage_type())
    }

    /// Narrows compatibility beyond the byte width.
    fn matches_kind(_data_type: &DataType) -> bool {
        true
    }

    /// Lossy conversion to `f64`, used for tolerance-based comparison.
    fn as_f64(self) -> Option<f64> {
        None
    }

    /// Bitwise equality, treating distinct NaN payloads as different.
    fn is_bitwise_eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

macro_rules! native_integer {
    ($t:ty, $dt:expr) => {
        impl NativeType for $t {
            const DATA_TYPE: DataType = $dt;

            fn matches_kind(data_type: &DataType) -> bool {
                !data_type.is_floating()
                    && !matches!(
                        data_type,
                        DataType::Interval(IntervalUnit::DayTime)
                            | DataType::Interval(IntervalUnit::MonthDayNano)
                    )
            }
        }
    };
}

native_integer!(i8, DataType::Int8);
native_integer!(i16, DataType::Int16);
native_integer!(i32, DataType::Int32);
native_integer!(i64, DataType::Int64);
native_integer!(u8, DataType::UInt8);
native_integer!(u16, DataType::UInt16);
native_integer!(u32, DataType::UInt32);
native_integer!(u64, DataType::UInt64);
native_integer!(i128, DataType::Decimal128(38, 0));
native_integer!(i256, DataType::Decimal256(76, 0));

impl NativeType for f16 {
    const DATA_TYPE: DataType = DataType::Float16;

    fn matches_kind(data_type: &DataType) -> bool {
        *data_type == DataType::Float16
    }

    fn as_f64(self) -> Option<f64> {
        Some(self.to_f64())
    }
}

impl NativeType for f32 {
    const DATA_TYPE: DataType = DataType::Float32;

    fn matches_kind(data_type: &DataType) -> bool {
        *data_type == DataType::Float32
    }

    fn as_f64(self) -> Option<f64> {
        Some(self as f64)
    }
}

impl NativeType for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    fn matches_kind(data_type: &DataType) -> bool {
        *data_type == DataType::Float64
    }

    fn as_f64(self) -> Option<f64> {
        Some(self)
    }
}

/// A `day_time` interval: days and milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize)]
#[repr(C)]
pub struct IntervalDayTime {
    pub days: i32,
    pub milliseconds: i32,
}

impl IntervalDayTime {
    pub const fn new(days: i32, milliseconds: i32) -> IntervalDayTime {
        IntervalDayTime { days, milliseconds }
    }
}

impl NativeType for IntervalDayTime {
    const DATA_TYPE: DataType = DataType::Interval(IntervalUnit::DayTime);

    fn matches_kind(data_type: &DataType) -> bool {
        *data_type == Self::DATA_TYPE
    }
}

/// A `month_day_nano` interval: months, days and nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize)]
#[repr(C)]
pub struct IntervalMonthDayNano {
    pub months: i32,
    pub days: i32,
    pub nanoseconds: i64,
}

impl IntervalMonthDayNano {
    pub const fn new(months: i32, days: i32, nanoseconds: i64) -> IntervalMonthDayNano {
        IntervalMonthDayNano {
            months,
            days,
            nanoseconds,
        }
    }
}

impl NativeType for IntervalMonthDayNano {
    const DATA_TYPE: DataType = DataType::Interval(IntervalUnit::MonthDayNano);

    fn matches_kind(data_type: &DataType) -> bool {
        *data_type == Self::DATA_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::TimeUnit;

    #[test]
    fn test_compatibility() {
        assert!(i32::is_compatible(&DataType::Int32));
        assert!(i32::is_compatible(&DataType::Date32));
        assert!(i32::is_compatible(&DataType::Decimal32(9, 2)));
        assert!(i32::is_compatible(&DataType::Interval(IntervalUnit::YearMonth)));
        assert!(!i32::is_compatible(&DataType::Float32));
        assert!(!i32::is_compatible(&DataType::Int64));
        assert!(i64::is_compatible(&DataType::Timestamp(TimeUnit::Second, None)));
        assert!(!i64::is_compatible(&DataType::Interval(IntervalUnit::DayTime)));
        assert!(IntervalDayTime::is_compatible(&DataType::Interval(
            IntervalUnit::DayTime
        )));
        assert!(f16::is_compatible(&DataType::Float16));
        assert!(!u16::is_compatible(&DataType::Float16));
        assert!(!u8::is_compatible(&DataType::FixedSizeBinary(1)));
    }

    #[test]
    fn test_interval_serialize() {
        let v = IntervalMonthDayNano::new(1, 2, 3);
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"months":1,"days":2,"nanoseconds":3}"#
        );
        assert_eq!(std::mem::size_of::<IntervalMonthDayNano>(), 16);
        assert_eq!(std::mem::size_of::<i256>(), 32);
    }

    #[test]
    fn test_bitwise_eq() {
        assert!(f64::NAN.is_bitwise_eq(&f64::NAN));
        assert!(!0.0f64.is_bitwise_eq(&-0.0));
        assert!(1i32.is_bitwise_eq(&1));
    }
}

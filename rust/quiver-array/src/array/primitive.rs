use std::{any::Any, marker::PhantomData};

use half::f16;
use quiver_format::{
    DataType, IntervalDayTime, IntervalMonthDayNano, IntervalUnit, NativeType,
    decimal::format_decimal,
    i256,
    temporal::{format_date32, format_date64, format_duration, format_time, format_timestamp},
};

use super::Array;
use crate::{builder::PrimitiveBuilder, data::ArrayData, marshal::MarshalValue};

/// Array of fixed-width values stored as `T`.
///
/// The logical type may be any type stored as `T`: an `Int32Array` can hold
/// `date32`, `time32`, `decimal32` or `interval[year_month]` data, and
/// renders values according to that logical type.
#[derive(Debug, Clone)]
pub struct PrimitiveArray<T: NativeType> {
    data: ArrayData,
    _marker: PhantomData<T>,
}

pub type Int8Array = PrimitiveArray<i8>;
pub type Int16Array = PrimitiveArray<i16>;
pub type Int32Array = PrimitiveArray<i32>;
pub type Int64Array = PrimitiveArray<i64>;
pub type UInt8Array = PrimitiveArray<u8>;
pub type UInt16Array = PrimitiveArray<u16>;
pub type UInt32Array = PrimitiveArray<u32>;
pub type UInt64Array = PrimitiveArray<u64>;
pub type Float16Array = PrimitiveArray<f16>;
pub type Float32Array = PrimitiveArray<f32>;
pub type Float64Array = PrimitiveArray<f64>;
pub type Date32Array = PrimitiveArray<i32>;
pub type Date64Array = PrimitiveArray<i64>;
pub type Time32Array = PrimitiveArray<i32>;
pub type Time64Array = PrimitiveArray<i64>;
pub type TimestampArray = PrimitiveArray<i64>;
pub type DurationArray = PrimitiveArray<i64>;
pub type IntervalYearMonthArray = PrimitiveArray<i32>;
pub type IntervalDayTimeArray = PrimitiveArray<IntervalDayTime>;
pub type IntervalMonthDayNanoArray = PrimitiveArray<IntervalMonthDayNano>;
pub type Decimal32Array = PrimitiveArray<i32>;
pub type Decimal64Array = PrimitiveArray<i64>;
pub type Decimal128Array = PrimitiveArray<i128>;
pub type Decimal256Array = PrimitiveArray<i256>;

impl<T: NativeType> PrimitiveArray<T> {
    /// # Panics
    ///
    /// Panics when the logical type of `data` is not stored as `T`.
    pub fn from_data(data: ArrayData) -> PrimitiveArray<T> {
        assert!(
            T::is_compatible(data.data_type()),
            "{} data cannot be viewed as {}",
            data.data_type(),
            std::any::type_name::<T>()
        );
        PrimitiveArray {
            data,
            _marker: PhantomData,
        }
    }

    /// All-valid array of `values` with the default logical type of `T`.
    pub fn from_values(values: impl Into<Vec<T>>) -> PrimitiveArray<T> {
        let values = values.into();
        let data = ArrayData::new(
            T::DATA_TYPE,
            values.len(),
            0,
            Some(0),
            vec![None, Some(quiver_bytes::Buffer::from_typed_slice(&values))],
            vec![],
        );
        PrimitiveArray::from_data(data)
    }

    pub fn from_options(values: impl IntoIterator<Item = Option<T>>) -> PrimitiveArray<T> {
        let mut builder = PrimitiveBuilder::<T>::new();
        for value in values {
            builder.append_option(value);
        }
        builder.finish()
    }

    /// The same values under another logical type stored as `T`.
    pub fn with_data_type(self, data_type: DataType) -> PrimitiveArray<T> {
        PrimitiveArray::from_data(self.data.with_data_type(data_type))
    }

    /// Values of the array, including the (unspecified) values of null
    /// slots.
    pub fn values(&self) -> &[T] {
        let offset = self.data.offset();
        &self.data.typed_buffer::<T>(1)[offset..offset + self.data.len()]
    }

    #[inline]
    pub fn value(&self, i: usize) -> T {
        self.values()[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<T>> + '_ {
        (0..self.len()).map(|i| self.is_valid(i).then(|| self.value(i)))
    }
}

impl<T: NativeType> Array for PrimitiveArray<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        fixed_value_text(&self.data, i)
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        fixed_marshal_value(&self.data, i)
    }
}

impl<T: NativeType> From<Vec<T>> for PrimitiveArray<T> {
    fn from(values: Vec<T>) -> Self {
        PrimitiveArray::from_values(values)
    }
}

impl<T: NativeType> From<Vec<Option<T>>> for PrimitiveArray<T> {
    fn from(values: Vec<Option<T>>) -> Self {
        PrimitiveArray::from_options(values)
    }
}

macro_rules! value_at {
    ($data:expr, $i:expr, $t:ty) => {
        $data.typed_buffer::<$t>(1)[$data.offset() + $i]
    };
}

/// Text form of a valid fixed-width slot, following its logical type.
fn fixed_value_text(data: &ArrayData, i: usize) -> String {
    match data.data_type().storage_type() {
        DataType::Int8 => value_at!(data, i, i8).to_string(),
        DataType::Int16 => value_at!(data, i, i16).to_string(),
        DataType::Int32 => value_at!(data, i, i32).to_string(),
        DataType::Int64 => value_at!(data, i, i64).to_string(),
        DataType::UInt8 => value_at!(data, i, u8).to_string(),
        DataType::UInt16 => value_at!(data, i, u16).to_string(),
        DataType::UInt32 => value_at!(data, i, u32).to_string(),
        DataType::UInt64 => value_at!(data, i, u64).to_string(),
        DataType::Float16 => value_at!(data, i, f16).to_string(),
        DataType::Float32 => value_at!(data, i, f32).to_string(),
        DataType::Float64 => value_at!(data, i, f64).to_string(),
        DataType::Date32 => format_date32(value_at!(data, i, i32)),
        DataType::Date64 => format_date64(value_at!(data, i, i64)),
        DataType::Time32(unit) => format_time(value_at!(data, i, i32) as i64, *unit),
        DataType::Time64(unit) => format_time(value_at!(data, i, i64), *unit),
        DataType::Timestamp(unit, tz) => {
            format_timestamp(value_at!(data, i, i64), *unit, tz.as_deref())
        }
        DataType::Duration(unit) => format_duration(value_at!(data, i, i64), *unit),
        DataType::Decimal32(_, scale) => {
            format_decimal(i256::from(value_at!(data, i, i32) as i64), *scale)
        }
        DataType::Decimal64(_, scale) => format_decimal(i256::from(value_at!(data, i, i64)), *scale),
        DataType::Decimal128(_, scale) => {
            format_decimal(i256::from(value_at!(data, i, i128)), *scale)
        }
        DataType::Decimal256(_, scale) => format_decimal(value_at!(data, i, i256), *scale),
        DataType::Interval(_) => fixed_marshal_value(data, i).to_json(),
        other => panic!("{other} is not a fixed-width type"),
    }
}

fn fixed_marshal_value(data: &ArrayData, i: usize) -> MarshalValue {
    match data.data_type().storage_type() {
        DataType::Int8 => MarshalValue::Int(value_at!(data, i, i8) as i64),
        DataType::Int16 => MarshalValue::Int(value_at!(data, i, i16) as i64),
        DataType::Int32 => MarshalValue::Int(value_at!(data, i, i32) as i64),
        DataType::Int64 => MarshalValue::Int(value_at!(data, i, i64)),
        DataType::UInt8 => MarshalValue::UInt(value_at!(data, i, u8) as u64),
        DataType::UInt16 => MarshalValue::UInt(value_at!(data, i, u16) as u64),
        DataType::UInt32 => MarshalValue::UInt(value_at!(data, i, u32) as u64),
        DataType::UInt64 => MarshalValue::UInt(value_at!(data, i, u64)),
        DataType::Float16 => MarshalValue::Float(value_at!(data, i, f16).to_f64()),
        DataType::Float32 => MarshalValue::Float(value_at!(data, i, f32) as f64),
        DataType::Float64 => MarshalValue::Float(value_at!(data, i, f64)),
        DataType::Interval(IntervalUnit::YearMonth) => MarshalValue::Record(vec![(
            "months".to_string(),
            MarshalValue::Int(value_at!(data, i, i32) as i64),
        )]),
        DataType::Interval(IntervalUnit::DayTime) => {
            let v = value_at!(data, i, IntervalDayTime);
            MarshalValue::Record(vec![
                ("days".to_string(), MarshalValue::Int(v.days as i64)),
                ("milliseconds".to_string(), MarshalValue::Int(v.milliseconds as i64)),
            ])
        }
        DataType::Interval(IntervalUnit::MonthDayNano) => {
            let v = value_at!(data, i, IntervalMonthDayNano);
            MarshalValue::Record(vec![
                ("months".to_string(), MarshalValue::Int(v.months as i64)),
                ("days".to_string(), MarshalValue::Int(v.days as i64)),
                ("nanoseconds".to_string(), MarshalValue::Int(v.nanoseconds)),
            ])
        }
        _ => MarshalValue::String(fixed_value_text(data, i)),
    }
}

use std::any::Any;

use half::f16;
use quiver_common::Result;
use quiver_format::{DataType, IntervalDayTime, IntervalMonthDayNano, NativeType, i256};

use super::{ArrayBuilder, BufferBuilder, ValidityBuilder, parse::parse_fixed_width};
use crate::{
    array::{NULL_VALUE_STR, PrimitiveArray},
    data::ArrayData,
};

/// Builder of fixed-width arrays of `T`, for any logical type stored as `T`.
#[derive(Debug)]
pub struct PrimitiveBuilder<T: NativeType> {
    data_type: DataType,
    values: BufferBuilder<T>,
    validity: ValidityBuilder,
}

pub type Int8Builder = PrimitiveBuilder<i8>;
pub type Int16Builder = PrimitiveBuilder<i16>;
pub type Int32Builder = PrimitiveBuilder<i32>;
pub type Int64Builder = PrimitiveBuilder<i64>;
pub type UInt8Builder = PrimitiveBuilder<u8>;
pub type UInt16Builder = PrimitiveBuilder<u16>;
pub type UInt32Builder = PrimitiveBuilder<u32>;
pub type UInt64Builder = PrimitiveBuilder<u64>;
pub type Float16Builder = PrimitiveBuilder<f16>;
pub type Float32Builder = PrimitiveBuilder<f32>;
pub type Float64Builder = PrimitiveBuilder<f64>;
pub type IntervalDayTimeBuilder = PrimitiveBuilder<IntervalDayTime>;
pub type IntervalMonthDayNanoBuilder = PrimitiveBuilder<IntervalMonthDayNano>;
pub type Decimal128Builder = PrimitiveBuilder<i128>;
pub type Decimal256Builder = PrimitiveBuilder<i256>;

impl<T: NativeType> Default for PrimitiveBuilder<T> {
    fn default() -> Self {
        PrimitiveBuilder::with_capacity(0)
    }
}

impl<T: NativeType> PrimitiveBuilder<T> {
    pub fn new() -> PrimitiveBuilder<T> {
        PrimitiveBuilder::default()
    }

    pub fn with_capacity(capacity: usize) -> PrimitiveBuilder<T> {
        PrimitiveBuilder {
            data_type: T::DATA_TYPE,
            values: BufferBuilder::with_capacity(capacity),
            validity: ValidityBuilder::with_capacity(capacity),
        }
    }

    /// Sets the logical type of the built arrays.
    ///
    /// # Panics
    ///
    /// Panics when `data_type` is not stored as `T`.
    pub fn with_data_type(mut self, data_type: DataType) -> PrimitiveBuilder<T> {
        assert!(
            T::is_compatible(&data_type),
            "{data_type} is not stored as {}",
            std::any::type_name::<T>()
        );
        self.data_type = data_type;
        self
    }

    #[inline]
    pub fn append_value(&mut self, value: T) {
        self.values.append(value);
        self.validity.append(true);
    }

    pub fn append_option(&mut self, value: Option<T>) {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    /// Appends all-valid values.
    pub fn append_slice(&mut self, values: &[T]) {
        self.values.append_slice(values);
        self.validity.append_n(values.len(), true);
    }

    /// Appends `values` with per-value validity; an empty `validity` marks
    /// all values valid.
    ///
    /// # Panics
    ///
    /// Panics when `validity` is neither empty nor as long as `values`.
    pub fn append_values(&mut self, values: &[T], validity: &[bool]) {
        self.validity.append_validity_slice(values.len(), validity);
        self.values.append_slice(values);
    }

    /// Values appended so far, including the placeholders of null slots.
    pub fn values_slice(&self) -> &[T] {
        self.values.as_slice()
    }

    pub fn finish(&mut self) -> PrimitiveArray<T> {
        PrimitiveArray::from_data(self.finish_data())
    }
}

impl<T: NativeType> ArrayBuilder for PrimitiveBuilder<T> {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn capacity(&self) -> usize {
        self.values.capacity().max(self.validity.capacity())
    }

    fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    fn append_null(&mut self) {
        self.values.append(T::default());
        self.validity.append(false);
    }

    fn append_nulls(&mut self, n: usize) {
        self.values.append_n(n, T::default());
        self.validity.append_n(n, false);
    }

    fn append_empty_value(&mut self) {
        self.append_value(T::default());
    }

    fn append_empty_values(&mut self, n: usize) {
        self.values.append_n(n, T::default());
        self.validity.append_n(n, true);
    }

    fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
        self.validity.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            self.values.truncate(len);
            self.validity.truncate(len);
        } else {
            self.reserve(len - self.len());
        }
    }

    fn finish_data(&mut self) -> ArrayData {
        let len = self.values.len();
        let (validity, null_count) = self.validity.finish();
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(self.values.finish())],
            vec![],
        )
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        if s == NULL_VALUE_STR {
            self.append_null();
        } else {
            let bytes = parse_fixed_width(&self.data_type, s)?;
            self.append_value(bytemuck::pod_read_unaligned(&bytes));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use quiver_format::TimeUnit;

    use super::*;
    use crate::array::Array;

    #[test]
    fn test_append_values() {
        let mut b = Int32Builder::new();
        b.append_value(1);
        b.append_null();
        b.append_values(&[3, 4], &[true, false]);
        b.append_slice(&[5]);
        assert_eq!(b.len(), 5);
        assert_eq!(b.null_count(), 2);
        let array = b.finish();
        assert_eq!(
            array.iter().collect::<Vec<_>>(),
            vec![Some(1), None, Some(3), None, Some(5)]
        );
        assert_eq!(b.len(), 0);
    }

    #[test]
    #[should_panic(expected = "validity slice length")]
    fn test_validity_mismatch_panics() {
        Int64Builder::new().append_values(&[1, 2], &[true]);
    }

    #[test]
    fn test_logical_type_from_text() {
        let mut b = Int64Builder::new().with_data_type(DataType::Timestamp(TimeUnit::Second, None));
        b.append_value_from_str("1970-01-01 00:01:00").unwrap();
        b.append_value_from_str("(null)").unwrap();
        assert!(b.append_value_from_str("yesterday").is_err());
        let array = b.finish();
        assert_eq!(array.values()[0], 60);
        assert_eq!(array.value_str(0), "1970-01-01 00:01:00");
        assert!(array.is_null(1));
    }

    #[test]
    fn test_resize_truncates() {
        let mut b = UInt8Builder::new();
        b.append_slice(&[1, 2, 3]);
        b.append_null();
        b.resize(2);
        let array = b.finish();
        assert_eq!(array.values(), &[1, 2]);
        assert_eq!(array.null_count(), 0);
    }

    #[test]
    #[should_panic(expected = "is not stored as")]
    fn test_incompatible_logical_type() {
        let _ = Int32Builder::new().with_data_type(DataType::Float32);
    }
}

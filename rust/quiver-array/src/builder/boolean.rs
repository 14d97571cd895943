use std::any::Any;

use quiver_bits::BitmapBuilder;
use quiver_common::Result;
use quiver_format::DataType;

use super::{ArrayBuilder, ValidityBuilder, parse::parse_bool};
use crate::{
    array::{BooleanArray, NULL_VALUE_STR},
    data::ArrayData,
};

#[derive(Debug, Default)]
pub struct BooleanBuilder {
    values: BitmapBuilder,
    validity: ValidityBuilder,
}

impl BooleanBuilder {
    pub fn new() -> BooleanBuilder {
        BooleanBuilder::default()
    }

    pub fn with_capacity(capacity: usize) -> BooleanBuilder {
        BooleanBuilder {
            values: BitmapBuilder::with_capacity(capacity),
            validity: ValidityBuilder::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn append_value(&mut self, value: bool) {
        self.values.append(value);
        self.validity.append(true);
    }

    pub fn append_option(&mut self, value: Option<bool>) {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    /// Appends `values` with per-value validity; an empty `validity` marks
    /// all values valid.
    pub fn append_values(&mut self, values: &[bool], validity: &[bool]) {
        self.validity.append_validity_slice(values.len(), validity);
        self.values.append_slice(values);
    }

    pub fn finish(&mut self) -> BooleanArray {
        BooleanArray::from_data(self.finish_data())
    }
}

impl ArrayBuilder for BooleanBuilder {
    fn data_type(&self) -> &DataType {
        &DataType::Boolean
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn capacity(&self) -> usize {
        self.validity.capacity()
    }

    fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    fn append_null(&mut self) {
        self.values.append(false);
        self.validity.append(false);
    }

    fn append_nulls(&mut self, n: usize) {
        self.values.append_n(n, false);
        self.validity.append_n(n, false);
    }

    fn append_empty_value(&mut self) {
        self.append_value(false);
    }

    fn append_empty_values(&mut self, n: usize) {
        self.values.append_n(n, false);
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
            DataType::Boolean,
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
            self.append_value(parse_bool(s)?);
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
    use super::*;
    use crate::array::Array;

    #[test]
    fn test_append_values_with_validity() {
        let mut b = BooleanBuilder::new();
        b.append_values(&[true, false, true], &[]);
        b.append_values(&[true, true], &[false, true]);
        b.append_value_from_str("false").unwrap();
        let array = b.finish();
        assert_eq!(array.len(), 6);
        assert_eq!(array.null_count(), 1);
        assert_eq!(
            array.iter().collect::<Vec<_>>(),
            vec![Some(true), Some(false), Some(true), None, Some(true), Some(false)]
        );
    }

    #[test]
    fn test_no_nulls_no_bitmap() {
        let mut b = BooleanBuilder::with_capacity(4);
        b.append_empty_values(4);
        let array = b.finish();
        assert!(array.to_data().validity().is_none());
        assert_eq!(array.true_count(), 0);
    }
}

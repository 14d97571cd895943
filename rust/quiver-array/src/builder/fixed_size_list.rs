use std::{any::Any, sync::Arc};

use quiver_common::{Result, error::Error};
use quiver_format::{DataType, Field, FieldRef};

use super::{
    ArrayBuilder, ValidityBuilder, append_json_text, downcast_builder_mut,
    make_builder_with_capacity,
};
use crate::{array::FixedSizeListArray, data::ArrayData};

/// Builder of lists of exactly `size` elements each.
///
/// The caller appends `size` elements to [`values`](Self::values) for every
/// valid slot; null and empty slots fill the child themselves.
#[derive(Debug)]
pub struct FixedSizeListBuilder {
    data_type: DataType,
    size: usize,
    validity: ValidityBuilder,
    values: Box<dyn ArrayBuilder>,
}

impl FixedSizeListBuilder {
    pub fn new(value_type: DataType, size: i32) -> FixedSizeListBuilder {
        FixedSizeListBuilder::with_field(Arc::new(Field::list_item(value_type)), size, 0)
    }

    pub fn with_field(field: FieldRef, size: i32, capacity: usize) -> FixedSizeListBuilder {
        let list_size =
            usize::try_from(size).unwrap_or_else(|_| panic!("list size must be non-negative"));
        FixedSizeListBuilder {
            values: make_builder_with_capacity(field.data_type(), capacity * list_size),
            data_type: DataType::FixedSizeList(field, size),
            size: list_size,
            validity: ValidityBuilder::with_capacity(capacity),
        }
    }

    pub fn value_length(&self) -> usize {
        self.size
    }

    pub fn append(&mut self, valid: bool) {
        self.validity.append(valid);
    }

    pub fn values(&mut self) -> &mut dyn ArrayBuilder {
        self.values.as_mut()
    }

    pub fn values_as<B: ArrayBuilder>(&mut self) -> &mut B {
        downcast_builder_mut(self.values.as_mut())
    }

    pub fn finish(&mut self) -> FixedSizeListArray {
        FixedSizeListArray::from_data(self.finish_data())
    }
}

impl ArrayBuilder for FixedSizeListBuilder {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    fn capacity(&self) -> usize {
        self.validity.capacity()
    }

    fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    fn append_null(&mut self) {
        self.validity.append(false);
        self.values.append_nulls(self.size);
    }

    fn append_nulls(&mut self, n: usize) {
        self.validity.append_n(n, false);
        self.values.append_nulls(n * self.size);
    }

    fn append_empty_value(&mut self) {
        self.validity.append(true);
        self.values.append_empty_values(self.size);
    }

    fn append_empty_values(&mut self, n: usize) {
        self.validity.append_n(n, true);
        self.values.append_empty_values(n * self.size);
    }

    fn reserve(&mut self, additional: usize) {
        self.validity.reserve(additional);
        self.values.reserve(additional * self.size);
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            self.validity.truncate(len);
            self.values.resize(len * self.size);
        } else {
            self.reserve(len - self.len());
        }
    }

    /// # Panics
    ///
    /// Panics when the values builder does not hold exactly `size`
    /// elements per slot.
    fn finish_data(&mut self) -> ArrayData {
        let len = self.validity.len();
        assert_eq!(
            self.values.len(),
            len * self.size,
            "{} builder has {} values for {len} slots",
            self.data_type,
            self.values.len()
        );
        let (validity, null_count) = self.validity.finish();
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity],
            vec![self.values.finish_data()],
        )
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        append_json_text(self, s)
    }

    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        match value {
            serde_json::Value::Null => self.append_null(),
            serde_json::Value::Array(items) if items.len() == self.size => {
                self.append(true);
                for item in items {
                    self.values.append_json(item)?;
                }
            }
            other => {
                return Err(Error::parse(
                    other.to_string(),
                    &self.data_type,
                    format!("expected a JSON array of {} elements", self.size),
                ));
            }
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
    use crate::{array::Array, builder::Float32Builder};

    #[test]
    fn test_fixed_size_slots() {
        let mut b = FixedSizeListBuilder::new(DataType::Float32, 2);
        b.append(true);
        b.values_as::<Float32Builder>().append_slice(&[1.0, 2.0]);
        b.append_null();
        b.append_value_from_str("[3, 4]").unwrap();
        assert!(b.append_value_from_str("[5]").is_err());
        let list = b.finish();
        assert_eq!(list.len(), 3);
        assert_eq!(list.list_values().len(), 6);
        assert_eq!((&list as &dyn Array).to_string(), "[[1 2] (null) [3 4]]");
    }

    #[test]
    #[should_panic(expected = "values for 1 slots")]
    fn test_short_child_panics() {
        let mut b = FixedSizeListBuilder::new(DataType::Int8, 2);
        b.append(true);
        b.values().append_empty_value();
        b.finish_data();
    }
}

use std::{any::Any, sync::Arc};

use quiver_common::{Result, error::Error};
use quiver_format::{DataType, Field, FieldRef};

use super::{
    ArrayBuilder, OffsetsBuilder, ValidityBuilder, append_json_text, downcast_builder_mut,
    make_builder_with_capacity,
};
use crate::{array::GenericListArray, data::ArrayData, offset::OffsetSize};

/// Builder of variable-length list arrays.
///
/// [`append`](Self::append) opens a slot at the current length of the
/// values builder; elements appended to [`values`](Self::values) afterwards
/// belong to that slot until the next `append` or `finish`.
#[derive(Debug)]
pub struct GenericListBuilder<O: OffsetSize> {
    data_type: DataType,
    offsets: OffsetsBuilder<O>,
    validity: ValidityBuilder,
    values: Box<dyn ArrayBuilder>,
}

pub type ListBuilder = GenericListBuilder<i32>;
pub type LargeListBuilder = GenericListBuilder<i64>;

impl<O: OffsetSize> GenericListBuilder<O> {
    /// Builder of lists of `value_type` with the conventional `item` field.
    pub fn new(value_type: DataType) -> GenericListBuilder<O> {
        GenericListBuilder::with_field(Arc::new(Field::list_item(value_type)), 0)
    }

    pub fn with_field(field: FieldRef, capacity: usize) -> GenericListBuilder<O> {
        let values = make_builder_with_capacity(field.data_type(), capacity);
        let data_type = if O::IS_LARGE {
            DataType::LargeList(field)
        } else {
            DataType::List(field)
        };
        GenericListBuilder {
            data_type,
            offsets: OffsetsBuilder::with_capacity(capacity),
            validity: ValidityBuilder::with_capacity(capacity),
            values,
        }
    }

    /// Opens a new list slot.
    pub fn append(&mut self, valid: bool) {
        self.offsets.push(self.values.len());
        self.validity.append(valid);
    }

    pub fn values(&mut self) -> &mut dyn ArrayBuilder {
        self.values.as_mut()
    }

    /// The values builder as its concrete type.
    pub fn values_as<B: ArrayBuilder>(&mut self) -> &mut B {
        downcast_builder_mut(self.values.as_mut())
    }

    pub fn finish(&mut self) -> GenericListArray<O> {
        GenericListArray::from_data(self.finish_data())
    }
}

impl<O: OffsetSize> ArrayBuilder for GenericListBuilder<O> {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.offsets.len()
    }

    fn capacity(&self) -> usize {
        self.validity.capacity()
    }

    fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    fn append_null(&mut self) {
        self.append(false);
    }

    fn append_nulls(&mut self, n: usize) {
        self.offsets.push_n(n, self.values.len());
        self.validity.append_n(n, false);
    }

    fn append_empty_value(&mut self) {
        self.append(true);
    }

    fn append_empty_values(&mut self, n: usize) {
        self.offsets.push_n(n, self.values.len());
        self.validity.append_n(n, true);
    }

    fn reserve(&mut self, additional: usize) {
        self.offsets.reserve(additional);
        self.validity.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            let end = self.offsets.start(len);
            self.offsets.truncate(len);
            self.validity.truncate(len);
            self.values.resize(end);
        } else {
            self.reserve(len - self.len());
        }
    }

    fn finish_data(&mut self) -> ArrayData {
        let len = self.offsets.len();
        let offsets = self.offsets.finish(self.values.len());
        let (validity, null_count) = self.validity.finish();
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(offsets)],
            vec![self.values.finish_data()],
        )
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        append_json_text(self, s)
    }

    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        match value {
            serde_json::Value::Null => self.append_null(),
            serde_json::Value::Array(items) => {
                self.append(true);
                for item in items {
                    self.values.append_json(item)?;
                }
            }
            other => {
                return Err(Error::parse(
                    other.to_string(),
                    &self.data_type,
                    "expected a JSON array",
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
    use crate::{
        array::{Array, Int32Array},
        builder::Int32Builder,
    };

    #[test]
    fn test_list_slots() {
        let mut b = ListBuilder::new(DataType::Int32);
        b.append(true);
        b.values_as::<Int32Builder>().append_slice(&[1, 2]);
        b.append_null();
        b.append(true);
        b.values_as::<Int32Builder>().append_value(3);
        b.append_empty_value();
        let list = b.finish();
        assert_eq!(list.offsets(), &[0, 2, 2, 3, 3]);
        assert_eq!((&list as &dyn Array).to_string(), "[[1 2] (null) [3] []]");
        let values = list.list_values().as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(values.values(), &[1, 2, 3]);
    }

    #[test]
    fn test_nested_lists_from_json() {
        let mut b = LargeListBuilder::new(DataType::list_of(DataType::Int32));
        b.append_value_from_str("[[1], null, []]").unwrap();
        b.append_value_from_str("null").unwrap();
        assert!(b.append_value_from_str("{}").is_err());
        let list = b.finish();
        assert_eq!(list.value_str(0), "[[1],null,[]]");
        assert!(list.is_null(1));
        list.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_resize_truncates_children() {
        let mut b = ListBuilder::new(DataType::Int32);
        b.append_value_from_str("[1, 2]").unwrap();
        b.append_value_from_str("[3]").unwrap();
        b.resize(1);
        assert_eq!(b.values().len(), 2);
        assert_eq!(b.finish().len(), 1);
    }
}

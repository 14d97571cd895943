use std::any::Any;

use quiver_bytes::Buffer;
use quiver_common::Result;
use quiver_format::{DataType, FieldRef};

use super::{Array, ArrayRef, make_array, marshal_all};
use crate::{data::ArrayData, marshal::MarshalValue};

/// Array of lists that all have `size` elements.
#[derive(Debug, Clone)]
pub struct FixedSizeListArray {
    data: ArrayData,
    values: ArrayRef,
    size: usize,
}

impl FixedSizeListArray {
    pub fn from_data(data: ArrayData) -> FixedSizeListArray {
        let size = match data.data_type().storage_type() {
            DataType::FixedSizeList(_, size) => *size as usize,
            other => panic!("{other} data cannot be viewed as a fixed-size list array"),
        };
        let values = make_array(data.child(0).clone());
        FixedSizeListArray { data, values, size }
    }

    pub fn try_new(
        field: FieldRef,
        size: i32,
        values: ArrayRef,
        validity: Option<Buffer>,
    ) -> Result<FixedSizeListArray> {
        let len = if size > 0 { values.len() / size as usize } else { 0 };
        let data = ArrayData::builder(DataType::FixedSizeList(field, size))
            .len(len)
            .buffers(vec![validity])
            .add_child(values.to_data())
            .build_validated()?;
        Ok(FixedSizeListArray::from_data(data))
    }

    #[inline]
    pub fn value_length(&self) -> usize {
        self.size
    }

    /// Start and end of list `i` in the child array.
    #[inline]
    pub fn value_offsets(&self, i: usize) -> (usize, usize) {
        let start = (self.data.offset() + i) * self.size;
        (start, start + self.size)
    }

    pub fn list_values(&self) -> &ArrayRef {
        &self.values
    }

    pub fn value(&self, i: usize) -> ArrayRef {
        assert!(i < self.len(), "index {i} out of bounds for length {}", self.len());
        let (start, end) = self.value_offsets(i);
        self.values.slice(start, end)
    }
}

impl Array for FixedSizeListArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        self.marshal_value(i).to_json()
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        MarshalValue::List(marshal_all(self.value(i).as_ref()))
    }

    fn display_value(&self, i: usize) -> String {
        if self.is_null(i) {
            super::NULL_VALUE_STR.to_string()
        } else {
            self.value(i).to_string()
        }
    }
}

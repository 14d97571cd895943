use std::{any::Any, marker::PhantomData};

use quiver_bytes::Buffer;
use quiver_common::Result;
use quiver_format::{DataType, FieldRef};

use super::{Array, ArrayRef, list_view::range_of_values_used, make_array, marshal_all};
use crate::{data::ArrayData, marshal::MarshalValue, offset::OffsetSize};

/// Array of variable-length lists: `len + 1` offsets into one child array.
#[derive(Debug)]
pub struct GenericListArray<O: OffsetSize> {
    data: ArrayData,
    values: ArrayRef,
    _marker: PhantomData<O>,
}

impl<O: OffsetSize> Clone for GenericListArray<O> {
    fn clone(&self) -> Self {
        GenericListArray {
            data: self.data.clone(),
            values: self.values.clone(),
            _marker: PhantomData,
        }
    }
}

pub type ListArray = GenericListArray<i32>;
pub type LargeListArray = GenericListArray<i64>;

impl<O: OffsetSize> GenericListArray<O> {
    pub fn from_data(data: ArrayData) -> GenericListArray<O> {
        let matches = match data.data_type().storage_type() {
            DataType::List(_) => !O::IS_LARGE,
            DataType::LargeList(_) => O::IS_LARGE,
            _ => false,
        };
        assert!(
            matches,
            "{} data cannot be viewed as a {}List array",
            data.data_type(),
            O::PREFIX
        );
        let values = make_array(data.child(0).clone());
        GenericListArray {
            data,
            values,
            _marker: PhantomData,
        }
    }

    /// Builds a list array from its parts and validates the layout.
    pub fn try_new(
        field: FieldRef,
        offsets: &[O],
        values: ArrayRef,
        validity: Option<Buffer>,
    ) -> Result<GenericListArray<O>> {
        let data_type = if O::IS_LARGE {
            DataType::LargeList(field)
        } else {
            DataType::List(field)
        };
        let data = ArrayData::builder(data_type)
            .len(offsets.len().saturating_sub(1))
            .buffers(vec![validity, Some(Buffer::from_typed_slice(offsets))])
            .add_child(values.to_data())
            .build_validated()?;
        Ok(GenericListArray::from_data(data))
    }

    /// The `len + 1` offsets of this array's slots.
    pub fn offsets(&self) -> &[O] {
        if self.data.buffers()[1].is_none() {
            return &[];
        }
        let offset = self.data.offset();
        &self.data.typed_buffer::<O>(1)[offset..offset + self.len() + 1]
    }

    /// Start and end of list `i` in the child array.
    #[inline]
    pub fn value_offsets(&self, i: usize) -> (usize, usize) {
        let offsets = self.offsets();
        (offsets[i].as_usize(), offsets[i + 1].as_usize())
    }

    #[inline]
    pub fn value_length(&self, i: usize) -> usize {
        let (start, end) = self.value_offsets(i);
        end - start
    }

    /// The whole child array, including values not referenced by this slice.
    pub fn list_values(&self) -> &ArrayRef {
        &self.values
    }

    /// Elements of list `i`.
    pub fn value(&self, i: usize) -> ArrayRef {
        let (start, end) = self.value_offsets(i);
        self.values.slice(start, end)
    }

    /// `(offset, len)` of the child range referenced by this array.
    pub fn range_of_values_used(&self) -> (usize, usize) {
        range_of_values_used(&self.data)
    }
}

impl<O: OffsetSize> Array for GenericListArray<O> {
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_format::Field;

    use super::*;
    use crate::array::Int32Array;

    fn sample() -> ListArray {
        let values: ArrayRef = Arc::new(Int32Array::from_values(vec![1, 2, 3, 4, 5]));
        let validity = Buffer::copy_from_slice(&[0b101]);
        ListArray::try_new(
            Arc::new(Field::list_item(DataType::Int32)),
            &[0, 2, 2, 5],
            values,
            Some(validity),
        )
        .unwrap()
    }

    #[test]
    fn test_list_access() {
        let list = sample();
        assert_eq!(list.len(), 3);
        assert_eq!(list.value_offsets(2), (2, 5));
        assert_eq!(list.value(0).to_string(), "[1 2]");
        assert_eq!((&list as &dyn Array).to_string(), "[[1 2] (null) [3 4 5]]");
        assert_eq!(list.value_str(2), "[3,4,5]");
    }

    #[test]
    fn test_range_of_values_used() {
        let list = sample();
        let slice = ListArray::from_data(list.to_data().slice(2, 3));
        assert_eq!(slice.range_of_values_used(), (2, 3));
        assert_eq!(list.range_of_values_used(), (0, 5));
    }

    #[test]
    fn test_try_new_rejects_bad_offsets() {
        let values: ArrayRef = Arc::new(Int32Array::from_values(vec![1]));
        let result = ListArray::try_new(
            Arc::new(Field::list_item(DataType::Int32)),
            &[0, 3],
            values,
            None,
        );
        assert!(result.is_err());
    }
}

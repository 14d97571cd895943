use std::{any::Any, marker::PhantomData};

use quiver_bytes::Buffer;
use quiver_common::Result;
use quiver_format::{DataType, FieldRef};

use super::{Array, ArrayRef, make_array, marshal_all};
use crate::{data::ArrayData, marshal::MarshalValue, offset::OffsetSize};

/// Array of lists addressed by an `(offset, size)` pair per slot.
///
/// Unlike [`GenericListArray`](super::GenericListArray), views may overlap
/// and appear in any order within the child array.
#[derive(Debug)]
pub struct GenericListViewArray<O: OffsetSize> {
    data: ArrayData,
    values: ArrayRef,
    _marker: PhantomData<O>,
}

impl<O: OffsetSize> Clone for GenericListViewArray<O> {
    fn clone(&self) -> Self {
        GenericListViewArray {
            data: self.data.clone(),
            values: self.values.clone(),
            _marker: PhantomData,
        }
    }
}

pub type ListViewArray = GenericListViewArray<i32>;
pub type LargeListViewArray = GenericListViewArray<i64>;

impl<O: OffsetSize> GenericListViewArray<O> {
    pub fn from_data(data: ArrayData) -> GenericListViewArray<O> {
        let matches = match data.data_type().storage_type() {
            DataType::ListView(_) => !O::IS_LARGE,
            DataType::LargeListView(_) => O::IS_LARGE,
            _ => false,
        };
        assert!(
            matches,
            "{} data cannot be viewed as a {}ListView array",
            data.data_type(),
            O::PREFIX
        );
        let values = make_array(data.child(0).clone());
        GenericListViewArray {
            data,
            values,
            _marker: PhantomData,
        }
    }

    pub fn try_new(
        field: FieldRef,
        offsets: &[O],
        sizes: &[O],
        values: ArrayRef,
        validity: Option<Buffer>,
    ) -> Result<GenericListViewArray<O>> {
        assert_eq!(offsets.len(), sizes.len(), "offsets and sizes differ in length");
        let data_type = if O::IS_LARGE {
            DataType::LargeListView(field)
        } else {
            DataType::ListView(field)
        };
        let data = ArrayData::builder(data_type)
            .len(offsets.len())
            .buffers(vec![
                validity,
                Some(Buffer::from_typed_slice(offsets)),
                Some(Buffer::from_typed_slice(sizes)),
            ])
            .add_child(values.to_data())
            .build_validated()?;
        Ok(GenericListViewArray::from_data(data))
    }

    pub fn offsets(&self) -> &[O] {
        let offset = self.data.offset();
        match self.data.buffers()[1] {
            Some(_) => &self.data.typed_buffer::<O>(1)[offset..offset + self.len()],
            None => &[],
        }
    }

    pub fn sizes(&self) -> &[O] {
        let offset = self.data.offset();
        match self.data.buffers()[2] {
            Some(_) => &self.data.typed_buffer::<O>(2)[offset..offset + self.len()],
            None => &[],
        }
    }

    /// Start and end of view `i` in the child array.
    #[inline]
    pub fn value_offsets(&self, i: usize) -> (usize, usize) {
        let start = self.offsets()[i].as_usize();
        (start, start + self.sizes()[i].as_usize())
    }

    pub fn list_values(&self) -> &ArrayRef {
        &self.values
    }

    pub fn value(&self, i: usize) -> ArrayRef {
        let (start, end) = self.value_offsets(i);
        self.values.slice(start, end)
    }

    pub fn range_of_values_used(&self) -> (usize, usize) {
        range_of_values_used(&self.data)
    }
}

impl<O: OffsetSize> Array for GenericListViewArray<O> {
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

/// Smallest contiguous `(offset, len)` range of the child array referenced
/// by the valid slots of a list-like array (list, large list, map, list
/// view, large list view). `(0, 0)` when no slot is valid.
pub fn range_of_values_used(data: &ArrayData) -> (usize, usize) {
    if data.is_empty() || data.null_count() == data.len() {
        return (0, 0);
    }
    let (min_offset, max_end) = match data.data_type().storage_type() {
        DataType::List(_) | DataType::Map(..) => offsets_range::<i32>(data),
        DataType::LargeList(_) => offsets_range::<i64>(data),
        DataType::ListView(_) => views_range::<i32>(data),
        DataType::LargeListView(_) => views_range::<i64>(data),
        other => panic!("{other} is not a variable-length list type"),
    };
    (min_offset, max_end - min_offset)
}

fn offsets_range<O: OffsetSize>(data: &ArrayData) -> (usize, usize) {
    let offsets = data.typed_buffer::<O>(1);
    (
        offsets[data.offset()].as_usize(),
        offsets[data.offset() + data.len()].as_usize(),
    )
}

fn views_range<O: OffsetSize>(data: &ArrayData) -> (usize, usize) {
    let offsets = &data.typed_buffer::<O>(1)[data.offset()..];
    let sizes = &data.typed_buffer::<O>(2)[data.offset()..];
    let child_len = data.child(0).len();

    let mut used = (0..data.len()).filter(|&i| data.is_valid(i) && sizes[i] > O::zero());
    let Some(first) = used.next() else {
        return (0, 0);
    };
    let mut min_offset = offsets[first].as_usize();
    let mut max_end = min_offset + sizes[first].as_usize();
    for i in used {
        if min_offset == 0 && max_end == child_len {
            break;
        }
        let start = offsets[i].as_usize();
        min_offset = min_offset.min(start);
        max_end = max_end.max(start + sizes[i].as_usize());
    }
    (min_offset, max_end)
}

use std::any::Any;

use quiver_bytes::Buffer;
use quiver_common::Result;
use quiver_format::DataType;

use super::{Array, ArrayRef, StructArray, list_view::range_of_values_used};
use crate::{data::ArrayData, marshal::MarshalValue};

/// Array of maps: a list of `{key, value}` entries per slot.
#[derive(Debug, Clone)]
pub struct MapArray {
    data: ArrayData,
    entries: StructArray,
}

impl MapArray {
    pub fn from_data(data: ArrayData) -> MapArray {
        assert!(
            matches!(data.data_type().storage_type(), DataType::Map(..)),
            "{} data cannot be viewed as a map array",
            data.data_type()
        );
        let entries = StructArray::from_data(data.child(0).clone());
        assert_eq!(entries.num_fields(), 2, "map entries must have a key and a value field");
        MapArray { data, entries }
    }

    /// Builds a map array from offsets and parallel key and item arrays.
    pub fn try_new(
        offsets: &[i32],
        keys: ArrayRef,
        items: ArrayRef,
        validity: Option<Buffer>,
        keys_sorted: bool,
    ) -> Result<MapArray> {
        let data_type =
            DataType::map_of(keys.data_type().clone(), items.data_type().clone(), keys_sorted);
        let DataType::Map(entries_field, _) = &data_type else {
            unreachable!("map_of builds a map type");
        };
        let entries = ArrayData::builder(entries_field.data_type().clone())
            .len(keys.len())
            .buffers(vec![None])
            .children(vec![keys.to_data(), items.to_data()])
            .build();
        let data = ArrayData::builder(data_type)
            .len(offsets.len().saturating_sub(1))
            .buffers(vec![validity, Some(Buffer::from_typed_slice(offsets))])
            .add_child(entries)
            .build_validated()?;
        Ok(MapArray::from_data(data))
    }

    pub fn keys_sorted(&self) -> bool {
        matches!(self.data.data_type().storage_type(), DataType::Map(_, true))
    }

    pub fn offsets(&self) -> &[i32] {
        if self.data.buffers()[1].is_none() {
            return &[];
        }
        let offset = self.data.offset();
        &self.data.typed_buffer::<i32>(1)[offset..offset + self.len() + 1]
    }

    #[inline]
    pub fn value_offsets(&self, i: usize) -> (usize, usize) {
        let offsets = self.offsets();
        (offsets[i] as usize, offsets[i + 1] as usize)
    }

    /// All entries, as a struct array of keys and items.
    pub fn entries(&self) -> &StructArray {
        &self.entries
    }

    pub fn keys(&self) -> &ArrayRef {
        self.entries.field(0)
    }

    pub fn items(&self) -> &ArrayRef {
        self.entries.field(1)
    }

    /// Entries of map `i`.
    pub fn value(&self, i: usize) -> ArrayRef {
        let (start, end) = self.value_offsets(i);
        self.entries.slice(start, end)
    }

    pub fn range_of_values_used(&self) -> (usize, usize) {
        range_of_values_used(&self.data)
    }
}

impl Array for MapArray {
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
        let (start, end) = self.value_offsets(i);
        MarshalValue::List(
            (start..end)
                .map(|j| {
                    MarshalValue::Record(vec![
                        ("key".to_string(), self.keys().get_one_for_marshal(j)),
                        ("value".to_string(), self.items().get_one_for_marshal(j)),
                    ])
                })
                .collect(),
        )
    }

    fn display_value(&self, i: usize) -> String {
        if self.is_null(i) {
            super::NULL_VALUE_STR.to_string()
        } else {
            self.value(i).to_string()
        }
    }
}

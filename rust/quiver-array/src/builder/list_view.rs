use std::{any::Any, sync::Arc};

use quiver_common::{Result, error::Error};
use quiver_format::{DataType, Field, FieldRef};

use super::{
    ArrayBuilder, BufferBuilder, ValidityBuilder, append_json_text, downcast_builder_mut,
    make_builder_with_capacity,
};
use crate::{array::GenericListViewArray, data::ArrayData, offset::OffsetSize};

/// Builder of list-view arrays.
///
/// Each slot's view starts at the values length when the slot is opened.
/// The size of a slot opened with [`append`](Self::append) is fixed when the
/// next slot is opened or the builder finishes.
#[derive(Debug)]
pub struct GenericListViewBuilder<O: OffsetSize> {
    data_type: DataType,
    offsets: BufferBuilder<O>,
    sizes: BufferBuilder<O>,
    validity: ValidityBuilder,
    values: Box<dyn ArrayBuilder>,
    open: bool,
}

pub type ListViewBuilder = GenericListViewBuilder<i32>;
pub type LargeListViewBuilder = GenericListViewBuilder<i64>;

impl<O: OffsetSize> GenericListViewBuilder<O> {
    pub fn new(value_type: DataType) -> GenericListViewBuilder<O> {
        GenericListViewBuilder::with_field(Arc::new(Field::list_item(value_type)), 0)
    }

    pub fn with_field(field: FieldRef, capacity: usize) -> GenericListViewBuilder<O> {
        let values = make_builder_with_capacity(field.data_type(), capacity);
        let data_type = if O::IS_LARGE {
            DataType::LargeListView(field)
        } else {
            DataType::ListView(field)
        };
        GenericListViewBuilder {
            data_type,
            offsets: BufferBuilder::with_capacity(capacity),
            sizes: BufferBuilder::with_capacity(capacity),
            validity: ValidityBuilder::with_capacity(capacity),
            values,
            open: false,
        }
    }

    /// Opens a new slot whose elements are appended to
    /// [`values`](Self::values) next.
    pub fn append(&mut self, valid: bool) {
        self.push_view(valid, 0);
        self.open = valid;
    }

    /// Opens a slot of a known `size`; the caller appends exactly `size`
    /// elements next.
    pub fn append_with_size(&mut self, valid: bool, size: usize) {
        self.push_view(valid, size);
    }

    fn push_view(&mut self, valid: bool, size: usize) {
        self.close_open();
        self.offsets.append(to_offset(self.values.len()));
        self.sizes.append(to_offset(size));
        self.validity.append(valid);
    }

    fn close_open(&mut self) {
        if !std::mem::take(&mut self.open) {
            return;
        }
        let last = self.offsets.len() - 1;
        let start = self.offsets.as_slice()[last].as_usize();
        self.sizes.as_slice_mut()[last] = to_offset(self.values.len() - start);
    }

    pub fn values(&mut self) -> &mut dyn ArrayBuilder {
        self.values.as_mut()
    }

    pub fn values_as<B: ArrayBuilder>(&mut self) -> &mut B {
        downcast_builder_mut(self.values.as_mut())
    }

    pub fn finish(&mut self) -> GenericListViewArray<O> {
        GenericListViewArray::from_data(self.finish_data())
    }
}

fn to_offset<O: OffsetSize>(pos: usize) -> O {
    O::from_usize_checked(pos)
        .unwrap_or_else(|| panic!("list view offset {pos} overflows {}", O::DATA_TYPE))
}

impl<O: OffsetSize> ArrayBuilder for GenericListViewBuilder<O> {
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
        self.push_view(false, 0);
    }

    fn append_empty_value(&mut self) {
        self.push_view(true, 0);
    }

    fn reserve(&mut self, additional: usize) {
        self.offsets.reserve(additional);
        self.sizes.reserve(additional);
        self.validity.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            self.close_open();
            self.offsets.truncate(len);
            self.sizes.truncate(len);
            self.validity.truncate(len);
        } else {
            self.reserve(len - self.len());
        }
    }

    fn finish_data(&mut self) -> ArrayData {
        self.close_open();
        let len = self.offsets.len();
        let (validity, null_count) = self.validity.finish();
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(self.offsets.finish()), Some(self.sizes.finish())],
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
                self.append_with_size(true, items.len());
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
    use crate::{array::Array, builder::StringBuilder};

    #[test]
    fn test_open_slots_are_sized_lazily() {
        let mut b = ListViewBuilder::new(DataType::Utf8);
        b.append(true);
        b.values_as::<StringBuilder>().append_value("a");
        b.values_as::<StringBuilder>().append_value("b");
        b.append_null();
        b.append(true);
        b.values_as::<StringBuilder>().append_value("c");
        let list = b.finish();
        assert_eq!(list.offsets(), &[0, 2, 2]);
        assert_eq!(list.sizes(), &[2, 0, 1]);
        assert_eq!((&list as &dyn Array).to_string(), r#"[["a" "b"] (null) ["c"]]"#);
        list.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_from_json() {
        let mut b = LargeListViewBuilder::new(DataType::Int64);
        b.append_value_from_str("[1, 2, 3]").unwrap();
        b.append_value_from_str("[]").unwrap();
        let list = b.finish();
        assert_eq!(list.sizes(), &[3, 0]);
        assert_eq!(list.value_str(0), "[1,2,3]");
    }
}

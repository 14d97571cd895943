use std::any::Any;

use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use super::{
    ArrayBuilder, OffsetsBuilder, ValidityBuilder, append_json_text, downcast_builder_mut,
    make_builder_with_capacity,
};
use crate::{array::MapArray, data::ArrayData};

/// Builder of map arrays.
///
/// Keys and items have separate builders; every entry appended to one must
/// be matched by exactly one entry in the other before the next
/// [`append`](Self::append).
#[derive(Debug)]
pub struct MapBuilder {
    data_type: DataType,
    offsets: OffsetsBuilder<i32>,
    validity: ValidityBuilder,
    keys: Box<dyn ArrayBuilder>,
    items: Box<dyn ArrayBuilder>,
}

impl MapBuilder {
    pub fn new(key_type: DataType, item_type: DataType, keys_sorted: bool) -> MapBuilder {
        MapBuilder::with_data_type(DataType::map_of(key_type, item_type, keys_sorted), 0)
    }

    /// # Panics
    ///
    /// Panics when `data_type` is not a map of a two-field struct.
    pub fn with_data_type(data_type: DataType, capacity: usize) -> MapBuilder {
        let (keys, items) = match &data_type {
            DataType::Map(entries, _) => match entries.data_type() {
                DataType::Struct(fields) if fields.len() == 2 => (
                    make_builder_with_capacity(fields[0].data_type(), capacity),
                    make_builder_with_capacity(fields[1].data_type(), capacity),
                ),
                other => panic!("map entries must be a struct of key and value, got {other}"),
            },
            other => panic!("{other} is not a map type"),
        };
        MapBuilder {
            data_type,
            offsets: OffsetsBuilder::with_capacity(capacity),
            validity: ValidityBuilder::with_capacity(capacity),
            keys,
            items,
        }
    }

    /// Opens a new map slot.
    pub fn append(&mut self, valid: bool) {
        self.offsets.push(self.keys.len());
        self.validity.append(valid);
    }

    pub fn keys(&mut self) -> &mut dyn ArrayBuilder {
        self.keys.as_mut()
    }

    pub fn items(&mut self) -> &mut dyn ArrayBuilder {
        self.items.as_mut()
    }

    pub fn keys_as<B: ArrayBuilder>(&mut self) -> &mut B {
        downcast_builder_mut(self.keys.as_mut())
    }

    pub fn items_as<B: ArrayBuilder>(&mut self) -> &mut B {
        downcast_builder_mut(self.items.as_mut())
    }

    pub fn finish(&mut self) -> MapArray {
        MapArray::from_data(self.finish_data())
    }

    fn entries_type(&self) -> &DataType {
        match &self.data_type {
            DataType::Map(entries, _) => entries.data_type(),
            _ => unreachable!("map builder always has a map type"),
        }
    }

    fn append_entry(&mut self, key: &serde_json::Value, item: &serde_json::Value) -> Result<()> {
        if key.is_null() {
            return Err(Error::parse(
                key.to_string(),
                &self.data_type,
                "map keys must not be null",
            ));
        }
        self.keys.append_json(key)?;
        self.items.append_json(item)
    }
}

impl ArrayBuilder for MapBuilder {
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
        self.offsets.push_n(n, self.keys.len());
        self.validity.append_n(n, false);
    }

    fn append_empty_value(&mut self) {
        self.append(true);
    }

    fn append_empty_values(&mut self, n: usize) {
        self.offsets.push_n(n, self.keys.len());
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
            self.keys.resize(end);
            self.items.resize(end);
        } else {
            self.reserve(len - self.len());
        }
    }

    /// # Panics
    ///
    /// Panics when the key and item builders differ in length.
    fn finish_data(&mut self) -> ArrayData {
        let entries_len = self.keys.len();
        assert_eq!(
            entries_len,
            self.items.len(),
            "map builder has {entries_len} keys but {} items",
            self.items.len()
        );
        let entries = ArrayData::new(
            self.entries_type().clone(),
            entries_len,
            0,
            Some(0),
            vec![None],
            vec![self.keys.finish_data(), self.items.finish_data()],
        );
        let len = self.offsets.len();
        let offsets = self.offsets.finish(entries_len);
        let (validity, null_count) = self.validity.finish();
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(offsets)],
            vec![entries],
        )
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        append_json_text(self, s)
    }

    /// Accepts a JSON array of `{"key": .., "value": ..}` objects, or a JSON
    /// object whose members become the entries.
    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        match value {
            serde_json::Value::Null => self.append_null(),
            serde_json::Value::Array(entries) => {
                self.append(true);
                for entry in entries {
                    let serde_json::Value::Object(entry) = entry else {
                        return Err(Error::parse(
                            entry.to_string(),
                            &self.data_type,
                            "expected a {\"key\", \"value\"} object",
                        ));
                    };
                    let key = entry.get("key").unwrap_or(&serde_json::Value::Null);
                    let item = entry.get("value").unwrap_or(&serde_json::Value::Null);
                    self.append_entry(key, item)?;
                }
            }
            serde_json::Value::Object(members) => {
                self.append(true);
                for (key, item) in members {
                    self.append_entry(&serde_json::Value::String(key.clone()), item)?;
                }
            }
            other => {
                return Err(Error::parse(
                    other.to_string(),
                    &self.data_type,
                    "expected a JSON array of entries or a JSON object",
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
        array::Array,
        builder::{Int64Builder, StringBuilder},
    };

    #[test]
    fn test_map_entries() {
        let mut b = MapBuilder::new(DataType::Utf8, DataType::Int64, false);
        b.append(true);
        b.keys_as::<StringBuilder>().append_value("a");
        b.items_as::<Int64Builder>().append_value(1);
        b.keys_as::<StringBuilder>().append_value("b");
        b.items_as::<Int64Builder>().append_null();
        b.append_null();
        b.append_value_from_str(r#"[{"key": "c", "value": 3}]"#).unwrap();
        b.append_value_from_str(r#"{"d": 4}"#).unwrap();
        assert!(b.append_value_from_str(r#"[{"value": 5}]"#).is_err());
        b.resize(4);
        let map = b.finish();
        assert_eq!(map.len(), 4);
        assert_eq!(map.offsets(), &[0, 2, 2, 3, 4]);
        assert_eq!(map.value_str(0), r#"[{"key":"a","value":1},{"key":"b","value":null}]"#);
        assert!(map.is_null(1));
        assert_eq!(map.value_str(3), r#"[{"key":"d","value":4}]"#);
        map.to_data().validate_full().unwrap();
    }

    #[test]
    #[should_panic(expected = "1 keys but 0 items")]
    fn test_unbalanced_entries_panic() {
        let mut b = MapBuilder::new(DataType::Utf8, DataType::Int64, false);
        b.append(true);
        b.keys().append_empty_value();
        b.finish_data();
    }
}

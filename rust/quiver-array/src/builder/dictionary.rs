use std::any::Any;

use quiver_bytes::Buffer;
use quiver_common::{Result, error::Error};
use quiver_format::{DataType, NativeType};

use super::{ArrayBuilder, BufferBuilder, ValidityBuilder, make_builder};
use crate::{
    array::{Array, ArrayRef, DictionaryArray, NULL_VALUE_STR, make_array},
    data::ArrayData,
    dictionary::MemoTable,
    offset::{integer_buffer, integer_max},
};

/// Builder of dictionary arrays.
///
/// Appended values are resolved to codes through a [`MemoTable`]; only the
/// codes are stored per slot. The memo table survives
/// [`finish`](Self::finish), so consecutive arrays share code assignments
/// and [`new_delta`](Self::new_delta) can emit just the dictionary entries
/// added since the previous array.
#[derive(Debug)]
pub struct DictionaryBuilder {
    data_type: DataType,
    index_type: DataType,
    index_max: u64,
    memo: MemoTable,
    indices: BufferBuilder<i64>,
    validity: ValidityBuilder,
    delta_start: usize,
}

impl DictionaryBuilder {
    /// # Panics
    ///
    /// Panics when `data_type` is not a dictionary type with an integer
    /// index type, or when its values cannot be memoized.
    pub fn new(data_type: DataType) -> DictionaryBuilder {
        DictionaryBuilder::try_new(data_type).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(data_type: DataType) -> Result<DictionaryBuilder> {
        let Some((index_type, value_type)) = data_type.dictionary_types() else {
            return Err(Error::invalid_arg(
                "data_type",
                format!("{data_type} is not a dictionary type"),
            ));
        };
        let index_max = integer_max(index_type).ok_or_else(|| {
            Error::invalid_arg(
                "data_type",
                format!("dictionary index type must be an integer, got {index_type}"),
            )
        })?;
        Ok(DictionaryBuilder {
            index_type: index_type.clone(),
            index_max,
            memo: MemoTable::new(value_type)?,
            indices: BufferBuilder::new(),
            validity: ValidityBuilder::new(),
            delta_start: 0,
            data_type,
        })
    }

    /// Builder whose dictionary starts out with the valid values of
    /// `dictionary`, in order.
    pub fn with_dictionary(data_type: DataType, dictionary: &dyn Array) -> Result<DictionaryBuilder> {
        let mut builder = DictionaryBuilder::try_new(data_type)?;
        builder.insert_dict_values(dictionary)?;
        Ok(builder)
    }

    pub fn index_type(&self) -> &DataType {
        &self.index_type
    }

    pub fn value_type(&self) -> &DataType {
        self.memo.value_type()
    }

    /// Number of distinct values memoized so far.
    pub fn dictionary_size(&self) -> usize {
        self.memo.size()
    }

    /// Appends a fixed-width value.
    ///
    /// Fails with `DictionaryIndexOverflow` when the value would need a
    /// code beyond the index type.
    ///
    /// # Panics
    ///
    /// Panics when the value type is not stored as `T`.
    pub fn append_value<T: NativeType>(&mut self, value: T) -> Result<()> {
        self.ensure_room(self.memo.get_native(value))?;
        let (code, _) = self.memo.get_or_insert(value);
        self.push_code(code);
        Ok(())
    }

    /// Appends a value given by its raw bytes (string bytes, binary data or
    /// the little-endian bytes of a fixed-width value).
    pub fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.ensure_room(self.memo.get(value))?;
        let (code, _) = self.memo.get_or_insert_bytes(value);
        self.push_code(code);
        Ok(())
    }

    pub fn append_str(&mut self, value: &str) -> Result<()> {
        self.append_bytes(value.as_bytes())
    }

    /// Appends every slot of `array`, whose type must be the value type.
    pub fn append_array(&mut self, array: &dyn Array) -> Result<()> {
        self.check_value_type(array)?;
        let data = array.data();
        self.reserve(data.len());
        for i in 0..data.len() {
            if data.is_null(i) {
                self.append_null();
            } else {
                self.ensure_room(self.memo.get_slot(data, i))?;
                let (code, _) = self.memo.get_or_insert_slot(data, i);
                self.push_code(code);
            }
        }
        Ok(())
    }

    /// Adds the valid values of `values` to the dictionary without
    /// appending slots.
    pub fn insert_dict_values(&mut self, values: &dyn Array) -> Result<()> {
        self.check_value_type(values)?;
        let data = values.data();
        for i in 0..data.len() {
            if data.is_valid(i) {
                self.ensure_room(self.memo.get_slot(data, i))?;
                self.memo.get_or_insert_slot(data, i);
            }
        }
        Ok(())
    }

    /// Appends raw codes into the current dictionary with the bulk
    /// validity contract of [`ValidityBuilder::append_validity_slice`].
    ///
    /// # Panics
    ///
    /// Panics when a valid code is outside the current dictionary.
    pub fn append_indices(&mut self, indices: &[i64], validity: &[bool]) {
        self.validity.append_validity_slice(indices.len(), validity);
        let size = self.memo.size() as i64;
        for (i, &index) in indices.iter().enumerate() {
            let valid = validity.is_empty() || validity[i];
            assert!(
                !valid || (0..size).contains(&index),
                "dictionary index {index} outside dictionary of size {size}"
            );
            self.indices.append(if valid { index } else { 0 });
        }
    }

    /// Drops the pending slots and forgets the dictionary, so the next
    /// array starts a new dictionary from code 0.
    pub fn reset_full(&mut self) {
        self.indices.truncate(0);
        self.validity.truncate(0);
        self.memo.reset();
        self.delta_start = 0;
    }

    pub fn finish(&mut self) -> DictionaryArray {
        DictionaryArray::from_data(self.finish_data())
    }

    /// Indices appended since the last finish or delta, and the dictionary
    /// entries added since then. Indices refer to the full dictionary.
    pub fn new_delta(&mut self) -> (ArrayRef, ArrayRef) {
        let (len, validity, null_count, indices) = self.take_indices();
        let indices = ArrayData::new(
            self.index_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(indices)],
            vec![],
        );
        let delta = self.memo.dictionary_data(self.delta_start);
        self.delta_start = self.memo.size();
        (make_array(indices), make_array(delta))
    }

    fn take_indices(&mut self) -> (usize, Option<Buffer>, usize, Buffer) {
        let len = self.indices.len();
        let indices = integer_buffer(&self.index_type, self.indices.as_slice().iter().copied());
        self.indices.truncate(0);
        let (validity, null_count) = self.validity.finish();
        (len, validity, null_count, indices)
    }

    /// Fails when a value not yet memoized would get a code beyond the
    /// index type. Leaves the builder unchanged.
    fn ensure_room(&self, existing: Option<usize>) -> Result<()> {
        let next = self.memo.size();
        if existing.is_none() && next as u64 > self.index_max {
            return Err(Error::dictionary_index_overflow(&self.index_type, next + 1));
        }
        Ok(())
    }

    fn push_code(&mut self, code: usize) {
        self.indices.append(code as i64);
        self.validity.append(true);
    }

    fn check_value_type(&self, array: &dyn Array) -> Result<()> {
        if array.data_type() != self.value_type() {
            return Err(Error::type_mismatch(
                "dictionary values",
                self.value_type(),
                array.data_type(),
            ));
        }
        Ok(())
    }

    /// Appends slot 0 of a one-value array of the value type.
    fn append_single(&mut self, value: ArrayData) -> Result<()> {
        if value.is_null(0) {
            self.append_null();
            return Ok(());
        }
        self.ensure_room(self.memo.get_slot(&value, 0))?;
        let (code, _) = self.memo.get_or_insert_slot(&value, 0);
        self.push_code(code);
        Ok(())
    }
}

impl ArrayBuilder for DictionaryBuilder {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn capacity(&self) -> usize {
        self.indices.capacity()
    }

    fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    fn append_null(&mut self) {
        self.indices.append(0);
        self.validity.append(false);
    }

    fn append_nulls(&mut self, n: usize) {
        self.indices.append_n(n, 0);
        self.validity.append_n(n, false);
    }

    /// Appends the value type's empty value, memoizing it if needed.
    fn append_empty_value(&mut self) {
        let mut values = make_builder(self.value_type());
        values.append_empty_value();
        let value = values.finish_data();
        if let Err(e) = self.append_single(value) {
            panic!("cannot append an empty dictionary value: {e}");
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.indices.reserve(additional);
        self.validity.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            self.indices.truncate(len);
            self.validity.truncate(len);
        } else {
            self.reserve(len - self.len());
        }
    }

    /// Indices appended so far with the whole dictionary. The dictionary is
    /// kept for the next array.
    fn finish_data(&mut self) -> ArrayData {
        let (len, validity, null_count, indices) = self.take_indices();
        let dictionary = self.memo.dictionary_data(0);
        self.delta_start = self.memo.size();
        ArrayData::with_dictionary(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(indices)],
            vec![],
            Some(dictionary),
        )
    }

    /// Parses `s` as a value of the value type.
    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        if s == NULL_VALUE_STR {
            self.append_null();
            return Ok(());
        }
        let mut values = make_builder(self.value_type());
        values.append_value_from_str(s)?;
        self.append_single(values.finish_data())
    }

    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        let mut values = make_builder(self.value_type());
        values.append_json(value)?;
        self.append_single(values.finish_data())
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
    use quiver_common::error::ErrorKind;

    use super::*;
    use crate::array::{Int8Array, Int32Array, StringArray};

    fn string_dict(index: DataType) -> DataType {
        DataType::dictionary_of(index, DataType::Utf8)
    }

    #[test]
    fn test_values_become_codes() {
        let mut b = DictionaryBuilder::new(string_dict(DataType::Int8));
        for v in ["a", "b", "a"] {
            b.append_str(v).unwrap();
        }
        b.append_null();
        let array = b.finish();
        assert_eq!(array.dictionary().to_string(), r#"["a" "b"]"#);
        let indices = array.indices().as_any().downcast_ref::<Int8Array>().unwrap();
        assert_eq!(indices.values()[..3], [0, 1, 0]);
        assert!(array.is_null(3));
        array.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_delta_dictionaries() {
        let mut b = DictionaryBuilder::new(string_dict(DataType::UInt16));
        b.append_array(&StringArray::from(vec!["x", "y"])).unwrap();
        let first = b.finish();
        assert_eq!(first.dictionary().len(), 2);

        b.append_array(&StringArray::from(vec![Some("y"), None, Some("z")])).unwrap();
        let (indices, delta) = b.new_delta();
        assert_eq!(indices.to_string(), "[1 (null) 2]");
        assert_eq!(delta.to_string(), r#"["z"]"#);
        assert_eq!(b.dictionary_size(), 3);

        let (indices, delta) = b.new_delta();
        assert!(indices.is_empty() && delta.is_empty());
    }

    #[test]
    fn test_index_overflow() {
        let mut b = DictionaryBuilder::new(DataType::dictionary_of(DataType::Int8, DataType::Int32));
        let values: Vec<i32> = (0..128).collect();
        b.append_array(&Int32Array::from_values(values)).unwrap();
        let err = b.append_value(1000i32).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DictionaryIndexOverflow { .. }));
        assert_eq!(b.len(), 128);
        assert_eq!(b.dictionary_size(), 128);

        // values already in the dictionary still fit
        b.append_value(127i32).unwrap();
        assert!(b.append_bytes(&1000i32.to_le_bytes()).is_err());
        let array = b.finish();
        assert_eq!(array.len(), 129);
        assert_eq!(array.dictionary().len(), 128);
        array.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_reset_full_forgets_dictionary() {
        let mut b = DictionaryBuilder::new(string_dict(DataType::Int8));
        b.append_array(&StringArray::from(vec!["a", "b"])).unwrap();
        let _ = b.finish();
        b.append_str("c").unwrap();
        b.append_null();

        b.reset_full();
        assert_eq!(b.len(), 0);
        assert_eq!(b.null_count(), 0);
        assert_eq!(b.dictionary_size(), 0);

        b.append_str("b").unwrap();
        let (indices, delta) = b.new_delta();
        assert_eq!(indices.to_string(), "[0]");
        assert_eq!(delta.to_string(), r#"["b"]"#);
    }

    #[test]
    fn test_seeded_dictionary_and_raw_indices() {
        let seed = StringArray::from(vec![Some("p"), None, Some("q")]);
        let mut b = DictionaryBuilder::with_dictionary(string_dict(DataType::Int32), &seed).unwrap();
        b.append_indices(&[1, 0, 7], &[true, true, false]);
        b.append_value_from_str("q").unwrap();
        b.append_value_from_str("(null)").unwrap();
        let array = b.finish();
        assert_eq!((&array as &dyn Array).to_string(), r#"["q" "p" (null) "q" (null)]"#);
        assert!(b.append_array(&Int32Array::from_values(vec![1])).is_err());
    }

    #[test]
    #[should_panic(expected = "outside dictionary of size 0")]
    fn test_raw_index_out_of_range_panics() {
        DictionaryBuilder::new(string_dict(DataType::Int8)).append_indices(&[0], &[]);
    }

    #[test]
    fn test_boolean_values_unsupported() {
        let result = DictionaryBuilder::try_new(DataType::dictionary_of(DataType::Int8, DataType::Boolean));
        assert!(result.is_err());
    }
}

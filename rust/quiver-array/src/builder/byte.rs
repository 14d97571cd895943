use std::any::Any;

use quiver_bytes::MutableBuffer;
use quiver_common::Result;
use quiver_format::DataType;

use super::{ArrayBuilder, OffsetsBuilder, ValidityBuilder, parse::decode_base64};
use crate::{
    array::{
        ByteArrayType, GenericBinaryType, GenericByteArray, GenericStringType, NULL_VALUE_STR,
    },
    data::ArrayData,
};

/// Builder of offset-addressed string and binary arrays.
#[derive(Debug)]
pub struct GenericByteBuilder<T: ByteArrayType> {
    data_type: DataType,
    offsets: OffsetsBuilder<T::Offset>,
    values: MutableBuffer,
    validity: ValidityBuilder,
}

pub type StringBuilder = GenericByteBuilder<GenericStringType<i32>>;
pub type LargeStringBuilder = GenericByteBuilder<GenericStringType<i64>>;
pub type BinaryBuilder = GenericByteBuilder<GenericBinaryType<i32>>;
pub type LargeBinaryBuilder = GenericByteBuilder<GenericBinaryType<i64>>;

impl<T: ByteArrayType> Default for GenericByteBuilder<T> {
    fn default() -> Self {
        GenericByteBuilder::with_capacity(0, 0)
    }
}

impl<T: ByteArrayType> GenericByteBuilder<T> {
    pub fn new() -> GenericByteBuilder<T> {
        GenericByteBuilder::default()
    }

    /// Builder with room for `item_capacity` values totalling
    /// `data_capacity` bytes.
    pub fn with_capacity(item_capacity: usize, data_capacity: usize) -> GenericByteBuilder<T> {
        GenericByteBuilder {
            data_type: T::DATA_TYPE,
            offsets: OffsetsBuilder::with_capacity(item_capacity),
            values: MutableBuffer::with_capacity(data_capacity),
            validity: ValidityBuilder::with_capacity(item_capacity),
        }
    }

    pub fn append_value(&mut self, value: impl AsRef<T::Native>) {
        self.offsets.push(self.values.len());
        let value: &T::Native = value.as_ref();
        self.values.extend_from_slice(AsRef::<[u8]>::as_ref(value));
        self.validity.append(true);
    }

    pub fn append_option(&mut self, value: Option<impl AsRef<T::Native>>) {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    /// Appends `values` with per-value validity; an empty `validity` marks
    /// all values valid. Values of null slots are not stored.
    pub fn append_values(&mut self, values: &[&T::Native], validity: &[bool]) {
        self.validity.append_validity_slice(values.len(), validity);
        for (i, value) in values.iter().enumerate() {
            self.offsets.push(self.values.len());
            if validity.is_empty() || validity[i] {
                self.values.extend_from_slice(AsRef::<[u8]>::as_ref(*value));
            }
        }
    }

    /// Number of value bytes appended so far.
    pub fn values_len(&self) -> usize {
        self.values.len()
    }

    pub fn finish(&mut self) -> GenericByteArray<T> {
        GenericByteArray::from_data(self.finish_data())
    }
}

impl<T: ByteArrayType> ArrayBuilder for GenericByteBuilder<T> {
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
        self.offsets.push(self.values.len());
        self.validity.append(false);
    }

    fn append_nulls(&mut self, n: usize) {
        self.offsets.push_n(n, self.values.len());
        self.validity.append_n(n, false);
    }

    fn append_empty_value(&mut self) {
        self.offsets.push(self.values.len());
        self.validity.append(true);
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
            self.values.truncate(end);
            self.validity.truncate(len);
        } else {
            self.reserve(len - self.len());
        }
    }

    fn finish_data(&mut self) -> ArrayData {
        let len = self.offsets.len();
        let (validity, null_count) = self.validity.finish();
        let offsets = self.offsets.finish(self.values.len());
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(offsets), Some(self.values.take())],
            vec![],
        )
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        if s == NULL_VALUE_STR {
            self.append_null();
            return Ok(());
        }
        let bytes = if T::IS_UTF8 {
            s.as_bytes().to_vec()
        } else {
            decode_base64(s, &self.data_type)?
        };
        self.offsets.push(self.values.len());
        self.values.extend_from_slice(&bytes);
        self.validity.append(true);
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
    fn test_string_builder() {
        let mut b = StringBuilder::new();
        b.append_value("hello");
        b.append_null();
        b.append_values(&["a", "skipped", "bc"], &[true, false, true]);
        let array = b.finish();
        assert_eq!(array.offsets(), &[0, 5, 5, 6, 6, 8]);
        assert_eq!(
            array.iter().collect::<Vec<_>>(),
            vec![Some("hello"), None, Some("a"), None, Some("bc")]
        );
        array.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_binary_from_base64() {
        let mut b = LargeBinaryBuilder::new();
        b.append_value_from_str("aGk=").unwrap();
        assert!(b.append_value_from_str("***").is_err());
        let array = b.finish();
        assert_eq!(array.value(0), b"hi");
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn test_resize_drops_tail_bytes() {
        let mut b = StringBuilder::new();
        b.append_value("ab");
        b.append_value("cd");
        b.resize(1);
        assert_eq!(b.values_len(), 2);
        let array = b.finish();
        assert_eq!(array.value_data(), b"ab");
    }
}

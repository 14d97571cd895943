use std::any::Any;

use quiver_bytes::MutableBuffer;
use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use super::{ArrayBuilder, ValidityBuilder, parse::decode_base64};
use crate::{
    array::{FixedSizeBinaryArray, NULL_VALUE_STR},
    data::ArrayData,
};

#[derive(Debug)]
pub struct FixedSizeBinaryBuilder {
    data_type: DataType,
    width: usize,
    values: MutableBuffer,
    validity: ValidityBuilder,
}

impl FixedSizeBinaryBuilder {
    pub fn new(width: i32) -> FixedSizeBinaryBuilder {
        FixedSizeBinaryBuilder::with_capacity(width, 0)
    }

    pub fn with_capacity(width: i32, capacity: usize) -> FixedSizeBinaryBuilder {
        let byte_width = usize::try_from(width)
            .unwrap_or_else(|_| panic!("fixed-size binary width must be non-negative"));
        FixedSizeBinaryBuilder {
            data_type: DataType::FixedSizeBinary(width),
            width: byte_width,
            values: MutableBuffer::with_capacity(capacity * byte_width),
            validity: ValidityBuilder::with_capacity(capacity),
        }
    }

    pub fn value_width(&self) -> usize {
        self.width
    }

    /// # Panics
    ///
    /// Panics when `value` is not exactly `value_width` bytes.
    pub fn append_value(&mut self, value: impl AsRef<[u8]>) {
        let value = value.as_ref();
        assert_eq!(
            value.len(),
            self.width,
            "value of {} bytes appended to {}",
            value.len(),
            self.data_type
        );
        self.values.extend_from_slice(value);
        self.validity.append(true);
    }

    pub fn append_option(&mut self, value: Option<impl AsRef<[u8]>>) {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    pub fn finish(&mut self) -> FixedSizeBinaryArray {
        FixedSizeBinaryArray::from_data(self.finish_data())
    }
}

impl ArrayBuilder for FixedSizeBinaryBuilder {
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
        self.values.extend_with(self.width, 0);
        self.validity.append(false);
    }

    fn append_nulls(&mut self, n: usize) {
        self.values.extend_with(n * self.width, 0);
        self.validity.append_n(n, false);
    }

    fn append_empty_value(&mut self) {
        self.values.extend_with(self.width, 0);
        self.validity.append(true);
    }

    fn append_empty_values(&mut self, n: usize) {
        self.values.extend_with(n * self.width, 0);
        self.validity.append_n(n, true);
    }

    fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional * self.width);
        self.validity.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            self.values.truncate(len * self.width);
            self.validity.truncate(len);
        } else {
            self.reserve(len - self.len());
        }
    }

    fn finish_data(&mut self) -> ArrayData {
        let len = self.validity.len();
        let (validity, null_count) = self.validity.finish();
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(self.values.take())],
            vec![],
        )
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        if s == NULL_VALUE_STR {
            self.append_null();
            return Ok(());
        }
        let bytes = decode_base64(s, &self.data_type)?;
        if bytes.len() != self.width {
            return Err(Error::parse(
                s,
                &self.data_type,
                format!("expected {} bytes, got {}", self.width, bytes.len()),
            ));
        }
        self.append_value(bytes);
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
    fn test_fixed_width_values() {
        let mut b = FixedSizeBinaryBuilder::new(2);
        b.append_value(b"ab");
        b.append_null();
        b.append_value_from_str("Y2Q=").unwrap();
        assert!(b.append_value_from_str("YQ==").is_err());
        let array = b.finish();
        assert_eq!(array.len(), 3);
        assert_eq!(array.value(2), b"cd");
        assert!(array.is_null(1));
    }

    #[test]
    #[should_panic(expected = "appended to")]
    fn test_wrong_width_panics() {
        FixedSizeBinaryBuilder::new(3).append_value(b"ab");
    }
}

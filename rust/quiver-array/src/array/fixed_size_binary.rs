use std::any::Any;

use base64::Engine;
use quiver_format::DataType;

use super::Array;
use crate::{builder::FixedSizeBinaryBuilder, data::ArrayData, marshal::MarshalValue};

/// Array of byte strings of one fixed width.
#[derive(Debug, Clone)]
pub struct FixedSizeBinaryArray {
    data: ArrayData,
    width: usize,
}

impl FixedSizeBinaryArray {
    pub fn from_data(data: ArrayData) -> FixedSizeBinaryArray {
        let width = match data.data_type().storage_type() {
            DataType::FixedSizeBinary(width) => *width as usize,
            other => panic!("{other} data cannot be viewed as fixed_size_binary"),
        };
        FixedSizeBinaryArray { data, width }
    }

    /// Builds an array of `width`-byte values; `None` entries become nulls.
    ///
    /// # Panics
    ///
    /// Panics when a value does not have exactly `width` bytes.
    pub fn from_options<'a>(
        width: i32,
        values: impl IntoIterator<Item = Option<&'a [u8]>>,
    ) -> FixedSizeBinaryArray {
        let mut builder = FixedSizeBinaryBuilder::new(width);
        for value in values {
            builder.append_option(value);
        }
        builder.finish()
    }

    #[inline]
    pub fn value_width(&self) -> usize {
        self.width
    }

    pub fn value(&self, i: usize) -> &[u8] {
        assert!(i < self.len(), "index {i} out of bounds for length {}", self.len());
        let start = (self.data.offset() + i) * self.width;
        match &self.data.buffers()[1] {
            Some(buffer) => &buffer[start..start + self.width],
            None => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&[u8]>> + '_ {
        (0..self.len()).map(|i| self.is_valid(i).then(|| self.value(i)))
    }
}

impl Array for FixedSizeBinaryArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.value(i))
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        MarshalValue::Bytes(self.value(i).to_vec())
    }

    fn display_value(&self, i: usize) -> String {
        if self.is_null(i) {
            super::NULL_VALUE_STR.to_string()
        } else {
            format!("{:?}", self.value(i))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_values() {
        let array = FixedSizeBinaryArray::from_options(2, vec![Some(&b"ab"[..]), None, Some(b"cd")]);
        assert_eq!(array.value_width(), 2);
        assert_eq!(array.value(2), b"cd");
        assert!(array.is_null(1));
        let slice = FixedSizeBinaryArray::from_data(array.to_data().slice(2, 3));
        assert_eq!(slice.value(0), b"cd");
        assert_eq!(slice.value_str(0), "Y2Q=");
    }
}

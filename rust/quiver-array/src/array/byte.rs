use std::{any::Any, marker::PhantomData};

use base64::Engine;
use quiver_format::DataType;

use super::Array;
use crate::{
    builder::GenericByteBuilder, data::ArrayData, marshal::MarshalValue, offset::OffsetSize,
};

/// Variable-length value kinds stored as offsets plus a values buffer.
pub trait ByteArrayType: std::fmt::Debug + Send + Sync + 'static {
    type Offset: OffsetSize;
    type Native: ?Sized + AsRef<[u8]> + AsRef<Self::Native> + std::fmt::Debug;

    const DATA_TYPE: DataType;
    const IS_UTF8: bool;

    /// Reinterprets validated bytes.
    fn from_bytes(bytes: &[u8]) -> &Self::Native;
}

#[derive(Debug)]
pub struct GenericStringType<O>(PhantomData<O>);

#[derive(Debug)]
pub struct GenericBinaryType<O>(PhantomData<O>);

impl<O: OffsetSize> ByteArrayType for GenericStringType<O> {
    type Offset = O;
    type Native = str;

    const DATA_TYPE: DataType = if O::IS_LARGE {
        DataType::LargeUtf8
    } else {
        DataType::Utf8
    };
    const IS_UTF8: bool = true;

    fn from_bytes(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).unwrap_or_else(|e| panic!("string array holds invalid UTF-8: {e}"))
    }
}

impl<O: OffsetSize> ByteArrayType for GenericBinaryType<O> {
    type Offset = O;
    type Native = [u8];

    const DATA_TYPE: DataType = if O::IS_LARGE {
        DataType::LargeBinary
    } else {
        DataType::Binary
    };
    const IS_UTF8: bool = false;

    fn from_bytes(bytes: &[u8]) -> &[u8] {
        bytes
    }
}

/// Array of variable-length strings or byte strings.
#[derive(Debug)]
pub struct GenericByteArray<T: ByteArrayType> {
    data: ArrayData,
    _marker: PhantomData<T>,
}

impl<T: ByteArrayType> Clone for GenericByteArray<T> {
    fn clone(&self) -> Self {
        GenericByteArray {
            data: self.data.clone(),
            _marker: PhantomData,
        }
    }
}

pub type StringArray = GenericByteArray<GenericStringType<i32>>;
pub type LargeStringArray = GenericByteArray<GenericStringType<i64>>;
pub type BinaryArray = GenericByteArray<GenericBinaryType<i32>>;
pub type LargeBinaryArray = GenericByteArray<GenericBinaryType<i64>>;

impl<T: ByteArrayType> GenericByteArray<T> {
    pub fn from_data(data: ArrayData) -> GenericByteArray<T> {
        assert_eq!(
            data.data_type().storage_type(),
            &T::DATA_TYPE,
            "{} data cannot be viewed as {}",
            data.data_type(),
            T::DATA_TYPE
        );
        GenericByteArray {
            data,
            _marker: PhantomData,
        }
    }

    pub fn from_options<V: AsRef<T::Native>>(
        values: impl IntoIterator<Item = Option<V>>,
    ) -> GenericByteArray<T> {
        let mut builder = GenericByteBuilder::<T>::new();
        for value in values {
            builder.append_option(value.as_ref().map(AsRef::<T::Native>::as_ref));
        }
        builder.finish()
    }

    /// The `len + 1` offsets of this array's slots.
    pub fn offsets(&self) -> &[T::Offset] {
        if self.data.buffers()[1].is_none() {
            return &[];
        }
        let offset = self.data.offset();
        &self.data.typed_buffer::<T::Offset>(1)[offset..offset + self.len() + 1]
    }

    /// Start and end of slot `i` in the values buffer.
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

    /// The whole values buffer.
    pub fn value_data(&self) -> &[u8] {
        match &self.data.buffers()[2] {
            Some(buffer) => buffer.as_slice(),
            None => &[],
        }
    }

    pub fn value_bytes(&self, i: usize) -> &[u8] {
        assert!(i < self.len(), "index {i} out of bounds for length {}", self.len());
        let (start, end) = self.value_offsets(i);
        &self.value_data()[start..end]
    }

    pub fn value(&self, i: usize) -> &T::Native {
        T::from_bytes(self.value_bytes(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T::Native>> + '_ {
        (0..self.len()).map(|i| self.is_valid(i).then(|| self.value(i)))
    }
}

impl<T: ByteArrayType> Array for GenericByteArray<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        let bytes = self.value_bytes(i);
        if T::IS_UTF8 {
            String::from_utf8_lossy(bytes).into_owned()
        } else {
            base64::engine::general_purpose::STANDARD.encode(bytes)
        }
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        let bytes = self.value_bytes(i);
        if T::IS_UTF8 {
            MarshalValue::String(String::from_utf8_lossy(bytes).into_owned())
        } else {
            MarshalValue::Bytes(bytes.to_vec())
        }
    }

    fn display_value(&self, i: usize) -> String {
        if self.is_null(i) {
            return super::NULL_VALUE_STR.to_string();
        }
        if T::IS_UTF8 {
            format!("{:?}", self.value_text(i))
        } else {
            format!("{:?}", self.value_bytes(i))
        }
    }
}

impl<O: OffsetSize> From<Vec<&str>> for GenericByteArray<GenericStringType<O>> {
    fn from(values: Vec<&str>) -> Self {
        GenericByteArray::from_options(values.into_iter().map(Some))
    }
}

impl<O: OffsetSize> From<Vec<Option<&str>>> for GenericByteArray<GenericStringType<O>> {
    fn from(values: Vec<Option<&str>>) -> Self {
        GenericByteArray::from_options(values)
    }
}

impl<O: OffsetSize> From<Vec<&[u8]>> for GenericByteArray<GenericBinaryType<O>> {
    fn from(values: Vec<&[u8]>) -> Self {
        GenericByteArray::from_options(values.into_iter().map(Some))
    }
}

impl<O: OffsetSize> From<Vec<Option<&[u8]>>> for GenericByteArray<GenericBinaryType<O>> {
    fn from(values: Vec<Option<&[u8]>>) -> Self {
        GenericByteArray::from_options(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_access() {
        let array = StringArray::from(vec![Some("x"), None, Some("yz")]);
        assert_eq!(array.offsets(), &[0, 1, 1, 3]);
        assert_eq!(array.value(2), "yz");
        assert_eq!(array.value_length(1), 0);
        assert_eq!(
            array.iter().collect::<Vec<_>>(),
            vec![Some("x"), None, Some("yz")]
        );
        assert_eq!((&array as &dyn Array).to_string(), r#"["x" (null) "yz"]"#);
    }

    #[test]
    fn test_sliced_offsets() {
        let array = LargeStringArray::from(vec!["ab", "c", "def"]);
        let slice = LargeStringArray::from_data(array.to_data().slice(1, 3));
        assert_eq!(slice.offsets(), &[2, 3, 6]);
        assert_eq!(slice.value(1), "def");
    }

    #[test]
    fn test_binary_text_is_base64() {
        let array = BinaryArray::from(vec![&b"hi"[..]]);
        assert_eq!(array.value_str(0), "aGk=");
        assert_eq!(array.get_one_for_marshal(0), MarshalValue::Bytes(b"hi".to_vec()));
    }
}

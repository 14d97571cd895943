use std::{any::Any, marker::PhantomData};

use base64::Engine;
use bytemuck::{Pod, Zeroable};
use quiver_bytes::Buffer;
use quiver_format::DataType;

use super::Array;
use crate::{builder::ByteViewBuilder, data::ArrayData, marshal::MarshalValue};

/// 16-byte header of one view slot.
///
/// Values of up to [`ByteView::MAX_INLINE`] bytes live in the 12 bytes after
/// `length`. Longer values keep their first four bytes in `prefix` and point
/// into data buffer `buffer_index` at `offset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ByteView {
    pub length: u32,
    pub prefix: u32,
    pub buffer_index: u32,
    pub offset: u32,
}

impl ByteView {
    pub const MAX_INLINE: usize = 12;

    /// # Panics
    ///
    /// Panics when `bytes` is longer than [`Self::MAX_INLINE`].
    pub fn new_inline(bytes: &[u8]) -> ByteView {
        assert!(bytes.len() <= Self::MAX_INLINE, "value too long to inline");
        let mut raw = [0u8; 16];
        raw[..4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        raw[4..4 + bytes.len()].copy_from_slice(bytes);
        bytemuck::cast(raw)
    }

    /// View of `bytes` stored at `offset` in data buffer `buffer_index`.
    pub fn new_ref(bytes: &[u8], buffer_index: u32, offset: u32) -> ByteView {
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&bytes[..4]);
        ByteView {
            length: bytes.len() as u32,
            prefix: u32::from_le_bytes(prefix),
            buffer_index,
            offset,
        }
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        self.length as usize <= Self::MAX_INLINE
    }

    /// Value bytes of an inline view.
    pub fn inline_bytes(&self) -> &[u8] {
        &bytemuck::bytes_of(self)[4..4 + self.length as usize]
    }
}

pub trait ByteViewType: std::fmt::Debug + Send + Sync + 'static {
    type Native: ?Sized + AsRef<[u8]> + AsRef<Self::Native> + std::fmt::Debug;

    const DATA_TYPE: DataType;
    const IS_UTF8: bool;

    fn from_bytes(bytes: &[u8]) -> &Self::Native;
}

#[derive(Debug)]
pub struct StringViewType;

#[derive(Debug)]
pub struct BinaryViewType;

impl ByteViewType for StringViewType {
    type Native = str;

    const DATA_TYPE: DataType = DataType::Utf8View;
    const IS_UTF8: bool = true;

    fn from_bytes(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).unwrap_or_else(|e| panic!("string view holds invalid UTF-8: {e}"))
    }
}

impl ByteViewType for BinaryViewType {
    type Native = [u8];

    const DATA_TYPE: DataType = DataType::BinaryView;
    const IS_UTF8: bool = false;

    fn from_bytes(bytes: &[u8]) -> &[u8] {
        bytes
    }
}

/// Array of strings or byte strings addressed through 16-byte views.
#[derive(Debug)]
pub struct ByteViewArray<T: ByteViewType> {
    data: ArrayData,
    _marker: PhantomData<T>,
}

impl<T: ByteViewType> Clone for ByteViewArray<T> {
    fn clone(&self) -> Self {
        ByteViewArray {
            data: self.data.clone(),
            _marker: PhantomData,
        }
    }
}

pub type StringViewArray = ByteViewArray<StringViewType>;
pub type BinaryViewArray = ByteViewArray<BinaryViewType>;

impl<T: ByteViewType> ByteViewArray<T> {
    pub fn from_data(data: ArrayData) -> ByteViewArray<T> {
        assert_eq!(
            data.data_type().storage_type(),
            &T::DATA_TYPE,
            "{} data cannot be viewed as {}",
            data.data_type(),
            T::DATA_TYPE
        );
        ByteViewArray {
            data,
            _marker: PhantomData,
        }
    }

    pub fn from_options<V: AsRef<T::Native>>(
        values: impl IntoIterator<Item = Option<V>>,
    ) -> ByteViewArray<T> {
        let mut builder = ByteViewBuilder::<T>::new();
        for value in values {
            builder.append_option(value.as_ref().map(AsRef::<T::Native>::as_ref));
        }
        builder.finish()
    }

    /// Views of this array's slots.
    pub fn views(&self) -> &[ByteView] {
        let offset = self.data.offset();
        &self.data.typed_buffer::<ByteView>(1)[offset..offset + self.len()]
    }

    /// Variadic data buffers referenced by non-inline views.
    pub fn data_buffers(&self) -> impl Iterator<Item = &Buffer> {
        self.data.buffers()[2..].iter().flatten()
    }

    pub fn value_bytes(&self, i: usize) -> &[u8] {
        let view = &self.views()[i];
        if view.is_inline() {
            return view.inline_bytes();
        }
        let buffer = self.data.buffer(2 + view.buffer_index as usize);
        let start = view.offset as usize;
        &buffer[start..start + view.length as usize]
    }

    pub fn value(&self, i: usize) -> &T::Native {
        T::from_bytes(self.value_bytes(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T::Native>> + '_ {
        (0..self.len()).map(|i| self.is_valid(i).then(|| self.value(i)))
    }
}

impl<T: ByteViewType> Array for ByteViewArray<T> {
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
            super::NULL_VALUE_STR.to_string()
        } else if T::IS_UTF8 {
            format!("{:?}", self.value_text(i))
        } else {
            format!("{:?}", self.value_bytes(i))
        }
    }
}

impl From<Vec<&str>> for StringViewArray {
    fn from(values: Vec<&str>) -> Self {
        ByteViewArray::from_options(values.into_iter().map(Some))
    }
}

impl From<Vec<Option<&str>>> for StringViewArray {
    fn from(values: Vec<Option<&str>>) -> Self {
        ByteViewArray::from_options(values)
    }
}

impl From<Vec<&[u8]>> for BinaryViewArray {
    fn from(values: Vec<&[u8]>) -> Self {
        ByteViewArray::from_options(values.into_iter().map(Some))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_and_referenced_views() {
        let array = StringViewArray::from(vec![Some("short"), None, Some("a value longer than twelve")]);
        assert!(array.views()[0].is_inline());
        assert!(!array.views()[2].is_inline());
        assert_eq!(array.value(0), "short");
        assert_eq!(array.value(2), "a value longer than twelve");
        assert_eq!(array.views()[2].prefix.to_le_bytes(), *b"a va");
        assert_eq!(array.value_str(1), "(null)");
        array.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_view_header_layout() {
        let view = ByteView::new_inline(b"abc");
        assert_eq!(view.length, 3);
        assert_eq!(view.inline_bytes(), b"abc");
        assert_eq!(std::mem::size_of::<ByteView>(), 16);
    }
}

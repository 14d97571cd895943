use std::{any::Any, marker::PhantomData};

use quiver_bytes::{Buffer, MutableBuffer};
use quiver_common::Result;
use quiver_format::DataType;

use super::{ArrayBuilder, BufferBuilder, ValidityBuilder, parse::decode_base64};
use crate::{
    array::{BinaryViewType, ByteView, ByteViewArray, ByteViewType, NULL_VALUE_STR, StringViewType},
    data::ArrayData,
};

const DEFAULT_BLOCK_SIZE: usize = 32 * 1024;

/// Builder of view-addressed string and binary arrays.
///
/// Short values are inlined in their views; longer values are copied into
/// data blocks of at least `block_size` bytes.
#[derive(Debug)]
pub struct ByteViewBuilder<T: ByteViewType> {
    data_type: DataType,
    views: BufferBuilder<ByteView>,
    validity: ValidityBuilder,
    completed: Vec<Buffer>,
    in_progress: MutableBuffer,
    block_size: usize,
    _marker: PhantomData<T>,
}

pub type StringViewBuilder = ByteViewBuilder<StringViewType>;
pub type BinaryViewBuilder = ByteViewBuilder<BinaryViewType>;

impl<T: ByteViewType> Default for ByteViewBuilder<T> {
    fn default() -> Self {
        ByteViewBuilder::with_capacity(0)
    }
}

impl<T: ByteViewType> ByteViewBuilder<T> {
    pub fn new() -> ByteViewBuilder<T> {
        ByteViewBuilder::default()
    }

    pub fn with_capacity(capacity: usize) -> ByteViewBuilder<T> {
        ByteViewBuilder {
            data_type: T::DATA_TYPE,
            views: BufferBuilder::with_capacity(capacity),
            validity: ValidityBuilder::with_capacity(capacity),
            completed: Vec::new(),
            in_progress: MutableBuffer::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            _marker: PhantomData,
        }
    }

    /// Sets the minimum size of data blocks.
    pub fn with_block_size(mut self, block_size: usize) -> ByteViewBuilder<T> {
        self.block_size = block_size.max(1);
        self
    }

    pub fn append_value(&mut self, value: impl AsRef<T::Native>) {
        let value: &T::Native = value.as_ref();
        self.append_bytes(AsRef::<[u8]>::as_ref(value));
    }

    pub fn append_option(&mut self, value: Option<impl AsRef<T::Native>>) {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    fn append_bytes(&mut self, bytes: &[u8]) {
        let view = if bytes.len() <= ByteView::MAX_INLINE {
            ByteView::new_inline(bytes)
        } else {
            if !self.in_progress.is_empty()
                && self.in_progress.len() + bytes.len() > self.block_size
            {
                self.flush_block();
            }
            if self.in_progress.capacity() == 0 {
                self.in_progress.reserve(self.block_size.max(bytes.len()));
            }
            let offset = self.in_progress.len();
            self.in_progress.extend_from_slice(bytes);
            let offset =
                u32::try_from(offset).unwrap_or_else(|_| panic!("view offset overflows u32"));
            let index = u32::try_from(self.completed.len())
                .unwrap_or_else(|_| panic!("view buffer index overflows u32"));
            ByteView::new_ref(bytes, index, offset)
        };
        self.views.append(view);
        self.validity.append(true);
    }

    fn flush_block(&mut self) {
        let block = self.in_progress.take();
        self.completed.push(block);
    }

    pub fn finish(&mut self) -> ByteViewArray<T> {
        ByteViewArray::from_data(self.finish_data())
    }
}

impl<T: ByteViewType> ArrayBuilder for ByteViewBuilder<T> {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.views.len()
    }

    fn capacity(&self) -> usize {
        self.views.capacity()
    }

    fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    fn append_null(&mut self) {
        self.views.append(ByteView::default());
        self.validity.append(false);
    }

    fn append_nulls(&mut self, n: usize) {
        self.views.append_n(n, ByteView::default());
        self.validity.append_n(n, false);
    }

    fn append_empty_value(&mut self) {
        self.views.append(ByteView::default());
        self.validity.append(true);
    }

    fn reserve(&mut self, additional: usize) {
        self.views.reserve(additional);
        self.validity.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            self.views.truncate(len);
            self.validity.truncate(len);
        } else {
            self.reserve(len - self.len());
        }
    }

    fn finish_data(&mut self) -> ArrayData {
        if !self.in_progress.is_empty() {
            self.flush_block();
        }
        let len = self.views.len();
        let (validity, null_count) = self.validity.finish();
        let mut buffers = vec![validity, Some(self.views.finish())];
        buffers.extend(self.completed.drain(..).map(Some));
        ArrayData::new(self.data_type.clone(), len, 0, Some(null_count), buffers, vec![])
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        if s == NULL_VALUE_STR {
            self.append_null();
        } else if T::IS_UTF8 {
            self.append_bytes(s.as_bytes());
        } else {
            let bytes = decode_base64(s, &self.data_type)?;
            self.append_bytes(&bytes);
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
    use crate::array::{Array, StringViewArray};

    #[test]
    fn test_blocks_rotate() {
        let mut b = StringViewBuilder::new().with_block_size(20);
        let long = "0123456789abcdef";
        b.append_value(long);
        b.append_value("tiny");
        b.append_value(long);
        b.append_null();
        let array: StringViewArray = b.finish();
        assert_eq!(array.data_buffers().count(), 2);
        assert_eq!(array.views()[2].buffer_index, 1);
        assert_eq!(array.value(2), long);
        assert_eq!(array.value(1), "tiny");
        assert!(array.is_null(3));
        array.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_oversized_value_gets_own_block() {
        let mut b = BinaryViewBuilder::new().with_block_size(4);
        b.append_value(&[7u8; 40][..]);
        let array = b.finish();
        assert_eq!(array.value(0), &[7u8; 40][..]);
    }
}

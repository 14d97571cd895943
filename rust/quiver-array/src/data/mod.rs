//! Physical description of one array: logical type, length, offset, buffers,
//! children and an optional dictionary.
//!
//! [`ArrayData`] is a cheap-clone shared handle. Cloning it retains the
//! whole tree of buffers and children; dropping the last handle releases
//! them. Slicing never copies bytes: the slice shares every buffer and only
//! differs in `offset` and `len`.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use bytemuck::AnyBitPattern;
use quiver_bits::{count_set_bits, get_bit};
use quiver_bytes::Buffer;
use quiver_format::DataType;

mod validate;

/// Sentinel stored while the null count has not been computed yet.
pub const UNKNOWN_NULL_COUNT: i64 = -1;

#[derive(Clone)]
pub struct ArrayData(Arc<ArrayDataInner>);

struct ArrayDataInner {
    data_type: DataType,
    len: usize,
    offset: usize,
    null_count: AtomicI64,
    buffers: Vec<Option<Buffer>>,
    children: Vec<ArrayData>,
    dictionary: Option<ArrayData>,
}

impl ArrayData {
    /// Creates array data from its parts.
    ///
    /// `null_count` of `None` leaves the count to be computed lazily from the
    /// validity bitmap.
    ///
    /// # Panics
    ///
    /// Panics when the number of buffers does not match the layout of
    /// `data_type`, or when a dictionary type comes without a dictionary
    /// (and vice versa).
    pub fn new(
        data_type: DataType,
        len: usize,
        offset: usize,
        null_count: Option<usize>,
        buffers: Vec<Option<Buffer>>,
        children: Vec<ArrayData>,
    ) -> ArrayData {
        ArrayData::with_dictionary(data_type, len, offset, null_count, buffers, children, None)
    }

    /// Like [`ArrayData::new`], for dictionary-encoded types.
    pub fn with_dictionary(
        data_type: DataType,
        len: usize,
        offset: usize,
        null_count: Option<usize>,
        buffers: Vec<Option<Buffer>>,
        children: Vec<ArrayData>,
        dictionary: Option<ArrayData>,
    ) -> ArrayData {
        let layout = data_type.layout();
        assert!(
            layout.accepts_buffer_count(buffers.len()),
            "{data_type}: expected {}{} buffers, got {}",
            if layout.variadic { "at least " } else { "" },
            layout.buffers.len(),
            buffers.len()
        );
        let is_dictionary = matches!(data_type.storage_type(), DataType::Dictionary(..));
        assert_eq!(
            is_dictionary,
            dictionary.is_some(),
            "{data_type}: dictionary data must be present exactly for dictionary types"
        );

        let null_count = match data_type.storage_type() {
            DataType::Null => len as i64,
            _ if !data_type.has_validity_bitmap() => 0,
            _ if buffers.first().is_some_and(|b| b.is_none()) => 0,
            _ => null_count.map_or(UNKNOWN_NULL_COUNT, |n| n as i64),
        };

        ArrayData(Arc::new(ArrayDataInner {
            data_type,
            len,
            offset,
            null_count: AtomicI64::new(null_count),
            buffers,
            children,
            dictionary,
        }))
    }

    pub fn builder(data_type: DataType) -> ArrayDataBuilder {
        ArrayDataBuilder::new(data_type)
    }

    /// A zero-length array of `data_type` with empty buffers.
    pub fn new_empty(data_type: &DataType) -> ArrayData {
        crate::builder::make_builder(data_type).finish_data()
    }

    #[inline]
    pub fn data_type(&self) -> &DataType {
        &self.0.data_type
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.len == 0
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.0.offset
    }

    /// Number of null slots, computed on first use by counting unset bits of
    /// the validity bitmap over `[offset, offset + len)`.
    pub fn null_count(&self) -> usize {
        let known = self.0.null_count.load(Ordering::Relaxed);
        if known >= 0 {
            return known as usize;
        }
        let count = match self.validity() {
            Some(validity) => self.0.len - count_set_bits(validity, self.0.offset, self.0.len),
            None if matches!(self.0.data_type.storage_type(), DataType::Null) => self.0.len,
            None => 0,
        };
        self.0.null_count.store(count as i64, Ordering::Relaxed);
        count
    }

    /// Whether the null count is already known without scanning the bitmap.
    pub fn null_count_is_known(&self) -> bool {
        self.0.null_count.load(Ordering::Relaxed) >= 0
    }

    /// Validity bitmap, `None` when every slot is valid (or the type has no
    /// validity bitmap).
    #[inline]
    pub fn validity(&self) -> Option<&Buffer> {
        if self.0.data_type.has_validity_bitmap() {
            self.0.buffers.first().and_then(|b| b.as_ref())
        } else {
            None
        }
    }

    #[inline]
    pub fn buffers(&self) -> &[Option<Buffer>] {
        &self.0.buffers
    }

    /// The `n`-th buffer.
    ///
    /// # Panics
    ///
    /// Panics when the buffer is absent.
    pub fn buffer(&self, n: usize) -> &Buffer {
        self.0.buffers[n]
            .as_ref()
            .unwrap_or_else(|| panic!("{}: buffer {n} is absent", self.0.data_type))
    }

    /// Typed view of the whole `n`-th buffer, not adjusted by `offset`.
    /// An absent buffer reads as empty.
    pub fn typed_buffer<T: AnyBitPattern>(&self, n: usize) -> &[T] {
        match &self.0.buffers[n] {
            Some(buffer) => buffer.typed_data::<T>(),
            None => &[],
        }
    }

    #[inline]
    pub fn children(&self) -> &[ArrayData] {
        &self.0.children
    }

    #[inline]
    pub fn child(&self, i: usize) -> &ArrayData {
        &self.0.children[i]
    }

    #[inline]
    pub fn dictionary(&self) -> Option<&ArrayData> {
        self.0.dictionary.as_ref()
    }

    /// Whether slot `i` (relative to the offset) is null.
    ///
    /// # Panics
    ///
    /// Panics when `i >= len`.
    pub fn is_null(&self, i: usize) -> bool {
        assert!(
            i < self.0.len,
            "index {i} out of bounds for array of length {}",
            self.0.len
        );
        if matches!(self.0.data_type.storage_type(), DataType::Null) {
            return true;
        }
        match self.validity() {
            Some(validity) => !get_bit(validity, self.0.offset + i),
            None => false,
        }
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        !self.is_null(i)
    }

    /// Zero-copy slice `[i, j)`.
    ///
    /// The null count of the slice is unknown unless the source is known to
    /// have no nulls.
    ///
    /// # Panics
    ///
    /// Panics when `j < i` or `j > len`.
    pub fn slice(&self, i: usize, j: usize) -> ArrayData {
        assert!(i <= j, "invalid slice range: start {i} is greater than end {j}");
        assert!(
            j <= self.0.len,
            "slice end {j} out of bounds for array of length {}",
            self.0.len
        );
        let null_count = match self.0.null_count.load(Ordering::Relaxed) {
            0 => Some(0),
            _ => None,
        };
        ArrayData::with_dictionary(
            self.0.data_type.clone(),
            j - i,
            self.0.offset + i,
            null_count,
            self.0.buffers.clone(),
            self.0.children.clone(),
            self.0.dictionary.clone(),
        )
    }

    /// Same buffers and children, reinterpreted as `data_type`.
    ///
    /// Used to move between an extension type and its storage type.
    ///
    /// # Panics
    ///
    /// Panics when the layouts of both types differ.
    pub fn with_data_type(&self, data_type: DataType) -> ArrayData {
        assert_eq!(
            self.0.data_type.layout(),
            data_type.layout(),
            "cannot reinterpret {} as {}",
            self.0.data_type,
            data_type
        );
        let null_count = self.0.null_count.load(Ordering::Relaxed);
        ArrayData::with_dictionary(
            data_type,
            self.0.len,
            self.0.offset,
            (null_count >= 0).then_some(null_count as usize),
            self.0.buffers.clone(),
            self.0.children.clone(),
            self.0.dictionary.clone(),
        )
    }

    /// Number of live handles to this data.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether both handles refer to the same data.
    pub fn ptr_eq(&self, other: &ArrayData) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn into_builder(self) -> ArrayDataBuilder {
        let null_count = self.0.null_count.load(Ordering::Relaxed);
        ArrayDataBuilder {
            data_type: self.0.data_type.clone(),
            len: self.0.len,
            offset: self.0.offset,
            null_count: (null_count >= 0).then_some(null_count as usize),
            buffers: self.0.buffers.clone(),
            children: self.0.children.clone(),
            dictionary: self.0.dictionary.clone(),
        }
    }
}

impl std::fmt::Debug for ArrayData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayData")
            .field("data_type", &self.0.data_type)
            .field("len", &self.0.len)
            .field("offset", &self.0.offset)
            .field("null_count", &self.0.null_count.load(Ordering::Relaxed))
            .field("buffers", &self.0.buffers)
            .field("children", &self.0.children)
            .field("dictionary", &self.0.dictionary)
            .finish()
    }
}

/// Fluent constructor for [`ArrayData`].
#[derive(Debug, Clone)]
pub struct ArrayDataBuilder {
    data_type: DataType,
    len: usize,
    offset: usize,
    null_count: Option<usize>,
    buffers: Vec<Option<Buffer>>,
    children: Vec<ArrayData>,
    dictionary: Option<ArrayData>,
}

impl ArrayDataBuilder {
    pub fn new(data_type: DataType) -> ArrayDataBuilder {
        ArrayDataBuilder {
            data_type,
            len: 0,
            offset: 0,
            null_count: None,
            buffers: Vec::new(),
            children: Vec::new(),
            dictionary: None,
        }
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn null_count(mut self, null_count: usize) -> Self {
        self.null_count = Some(null_count);
        self
    }

    pub fn buffers(mut self, buffers: Vec<Option<Buffer>>) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn add_buffer(mut self, buffer: Option<Buffer>) -> Self {
        self.buffers.push(buffer);
        self
    }

    pub fn children(mut self, children: Vec<ArrayData>) -> Self {
        self.children = children;
        self
    }

    pub fn add_child(mut self, child: ArrayData) -> Self {
        self.children.push(child);
        self
    }

    pub fn dictionary(mut self, dictionary: ArrayData) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Builds the data, asserting the buffer layout.
    pub fn build(self) -> ArrayData {
        ArrayData::with_dictionary(
            self.data_type,
            self.len,
            self.offset,
            self.null_count,
            self.buffers,
            self.children,
            self.dictionary,
        )
    }

    /// Builds the data and runs the full validation.
    pub fn build_validated(self) -> quiver_common::Result<ArrayData> {
        let data = self.build();
        data.validate_full()?;
        Ok(data)
    }
}

use std::{
    ops::{Range, RangeBounds},
    sync::Arc,
};

use bytemuck::{AnyBitPattern, NoUninit, Pod, Zeroable};

/// Unit of allocation for [`AlignedByteVec`]. Storing bytes as a vector of
/// blocks gives every allocation a 64-byte aligned start without any manual
/// layout management.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
struct Block([u8; BLOCK_SIZE]);

// SAFETY: `Block` is a plain byte array with no padding (size == alignment == 64).
unsafe impl Zeroable for Block {}
// SAFETY: see above; every bit pattern is a valid `Block`.
unsafe impl Pod for Block {}

const BLOCK_SIZE: usize = 64;

const ZERO_BLOCK: Block = Block([0; BLOCK_SIZE]);

/// A byte vector whose data pointer is always aligned to 64 bytes and whose
/// capacity is always a multiple of 64 bytes.
///
/// Newly exposed bytes are always zero: growth allocates zeroed blocks, and
/// truncation zeroes the bytes it drops so that a later `resize` never reveals
/// stale data.
#[derive(Clone, Default)]
pub struct AlignedByteVec {
    blocks: Vec<Block>,
    len: usize,
}

impl AlignedByteVec {
    /// Alignment of the data pointer in bytes.
    pub const ALIGNMENT: usize = BLOCK_SIZE;

    /// Creates a new empty vector with no capacity allocation.
    pub fn new() -> AlignedByteVec {
        AlignedByteVec {
            blocks: Vec::new(),
            len: 0,
        }
    }

    /// Creates a new vector able to hold at least `capacity` bytes without
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> AlignedByteVec {
        let mut blocks = Vec::with_capacity(capacity.div_ceil(BLOCK_SIZE));
        let block_count = blocks.capacity();
        blocks.resize(block_count, ZERO_BLOCK);
        AlignedByteVec { blocks, len: 0 }
    }

    /// Creates a new vector of the specified length, filled with zeros.
    pub fn zeroed(len: usize) -> AlignedByteVec {
        let mut v = AlignedByteVec::with_capacity(len);
        v.len = len;
        v
    }

    /// Creates a new vector containing a copy of the provided slice.
    pub fn copy_from_slice(data: &[u8]) -> AlignedByteVec {
        let mut v = AlignedByteVec::with_capacity(data.len());
        v.extend_from_slice(data);
        v
    }

    /// Returns the number of bytes in the vector.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector contains no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bytes the vector can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * BLOCK_SIZE
    }

    /// Returns a slice containing the entire vector.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &bytemuck::cast_slice::<Block, u8>(&self.blocks)[..self.len]
    }

    /// Returns a mutable slice containing the entire vector.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut bytemuck::cast_slice_mut::<Block, u8>(&mut self.blocks)[..len]
    }

    /// Reserves capacity for at least `additional` more bytes. When the
    /// vector has to grow, its capacity at least doubles.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        let required = self
            .len
            .checked_add(additional)
            .expect("capacity overflow");
        if required <= self.capacity() {
            return;
        }
        let new_capacity = required.max(self.capacity() * 2);
        self.reserve_exact_capacity(new_capacity);
    }

    /// Grows the allocation so that the capacity is at least `capacity` bytes.
    /// Never shrinks.
    pub fn reserve_exact_capacity(&mut self, capacity: usize) {
        let block_count = capacity.div_ceil(BLOCK_SIZE);
        if block_count > self.blocks.len() {
            self.blocks.resize(block_count, ZERO_BLOCK);
        }
    }

    /// Appends a slice to the vector.
    #[inline]
    pub fn extend_from_slice(&mut self, s: &[u8]) {
        self.reserve(s.len());
        let start = self.len;
        self.len += s.len();
        self.as_mut_slice()[start..].copy_from_slice(s);
    }

    /// Appends `count` copies of `value`.
    pub fn extend_with(&mut self, count: usize, value: u8) {
        self.reserve(count);
        let start = self.len;
        self.len += count;
        if value != 0 {
            self.as_mut_slice()[start..].fill(value);
        }
    }

    /// Resizes the vector to the specified length. Growth exposes zero bytes.
    pub fn resize(&mut self, new_len: usize) {
        if new_len > self.len {
            self.reserve(new_len - self.len);
            self.len = new_len;
        } else {
            self.truncate(new_len);
        }
    }

    /// Truncates the vector to the specified length, zeroing the dropped tail.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len < self.len {
            let old_len = self.len;
            bytemuck::cast_slice_mut::<Block, u8>(&mut self.blocks)[new_len..old_len].fill(0);
            self.len = new_len;
        }
    }

    /// Clears the vector, removing all values but keeping the allocation.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Shrinks the capacity of the vector to the smallest multiple of the
    /// block size that holds its contents.
    pub fn shrink_to_fit(&mut self) {
        let block_count = self.len.div_ceil(BLOCK_SIZE);
        self.blocks.truncate(block_count);
        self.blocks.shrink_to_fit();
    }

    /// Returns the total allocated size in bytes.
    pub fn heap_size(&self) -> usize {
        self.blocks.capacity() * BLOCK_SIZE
    }
}

impl AlignedByteVec {
    /// Appends a value of type `T` to the vector by copying its bytes.
    #[inline]
    pub fn push_typed<T: NoUninit>(&mut self, value: T) {
        self.extend_from_slice(bytemuck::bytes_of(&value));
    }

    /// Appends a slice of values of type `T` to the vector by copying their bytes.
    #[inline]
    pub fn extend_from_typed_slice<T: NoUninit>(&mut self, values: &[T]) {
        self.extend_from_slice(bytemuck::cast_slice(values));
    }

    /// Resizes the vector to hold `new_count` elements of type `T`, filling
    /// any new elements with `value`.
    pub fn resize_typed<T>(&mut self, new_count: usize, value: T)
    where
        T: AnyBitPattern + NoUninit,
    {
        let size = std::mem::size_of::<T>();
        let count = self.len / size;
        self.resize(new_count * size);
        if new_count > count {
            self.typed_data_mut::<T>()[count..].fill(value);
        }
    }

    /// Returns a slice of `T` values over the vector's data.
    ///
    /// # Panics
    ///
    /// Panics if the length is not a multiple of `size_of::<T>()`.
    #[inline]
    pub fn typed_data<T: AnyBitPattern>(&self) -> &[T] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Returns a mutable slice of `T` values over the vector's data.
    #[inline]
    pub fn typed_data_mut<T: AnyBitPattern + NoUninit>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.as_mut_slice())
    }
}

impl std::ops::Deref for AlignedByteVec {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl std::ops::DerefMut for AlignedByteVec {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl std::fmt::Debug for AlignedByteVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedByteVec")
            .field("values", &self.as_slice())
            .field("len", &self.len())
            .field("cap", &self.capacity())
            .finish()
    }
}

/// `Buffer` represents a contiguous, immutable memory region with shared
/// ownership semantics.
///
/// Cloning a `Buffer` retains the underlying allocation; dropping the last
/// handle releases it. Buffers can be sliced and cloned without copying data,
/// and are safe to share across threads for concurrent reads.
#[derive(Clone)]
pub struct Buffer {
    owner: Arc<AlignedByteVec>,
    offset: usize,
    len: usize,
}

impl Buffer {
    /// Creates a new empty buffer.
    pub fn new() -> Buffer {
        Self::from_byte_vec(AlignedByteVec::new())
    }

    /// Creates a new buffer that takes ownership of the provided `AlignedByteVec`.
    pub fn from_byte_vec(vec: AlignedByteVec) -> Buffer {
        let len = vec.len();
        Buffer {
            owner: Arc::new(vec),
            offset: 0,
            len,
        }
    }

    /// Creates a new buffer of the specified length, initialized with zero bytes.
    pub fn zeroed(len: usize) -> Buffer {
        Self::from_byte_vec(AlignedByteVec::zeroed(len))
    }

    /// Creates a new buffer containing a copy of the provided slice.
    pub fn copy_from_slice(data: &[u8]) -> Buffer {
        Self::from_byte_vec(AlignedByteVec::copy_from_slice(data))
    }

    /// Creates a new buffer containing a copy of the provided typed values.
    pub fn from_typed_slice<T: NoUninit>(values: &[T]) -> Buffer {
        Self::copy_from_slice(bytemuck::cast_slice(values))
    }

    /// Returns the length of the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a reference to the buffer contents as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.owner.as_slice()[self.offset..self.offset + self.len]
    }

    /// Creates a new buffer representing a subrange of this buffer.
    ///
    /// The returned buffer shares ownership of the underlying memory with the
    /// original buffer.
    ///
    /// # Panics
    ///
    /// Panics if the start index is greater than the end index, or if the end
    /// index is greater than the buffer's length.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Buffer {
        let range = self.verify_range(range);
        Buffer {
            owner: self.owner.clone(),
            offset: self.offset + range.start,
            len: range.end - range.start,
        }
    }

    /// Returns a typed view of the buffer contents.
    ///
    /// # Panics
    ///
    /// Panics if the buffer start is not aligned for `T` or its length is not
    /// a multiple of `size_of::<T>()`.
    #[inline]
    pub fn typed_data<T: AnyBitPattern>(&self) -> &[T] {
        match bytemuck::try_cast_slice(self.as_slice()) {
            Ok(values) => values,
            Err(e) => panic!(
                "buffer of {} bytes at offset {} cannot be viewed as [{}]: {e}",
                self.len,
                self.offset,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Returns a typed view of the whole elements of `T` in the buffer,
    /// ignoring a trailing partial element.
    #[inline]
    pub fn typed_prefix<T: AnyBitPattern>(&self) -> &[T] {
        let size = std::mem::size_of::<T>();
        let whole = self.len / size * size;
        match bytemuck::try_cast_slice(&self.as_slice()[..whole]) {
            Ok(values) => values,
            Err(e) => panic!(
                "buffer at offset {} cannot be viewed as [{}]: {e}",
                self.offset,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Checks if the buffer start is aligned to the specified alignment.
    pub fn is_aligned(&self, alignment: usize) -> bool {
        crate::align::is_ptr_aligned(self.as_slice().as_ptr(), alignment)
    }

    /// Number of live handles sharing the underlying allocation.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.owner)
    }

    /// Returns `true` if both buffers view the same bytes of the same allocation.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner)
            && self.offset == other.offset
            && self.len == other.len
    }

    /// Returns `true` if both buffers share the same allocation, regardless
    /// of the viewed range.
    pub fn shares_allocation(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner)
    }

    /// Attempts to take back the underlying `AlignedByteVec` when this is its
    /// only owner and the buffer views the whole vector.
    pub fn try_into_byte_vec(self) -> Result<AlignedByteVec, Buffer> {
        if self.offset != 0 || self.len != self.owner.len() {
            return Err(self);
        }
        let Buffer { owner, offset, len } = self;
        Arc::try_unwrap(owner).map_err(|owner| Buffer { owner, offset, len })
    }

    fn verify_range(&self, range: impl RangeBounds<usize>) -> Range<usize> {
        use std::ops::Bound;

        let len = self.len();

        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.checked_add(1).expect("out of range"),
            Bound::Unbounded => 0,
        };

        let end = match range.end_bound() {
            Bound::Included(&n) => n.checked_add(1).expect("out of range"),
            Bound::Excluded(&n) => n,
            Bound::Unbounded => len,
        };

        assert!(
            start <= end,
            "range start must not be greater than end: {start} <= {end}",
        );
        assert!(end <= len, "range end out of bounds: {end} <= {len}");

        start..end
    }
}

impl std::ops::Deref for Buffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Buffer) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Buffer {}

impl From<AlignedByteVec> for Buffer {
    fn from(vec: AlignedByteVec) -> Buffer {
        Buffer::from_byte_vec(vec)
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Buffer {
        Buffer::copy_from_slice(data)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Buffer {
        Buffer::copy_from_slice(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_vec_growth_zero_fills() {
        let mut v = AlignedByteVec::new();
        v.extend_from_slice(&[1, 2, 3]);
        assert_eq!(v.capacity(), 64);
        v.resize(100);
        assert_eq!(v.len(), 100);
        assert!(v.capacity() >= 100);
        assert_eq!(&v[..3], &[1, 2, 3]);
        assert!(v[3..].iter().all(|&b| b == 0));
        assert!(crate::align::is_ptr_aligned(v.as_ptr(), 64));
    }

    #[test]
    fn test_aligned_vec_truncate_then_grow() {
        let mut v = AlignedByteVec::copy_from_slice(&[9; 10]);
        v.truncate(2);
        v.resize(10);
        assert_eq!(v.as_slice(), &[9, 9, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_aligned_vec_typed() {
        let mut v = AlignedByteVec::new();
        v.push_typed(1u32);
        v.extend_from_typed_slice(&[2u32, 3]);
        assert_eq!(v.typed_data::<u32>(), &[1, 2, 3]);
        v.resize_typed(5, 7u32);
        assert_eq!(v.typed_data::<u32>(), &[1, 2, 3, 7, 7]);
        v.typed_data_mut::<u32>()[0] = 10;
        assert_eq!(v.typed_data::<u32>()[0], 10);
    }

    #[test]
    fn test_aligned_vec_reserve_doubles() {
        let mut v = AlignedByteVec::with_capacity(64);
        v.resize(64);
        v.reserve(1);
        assert_eq!(v.capacity(), 128);
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 64);
    }

    #[test]
    fn test_buffer_slice_shares_memory() {
        let b = Buffer::copy_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(b.ref_count(), 1);
        let s = b.slice(2..6);
        assert_eq!(s.as_slice(), &[2, 3, 4, 5]);
        assert_eq!(b.ref_count(), 2);
        assert!(s.shares_allocation(&b));
        assert!(!s.ptr_eq(&b));
        let ss = s.slice(1..=2);
        assert_eq!(ss.as_slice(), &[3, 4]);
        drop(s);
        drop(ss);
        assert_eq!(b.ref_count(), 1);
    }

    #[test]
    #[should_panic(expected = "range start must not be greater than end")]
    fn test_buffer_slice_start_after_end() {
        let b = Buffer::zeroed(10);
        #[allow(clippy::reversed_empty_ranges)]
        let _ = b.slice(5..3);
    }

    #[test]
    #[should_panic(expected = "range end out of bounds")]
    fn test_buffer_slice_out_of_bounds() {
        let b = Buffer::zeroed(10);
        let _ = b.slice(5..11);
    }

    #[test]
    fn test_buffer_typed_data() {
        let b = Buffer::from_typed_slice(&[1i64, -2, 3]);
        assert_eq!(b.typed_data::<i64>(), &[1, -2, 3]);
        assert_eq!(b.slice(8..).typed_data::<i64>(), &[-2, 3]);
        assert!(b.is_aligned(64));
    }

    #[test]
    #[should_panic(expected = "cannot be viewed")]
    fn test_buffer_typed_data_misaligned() {
        let b = Buffer::from_typed_slice(&[1i64, -2, 3]);
        let _ = b.slice(1..17).typed_data::<i64>();
    }

    #[test]
    fn test_buffer_typed_prefix() {
        let b = Buffer::copy_from_slice(&[1, 0, 0, 0, 2, 0, 0, 0, 9]);
        assert_eq!(b.typed_prefix::<u32>(), &[1, 2]);
    }

    #[test]
    fn test_buffer_try_into_byte_vec() {
        let b = Buffer::copy_from_slice(&[1, 2, 3]);
        let c = b.clone();
        let b = b.try_into_byte_vec().unwrap_err();
        drop(c);
        let v = b.try_into_byte_vec().unwrap();
        assert_eq!(v.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_buffer_shared_across_threads() {
        let b = Buffer::from_typed_slice(&(0..1000u32).collect::<Vec<_>>());
        let handles = (0..4)
            .map(|i| {
                let b = b.clone();
                std::thread::spawn(move || b.typed_data::<u32>()[i * 100])
            })
            .collect::<Vec<_>>();
        let values = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(values, vec![0, 100, 200, 300]);
        assert_eq!(b.ref_count(), 1);
    }
}

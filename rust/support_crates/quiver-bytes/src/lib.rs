//! Byte buffers for the quiver columnar format, mutable and shared immutable,
//! with built-in 64-byte alignment and zero-filled growth.
//!
//! [`MutableBuffer`] is the working area used by array builders: it grows
//! geometrically, zero-fills newly exposed bytes and finally freezes into an
//! immutable, reference-counted [`Buffer`] that can be sliced and shared
//! across threads without copying.

use bytemuck::{AnyBitPattern, NoUninit};

pub use buffer::{AlignedByteVec, Buffer};

pub mod align;
pub mod buffer;

/// A resizable byte buffer. `len() <= capacity()` always holds, and bytes
/// between the old and new length exposed by [`resize`](Self::resize) are
/// zero.
#[derive(Debug, Default, Clone)]
pub struct MutableBuffer(AlignedByteVec);

impl MutableBuffer {
    /// Creates a new empty buffer without allocating.
    pub fn new() -> MutableBuffer {
        MutableBuffer(AlignedByteVec::new())
    }

    /// Creates a new buffer that can hold at least `capacity` bytes without
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> MutableBuffer {
        MutableBuffer(AlignedByteVec::with_capacity(capacity))
    }

    /// Creates a new buffer of the specified length, filled with zero bytes.
    pub fn zeroed(len: usize) -> MutableBuffer {
        MutableBuffer(AlignedByteVec::zeroed(len))
    }

    /// Creates a new buffer containing a copy of the provided slice.
    pub fn copy_from_slice(s: &[u8]) -> MutableBuffer {
        MutableBuffer(AlignedByteVec::copy_from_slice(s))
    }

    /// Returns the number of used bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of allocated bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    /// Makes room for at least `additional` more bytes.
    ///
    /// Grows only when needed, and then to the next power of two at or above
    /// the required size.
    pub fn reserve(&mut self, additional: usize) {
        let required = self
            .len()
            .checked_add(additional)
            .expect("capacity overflow");
        if required > self.capacity() {
            let target = align::round_up_to_power_of_two(required).unwrap_or(required);
            self.0.reserve_exact_capacity(target);
        }
    }

    /// Sets the length to `new_len`, zero-filling any newly exposed bytes.
    pub fn resize(&mut self, new_len: usize) {
        if new_len > self.len() {
            self.reserve(new_len - self.len());
        }
        self.0.resize(new_len);
    }

    /// Truncates the buffer to `len` bytes; no effect if already shorter.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Clears the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Shrinks the allocation to fit the used bytes.
    pub fn shrink_to_fit(&mut self) {
        self.0.shrink_to_fit();
    }

    /// Appends all bytes from a slice.
    #[inline]
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.0.extend_from_slice(bytes);
    }

    /// Appends `count` copies of `value`.
    pub fn extend_with(&mut self, count: usize, value: u8) {
        self.reserve(count);
        self.0.extend_with(count, value);
    }

    /// Appends one value of type `T` by copying its bytes.
    #[inline]
    pub fn push<T: NoUninit>(&mut self, value: T) {
        self.extend_from_slice(bytemuck::bytes_of(&value));
    }

    /// Appends a slice of `T` values by copying their bytes.
    #[inline]
    pub fn extend_from_typed_slice<T: NoUninit>(&mut self, values: &[T]) {
        self.extend_from_slice(bytemuck::cast_slice(values));
    }

    /// Returns the used bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Returns the used bytes, mutably.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        self.0.as_mut_slice()
    }

    /// Typed view of the used bytes.
    #[inline]
    pub fn typed_data<T: AnyBitPattern>(&self) -> &[T] {
        self.0.typed_data()
    }

    /// Mutable typed view of the used bytes.
    #[inline]
    pub fn typed_data_mut<T: AnyBitPattern + NoUninit>(&mut self) -> &mut [T] {
        self.0.typed_data_mut()
    }

    /// Freezes the contents into an immutable shared [`Buffer`].
    pub fn freeze(self) -> Buffer {
        Buffer::from_byte_vec(self.0)
    }

    /// Freezes the contents into a [`Buffer`], leaving `self` empty and ready
    /// for reuse.
    pub fn take(&mut self) -> Buffer {
        std::mem::take(self).freeze()
    }

    /// Consumes the buffer, returning the underlying `AlignedByteVec`.
    pub fn into_inner(self) -> AlignedByteVec {
        self.0
    }
}

impl std::ops::Deref for MutableBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::ops::DerefMut for MutableBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_slice_mut()
    }
}

impl From<MutableBuffer> for Buffer {
    fn from(buf: MutableBuffer) -> Buffer {
        buf.freeze()
    }
}

impl From<Buffer> for MutableBuffer {
    /// Reclaims the allocation when the buffer is uniquely owned, otherwise copies.
    fn from(buf: Buffer) -> MutableBuffer {
        match buf.try_into_byte_vec() {
            Ok(vec) => MutableBuffer(vec),
            Err(buf) => MutableBuffer::copy_from_slice(buf.as_slice()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutable_buffer_new() {
        let b = MutableBuffer::new();
        assert_eq!(b.len(), 0);
        assert_eq!(b.capacity(), 0);
        assert!(b.is_empty());
    }

    #[test]
    fn test_mutable_buffer_reserve_power_of_two() {
        let mut b = MutableBuffer::new();
        b.reserve(100);
        assert_eq!(b.capacity(), 128);
        b.resize(128);
        b.reserve(1);
        assert_eq!(b.capacity(), 256);
        let cap = b.capacity();
        b.reserve(10);
        assert_eq!(b.capacity(), cap);
    }

    #[test]
    fn test_mutable_buffer_resize_zero_fills() {
        let mut b = MutableBuffer::copy_from_slice(&[5, 5, 5]);
        b.truncate(1);
        b.resize(4);
        assert_eq!(b.as_slice(), &[5, 0, 0, 0]);
        assert!(b.len() <= b.capacity());
    }

    #[test]
    fn test_mutable_buffer_typed_push() {
        let mut b = MutableBuffer::new();
        b.push(1i32);
        b.push(-1i32);
        b.extend_from_typed_slice(&[7i32, 8]);
        assert_eq!(b.typed_data::<i32>(), &[1, -1, 7, 8]);
        b.typed_data_mut::<i32>()[1] = 2;
        assert_eq!(b.freeze().typed_data::<i32>(), &[1, 2, 7, 8]);
    }

    #[test]
    fn test_mutable_buffer_take_resets() {
        let mut b = MutableBuffer::new();
        b.extend_from_slice(b"abc");
        let first = b.take();
        assert!(b.is_empty());
        b.extend_from_slice(b"z");
        let second = b.take();
        assert_eq!(first.as_slice(), b"abc");
        assert_eq!(second.as_slice(), b"z");
    }

    #[test]
    fn test_mutable_buffer_from_unique_buffer() {
        let frozen = MutableBuffer::copy_from_slice(&[1, 2]).freeze();
        let shared = frozen.clone();
        let mut m = MutableBuffer::from(frozen);
        m.extend_from_slice(&[3]);
        assert_eq!(m.as_slice(), &[1, 2, 3]);
        assert_eq!(shared.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_mutable_buffer_random_appends() {
        let mut rng = fastrand::Rng::with_seed(17);
        let mut expected = Vec::new();
        let mut b = MutableBuffer::new();
        for _ in 0..200 {
            let n = rng.usize(0..40);
            let chunk = (0..n).map(|_| rng.u8(..)).collect::<Vec<_>>();
            b.extend_from_slice(&chunk);
            expected.extend_from_slice(&chunk);
            assert!(b.len() <= b.capacity());
        }
        assert_eq!(b.as_slice(), expected.as_slice());
    }
}

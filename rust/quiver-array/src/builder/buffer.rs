use std::marker::PhantomData;

use bytemuck::Pod;
use quiver_bytes::{Buffer, MutableBuffer};

use crate::offset::OffsetSize;

/// Growable buffer of `T` values over a [`MutableBuffer`].
#[derive(Debug)]
pub struct BufferBuilder<T: Pod> {
    buffer: MutableBuffer,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> Default for BufferBuilder<T> {
    fn default() -> Self {
        BufferBuilder {
            buffer: MutableBuffer::new(),
            len: 0,
            _marker: PhantomData,
        }
    }
}

impl<T: Pod> BufferBuilder<T> {
    pub fn new() -> BufferBuilder<T> {
        BufferBuilder::default()
    }

    pub fn with_capacity(capacity: usize) -> BufferBuilder<T> {
        BufferBuilder {
            buffer: MutableBuffer::with_capacity(capacity * size_of::<T>()),
            len: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity() / size_of::<T>().max(1)
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buffer.reserve(additional * size_of::<T>());
    }

    #[inline]
    pub fn append(&mut self, value: T) {
        self.buffer.push(value);
        self.len += 1;
    }

    pub fn append_n(&mut self, n: usize, value: T) {
        if bytemuck::bytes_of(&value).iter().all(|b| *b == 0) {
            self.buffer.extend_with(n * size_of::<T>(), 0);
        } else {
            self.reserve(n);
            for _ in 0..n {
                self.buffer.push(value);
            }
        }
        self.len += n;
    }

    pub fn append_slice(&mut self, values: &[T]) {
        self.buffer.extend_from_typed_slice(values);
        self.len += values.len();
    }

    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.buffer.truncate(len * size_of::<T>());
            self.len = len;
        }
    }

    pub fn as_slice(&self) -> &[T] {
        self.buffer.typed_data()
    }

    pub fn as_slice_mut(&mut self) -> &mut [T] {
        self.buffer.typed_data_mut()
    }

    /// Freezes the values and resets the builder.
    pub fn finish(&mut self) -> Buffer {
        self.len = 0;
        self.buffer.take()
    }
}

/// Start offsets of variable-length slots.
///
/// Each slot records where its values begin; [`finish`](Self::finish)
/// appends the final end position, producing the `len + 1` offsets of the
/// layout.
#[derive(Debug, Default)]
pub struct OffsetsBuilder<O: OffsetSize> {
    starts: BufferBuilder<O>,
}

impl<O: OffsetSize> OffsetsBuilder<O> {
    pub fn new() -> OffsetsBuilder<O> {
        OffsetsBuilder {
            starts: BufferBuilder::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> OffsetsBuilder<O> {
        OffsetsBuilder {
            starts: BufferBuilder::with_capacity(capacity + 1),
        }
    }

    /// Number of slots recorded.
    #[inline]
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.starts.capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.starts.reserve(additional);
    }

    /// Records a slot starting at `pos`.
    ///
    /// # Panics
    ///
    /// Panics when `pos` does not fit `O` or precedes the previous start.
    pub fn push(&mut self, pos: usize) {
        let offset = Self::to_offset(pos);
        if let Some(last) = self.starts.as_slice().last() {
            assert!(*last <= offset, "offsets must be non-decreasing");
        }
        self.starts.append(offset);
    }

    /// Records `n` slots all starting at `pos`.
    pub fn push_n(&mut self, n: usize, pos: usize) {
        if n > 0 {
            self.push(pos);
            self.starts.append_n(n - 1, Self::to_offset(pos));
        }
    }

    /// Start of slot `i`.
    pub fn start(&self, i: usize) -> usize {
        self.starts.as_slice()[i].as_usize()
    }

    pub fn truncate(&mut self, len: usize) {
        self.starts.truncate(len);
    }

    /// Appends the final `end` offset, freezes the `len + 1` offsets and
    /// resets the builder.
    pub fn finish(&mut self, end: usize) -> Buffer {
        self.push(end);
        self.starts.finish()
    }

    fn to_offset(pos: usize) -> O {
        O::from_usize_checked(pos).unwrap_or_else(|| {
            panic!("offset {pos} overflows {}", O::DATA_TYPE)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_builder() {
        let mut b = BufferBuilder::<i32>::new();
        b.append(1);
        b.append_slice(&[2, 3]);
        b.append_n(2, 7);
        b.append_n(1, 0);
        assert_eq!(b.as_slice(), &[1, 2, 3, 7, 7, 0]);
        b.truncate(2);
        let buffer = b.finish();
        assert_eq!(buffer.typed_data::<i32>(), &[1, 2]);
        assert!(b.is_empty());
    }

    #[test]
    fn test_offsets_builder() {
        let mut o = OffsetsBuilder::<i32>::new();
        o.push(0);
        o.push_n(2, 3);
        assert_eq!(o.len(), 3);
        assert_eq!(o.start(2), 3);
        let buffer = o.finish(5);
        assert_eq!(buffer.typed_data::<i32>(), &[0, 3, 3, 5]);
        assert!(o.is_empty());
    }

    #[test]
    #[should_panic(expected = "overflows")]
    fn test_offset_overflow() {
        OffsetsBuilder::<i32>::new().push(i32::MAX as usize + 1);
    }
}

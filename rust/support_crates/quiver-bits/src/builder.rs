use quiver_bytes::{Buffer, MutableBuffer};

use crate::bitmap::{bytes_for_bits, copy_bits, get_bit, set_bit, set_bits, unset_bit};

/// Append-only LSB-first bitmap builder.
///
/// The byte buffer is always exactly `bytes_for_bits(len)` long, and bits past
/// `len` in the last byte are zero.
#[derive(Debug, Default, Clone)]
pub struct BitmapBuilder {
    buffer: MutableBuffer,
    len: usize,
}

impl BitmapBuilder {
    pub fn new() -> BitmapBuilder {
        BitmapBuilder::default()
    }

    pub fn with_capacity(bits: usize) -> BitmapBuilder {
        BitmapBuilder {
            buffer: MutableBuffer::with_capacity(bytes_for_bits(bits)),
            len: 0,
        }
    }

    /// Creates a builder with `len` bits all set to `value`.
    pub fn new_filled(len: usize, value: bool) -> BitmapBuilder {
        let mut builder = BitmapBuilder::with_capacity(len);
        builder.append_n(len, value);
        builder
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bits that fit without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity() * 8
    }

    /// Reserves room for `additional` more bits.
    pub fn reserve(&mut self, additional: usize) {
        let needed = bytes_for_bits(self.len + additional);
        self.buffer.reserve(needed.saturating_sub(self.buffer.len()));
    }

    /// Sets the length to `len` bits. Growth appends unset bits.
    pub fn resize(&mut self, len: usize) {
        if len > self.len {
            self.append_n(len - self.len, false);
        } else {
            self.truncate(len);
        }
    }

    /// Drops bits past `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        self.buffer.truncate(bytes_for_bits(len));
        if len % 8 != 0 {
            let last = len / 8;
            self.buffer.as_slice_mut()[last] &= (1u8 << (len % 8)) - 1;
        }
        self.len = len;
    }

    #[inline]
    pub fn append(&mut self, value: bool) {
        let i = self.len;
        if i % 8 == 0 {
            self.buffer.push(0u8);
        }
        if value {
            set_bit(self.buffer.as_slice_mut(), i);
        }
        self.len += 1;
    }

    /// Appends `n` copies of `value`, filling whole bytes at once once the
    /// builder is byte aligned.
    pub fn append_n(&mut self, n: usize, value: bool) {
        if n == 0 {
            return;
        }
        let start = self.len;
        let new_len = start + n;
        self.buffer.resize(bytes_for_bits(new_len));
        if value {
            let head = (8 - start % 8) % 8;
            let head = head.min(n);
            set_bits(self.buffer.as_slice_mut(), start, head, true);
            let aligned_start = start + head;
            let whole_bytes = (new_len - aligned_start) / 8;
            let first = aligned_start / 8;
            self.buffer.as_slice_mut()[first..first + whole_bytes].fill(0xFF);
            let tail_start = aligned_start + whole_bytes * 8;
            set_bits(
                self.buffer.as_slice_mut(),
                tail_start,
                new_len - tail_start,
                true,
            );
        }
        self.len = new_len;
    }

    /// Appends the given booleans.
    pub fn append_slice(&mut self, values: &[bool]) {
        self.reserve(values.len());
        for &v in values {
            self.append(v);
        }
    }

    /// Appends bits `[offset, offset + len)` from a packed bitmap.
    pub fn append_packed_range(&mut self, src: &[u8], offset: usize, len: usize) {
        let start = self.len;
        self.buffer.resize(bytes_for_bits(start + len));
        copy_bits(src, offset, self.buffer.as_slice_mut(), start, len);
        self.len += len;
    }

    /// Overwrites the bit at `i`, which must be below `len()`.
    pub fn set(&mut self, i: usize, value: bool) {
        assert!(i < self.len, "bit index {i} out of range {}", self.len);
        if value {
            set_bit(self.buffer.as_slice_mut(), i);
        } else {
            unset_bit(self.buffer.as_slice_mut(), i);
        }
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index {i} out of range {}", self.len);
        get_bit(self.buffer.as_slice(), i)
    }

    /// The packed bytes built so far.
    pub fn as_slice(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Freezes the bitmap into a [`Buffer`] and resets the builder.
    pub fn finish(&mut self) -> Buffer {
        self.len = 0;
        self.buffer.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::count_set_bits;

    #[test]
    fn test_append_bits() {
        let mut b = BitmapBuilder::new();
        for i in 0..20 {
            b.append(i % 3 == 0);
        }
        assert_eq!(b.len(), 20);
        assert_eq!(b.as_slice().len(), 3);
        for i in 0..20 {
            assert_eq!(b.get(i), i % 3 == 0);
        }
    }

    #[test]
    fn test_append_n_unaligned() {
        let mut b = BitmapBuilder::new();
        b.append(false);
        b.append_n(30, true);
        b.append_n(3, false);
        b.append_n(9, true);
        assert_eq!(b.len(), 43);
        let bits = b.as_slice();
        assert!(!get_bit(bits, 0));
        assert_eq!(count_set_bits(bits, 1, 30), 30);
        assert_eq!(count_set_bits(bits, 31, 3), 0);
        assert_eq!(count_set_bits(bits, 34, 9), 9);
        assert_eq!(count_set_bits(bits, 0, bits.len() * 8), 39);
    }

    #[test]
    fn test_append_packed_range() {
        let src = [0b1100_1010u8, 0b0000_0011];
        let mut b = BitmapBuilder::new();
        b.append(true);
        b.append_packed_range(&src, 3, 8);
        for i in 0..8 {
            assert_eq!(b.get(1 + i), get_bit(&src, 3 + i));
        }
    }

    #[test]
    fn test_truncate_clears_tail() {
        let mut b = BitmapBuilder::new_filled(16, true);
        b.truncate(3);
        assert_eq!(b.as_slice(), &[0b0000_0111]);
        b.resize(10);
        assert_eq!(b.as_slice(), &[0b0000_0111, 0]);
    }

    #[test]
    fn test_finish_resets() {
        let mut b = BitmapBuilder::new();
        b.append_slice(&[true, false, true]);
        let first = b.finish();
        assert!(b.is_empty());
        b.append(true);
        let second = b.finish();
        assert_eq!(first.as_slice(), &[0b101]);
        assert_eq!(second.as_slice(), &[0b1]);
    }

    #[test]
    fn test_set_overwrites() {
        let mut b = BitmapBuilder::new_filled(5, false);
        b.set(4, true);
        assert!(b.get(4));
        b.set(4, false);
        assert!(!b.get(4));
    }
}

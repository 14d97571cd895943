//! Free functions over LSB-first bitmaps stored in byte slices.

const BIT_MASK: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];
const UNSET_BIT_MASK: [u8; 8] = [
    255 - 1,
    255 - 2,
    255 - 4,
    255 - 8,
    255 - 16,
    255 - 32,
    255 - 64,
    255 - 128,
];

/// Number of bytes needed to hold `bits` bits.
#[inline]
pub fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Returns whether bit `i` is set.
#[inline]
pub fn get_bit(data: &[u8], i: usize) -> bool {
    (data[i >> 3] & BIT_MASK[i & 7]) != 0
}

/// Sets bit `i`.
#[inline]
pub fn set_bit(data: &mut [u8], i: usize) {
    data[i >> 3] |= BIT_MASK[i & 7];
}

/// Clears bit `i`.
#[inline]
pub fn unset_bit(data: &mut [u8], i: usize) {
    data[i >> 3] &= UNSET_BIT_MASK[i & 7];
}

/// Sets or clears bit `i` according to `value`.
#[inline]
pub fn set_bit_to(data: &mut [u8], i: usize, value: bool) {
    if value {
        set_bit(data, i);
    } else {
        unset_bit(data, i);
    }
}

/// Counts the set bits within `[offset, offset + len)`.
///
/// Whole bytes in the middle of the range are counted with `count_ones`,
/// the partial head and tail bytes are masked.
pub fn count_set_bits(data: &[u8], offset: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let end = offset + len;
    assert!(
        bytes_for_bits(end) <= data.len(),
        "bit range {offset}..{end} exceeds bitmap of {} bytes",
        data.len()
    );

    let first_byte = offset / 8;
    let last_byte = (end - 1) / 8;
    let head_mask = 0xFFu8 << (offset % 8);
    let tail_mask = match end % 8 {
        0 => 0xFFu8,
        r => 0xFFu8 >> (8 - r),
    };

    if first_byte == last_byte {
        return (data[first_byte] & head_mask & tail_mask).count_ones() as usize;
    }

    let mut count = (data[first_byte] & head_mask).count_ones() as usize;
    let middle = &data[first_byte + 1..last_byte];
    let (chunks, rest) = middle.split_at(middle.len() / 8 * 8);
    count += chunks
        .chunks_exact(8)
        .map(|c| {
            u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]).count_ones()
                as usize
        })
        .sum::<usize>();
    count += rest.iter().map(|b| b.count_ones() as usize).sum::<usize>();
    count += (data[last_byte] & tail_mask).count_ones() as usize;
    count
}

/// Counts the unset bits within `[offset, offset + len)`.
#[inline]
pub fn count_unset_bits(data: &[u8], offset: usize, len: usize) -> usize {
    len - count_set_bits(data, offset, len)
}

/// Sets every bit in `[offset, offset + len)` to `value`.
pub fn set_bits(data: &mut [u8], offset: usize, len: usize, value: bool) {
    let end = offset + len;
    let mut i = offset;
    while i < end && i % 8 != 0 {
        set_bit_to(data, i, value);
        i += 1;
    }
    let fill = if value { 0xFF } else { 0 };
    while i + 8 <= end {
        data[i / 8] = fill;
        i += 8;
    }
    while i < end {
        set_bit_to(data, i, value);
        i += 1;
    }
}

/// Copies `len` bits from `src` starting at `src_offset` into `dst` starting
/// at `dst_offset`.
///
/// Uses whole-byte copies when both offsets are byte aligned.
pub fn copy_bits(src: &[u8], src_offset: usize, dst: &mut [u8], dst_offset: usize, len: usize) {
    if len == 0 {
        return;
    }
    if src_offset % 8 == 0 && dst_offset % 8 == 0 {
        let whole = len / 8;
        let s = src_offset / 8;
        let d = dst_offset / 8;
        dst[d..d + whole].copy_from_slice(&src[s..s + whole]);
        for i in whole * 8..len {
            set_bit_to(dst, dst_offset + i, get_bit(src, src_offset + i));
        }
        return;
    }
    for i in 0..len {
        set_bit_to(dst, dst_offset + i, get_bit(src, src_offset + i));
    }
}

/// Returns a new byte-aligned bitmap holding bits `[offset, offset + len)`
/// of `src`, starting at bit 0.
pub fn slice_bits(src: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; bytes_for_bits(len)];
    copy_bits(src, offset, &mut out, 0, len);
    out
}

/// Compares two bit ranges of equal length.
pub fn bits_equal(
    left: &[u8],
    left_offset: usize,
    right: &[u8],
    right_offset: usize,
    len: usize,
) -> bool {
    if left_offset % 8 == 0 && right_offset % 8 == 0 {
        let whole = len / 8;
        let l = left_offset / 8;
        let r = right_offset / 8;
        if left[l..l + whole] != right[r..r + whole] {
            return false;
        }
        return (whole * 8..len)
            .all(|i| get_bit(left, left_offset + i) == get_bit(right, right_offset + i));
    }
    (0..len).all(|i| get_bit(left, left_offset + i) == get_bit(right, right_offset + i))
}

//! Buffer-level concatenation shared by the per-type routines.

use quiver_bits::BitmapBuilder;
use quiver_bytes::{Buffer, MutableBuffer};
use quiver_common::{Result, error::Error};

use crate::{array::ByteView, data::ArrayData, offset::OffsetSize};

/// Concatenated validity of `inputs` with its null count, `None` when no
/// input has nulls. Inputs without a bitmap contribute runs of set bits.
pub(super) fn concat_validity(inputs: &[ArrayData], len: usize) -> (Option<Buffer>, usize) {
    let null_count: usize = inputs.iter().map(ArrayData::null_count).sum();
    if null_count == 0 {
        return (None, 0);
    }
    let mut bitmap = BitmapBuilder::with_capacity(len);
    for data in inputs {
        match data.validity() {
            Some(validity) => bitmap.append_packed_range(validity, data.offset(), data.len()),
            None => bitmap.append_n(data.len(), true),
        }
    }
    (Some(bitmap.finish()), null_count)
}

/// Concatenated bits of bitmap buffer `n` of every input.
pub(super) fn concat_bitmaps(inputs: &[ArrayData], n: usize, len: usize) -> Buffer {
    let mut bitmap = BitmapBuilder::with_capacity(len);
    for data in inputs {
        bitmap.append_packed_range(data.buffer(n), data.offset(), data.len());
    }
    bitmap.finish()
}

/// Concatenated values of fixed-width buffer `n`, `width` bytes per slot.
pub(super) fn concat_fixed_width(inputs: &[ArrayData], n: usize, width: usize) -> Buffer {
    let len: usize = inputs.iter().map(ArrayData::len).sum();
    let mut out = MutableBuffer::with_capacity(len * width);
    for data in inputs {
        if data.is_empty() {
            continue;
        }
        let start = data.offset() * width;
        out.extend_from_slice(&data.buffer(n)[start..start + data.len() * width]);
    }
    out.freeze()
}

/// Offsets of each input rebased into one contiguous buffer.
///
/// Returns the new offsets and, per input, the `(start, len)` range of the
/// values it references.
pub(super) fn concat_offsets<O: OffsetSize>(
    inputs: &[ArrayData],
) -> Result<(Buffer, Vec<(usize, usize)>)> {
    let len: usize = inputs.iter().map(ArrayData::len).sum();
    let mut out = Vec::with_capacity(len + 1);
    out.push(O::zero());
    let mut ranges = Vec::with_capacity(inputs.len());
    let mut total = 0usize;
    for data in inputs {
        if data.is_empty() || data.buffers()[1].is_none() {
            ranges.push((0, 0));
            continue;
        }
        let offsets = &data.typed_buffer::<O>(1)[data.offset()..=data.offset() + data.len()];
        let start = offsets[0].as_usize();
        let end = offsets[data.len()].as_usize();
        let new_total = total
            .checked_add(end - start)
            .filter(|&t| O::from_usize_checked(t).is_some())
            .ok_or_else(|| {
                Error::overflow(format!(
                    "concatenated {}offsets exceed {} values",
                    O::PREFIX.to_lowercase(),
                    total + (end - start)
                ))
            })?;
        let base = O::from_usize_checked(total)
            .ok_or_else(|| Error::overflow(format!("offset {total} exceeds offset width")))?;
        out.extend(offsets[1..].iter().map(|&offset| offset - offsets[0] + base));
        ranges.push((start, end - start));
        total = new_total;
    }
    Ok((Buffer::from_typed_slice(&out), ranges))
}

/// Bytes `[start, start + len)` of every input's buffer `n`, appended.
pub(super) fn concat_value_ranges(
    inputs: &[ArrayData],
    n: usize,
    ranges: &[(usize, usize)],
) -> Buffer {
    let total: usize = ranges.iter().map(|(_, len)| len).sum();
    let mut out = MutableBuffer::with_capacity(total);
    for (data, &(start, len)) in inputs.iter().zip(ranges) {
        if len > 0 {
            out.extend_from_slice(&data.buffer(n)[start..start + len]);
        }
    }
    out.freeze()
}

/// View headers of every input followed by all of their data buffers, in
/// layout order after the validity slot.
/// Buffer indices of out-of-line views are shifted past the data buffers
/// of the preceding inputs.
pub(super) fn concat_views(inputs: &[ArrayData]) -> Result<Vec<Option<Buffer>>> {
    let len: usize = inputs.iter().map(ArrayData::len).sum();
    let mut views = Vec::with_capacity(len);
    let mut data_buffers = Vec::new();
    for data in inputs {
        let shift = u32::try_from(data_buffers.len())
            .map_err(|_| Error::overflow("view data buffer count exceeds u32"))?;
        if !data.is_empty() {
            let slots = &data.typed_buffer::<ByteView>(1)[data.offset()..data.offset() + data.len()];
            for view in slots {
                let mut view = *view;
                if !view.is_inline() {
                    view.buffer_index = view.buffer_index.checked_add(shift).ok_or_else(|| {
                        Error::overflow(format!(
                            "view buffer index {} + {shift} exceeds u32",
                            view.buffer_index
                        ))
                    })?;
                }
                views.push(view);
            }
        }
        data_buffers.extend(data.buffers()[2..].iter().cloned());
    }
    let mut buffers = Vec::with_capacity(1 + data_buffers.len());
    buffers.push(Some(Buffer::from_typed_slice(&views)));
    buffers.extend(data_buffers);
    Ok(buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Array, Int32Array, StringArray};

    #[test]
    fn test_validity_without_nulls_is_absent() {
        let a = Int32Array::from_values(vec![1, 2]).to_data();
        assert_eq!(concat_validity(&[a.clone(), a], 4), (None, 0));
    }

    #[test]
    fn test_validity_mixes_bitmaps_and_absent() {
        let a = Int32Array::from_values(vec![1, 2, 3]).to_data().slice(1, 3);
        let b = Int32Array::from_options(vec![None, Some(5)]).to_data();
        let (validity, nulls) = concat_validity(&[a, b], 4);
        assert_eq!(nulls, 1);
        assert_eq!(validity.unwrap().as_slice()[0] & 0b1111, 0b1011);
    }

    #[test]
    fn test_offsets_rebased() {
        let a = StringArray::from(vec!["x", "yz"]).to_data();
        let b = StringArray::from(vec!["q", "ab"]).to_data().slice(1, 2);
        let (offsets, ranges) = concat_offsets::<i32>(&[a, b]).unwrap();
        assert_eq!(offsets.typed_data::<i32>(), &[0, 1, 3, 5]);
        assert_eq!(ranges, vec![(0, 3), (1, 2)]);
    }
}

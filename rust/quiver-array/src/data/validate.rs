//! Layout validation of [`ArrayData`].
//!
//! [`ArrayData::validate`] is cheap and checks buffer sizes and child
//! counts against `offset + len`. [`ArrayData::validate_full`] additionally
//! walks every value: offset monotonicity, UTF-8, list-view ranges, view
//! headers, dictionary indices, union type codes and run ends.

use quiver_bits::bytes_for_bits;
use quiver_common::{Result, checked_or_overflow, error::Error, verify_data};
use quiver_format::{BufferKind, DataType, UnionMode};

use super::ArrayData;
use crate::{
    array::ByteView,
    offset::{OffsetSize, integer_value},
};

impl ArrayData {
    /// Checks buffer sizes and children against the declared length.
    pub fn validate(&self) -> Result<()> {
        let data_type = self.data_type().storage_type().clone();
        let end = checked_or_overflow!(self.offset().checked_add(self.len()), "offset + len");

        let layout = data_type.layout();
        for (i, (kind, buffer)) in layout.buffers.iter().zip(self.buffers()).enumerate() {
            let required = match kind {
                BufferKind::AlwaysNull => {
                    if buffer.is_some() {
                        return Err(invalid(&data_type, format!("buffer {i} must be absent")));
                    }
                    continue;
                }
                BufferKind::Validity | BufferKind::Bitmap => bytes_for_bits(end),
                BufferKind::FixedWidth(width) | BufferKind::Sizes(width) => end * width,
                BufferKind::Offsets(_) if self.is_empty() => 0,
                BufferKind::Offsets(width) => (end + 1) * width,
                // bounded by the last offset, see validate_value_bounds
                BufferKind::Values => 0,
                BufferKind::Views => end * std::mem::size_of::<ByteView>(),
                BufferKind::TypeIds => end,
            };
            match buffer {
                Some(buffer) if buffer.len() < required => {
                    return Err(invalid(
                        &data_type,
                        format!(
                            "buffer {i} holds {} bytes, {required} required for offset {} and length {}",
                            buffer.len(),
                            self.offset(),
                            self.len()
                        ),
                    ));
                }
                None if required > 0 && *kind != BufferKind::Validity => {
                    return Err(invalid(&data_type, format!("buffer {i} is missing")));
                }
                _ => {}
            }
        }

        self.validate_children(&data_type, end)?;
        self.validate_value_bounds(&data_type)
    }

    /// [`validate`](Self::validate) plus per-value checks, recursing into
    /// children and the dictionary.
    pub fn validate_full(&self) -> Result<()> {
        self.validate()?;
        for child in self.children() {
            child.validate_full()?;
        }
        if let Some(dictionary) = self.dictionary() {
            dictionary.validate_full()?;
        }

        let data_type = self.data_type().storage_type().clone();
        match &data_type {
            DataType::Utf8 => self.validate_offsets_full::<i32>(&data_type, self.values_len(2), true),
            DataType::LargeUtf8 => {
                self.validate_offsets_full::<i64>(&data_type, self.values_len(2), true)
            }
            DataType::Binary => {
                self.validate_offsets_full::<i32>(&data_type, self.values_len(2), false)
            }
            DataType::LargeBinary => {
                self.validate_offsets_full::<i64>(&data_type, self.values_len(2), false)
            }
            DataType::List(_) | DataType::Map(..) => {
                self.validate_offsets_full::<i32>(&data_type, self.child(0).len(), false)
            }
            DataType::LargeList(_) => {
                self.validate_offsets_full::<i64>(&data_type, self.child(0).len(), false)
            }
            DataType::ListView(_) => self.validate_list_views::<i32>(&data_type),
            DataType::LargeListView(_) => self.validate_list_views::<i64>(&data_type),
            DataType::Utf8View => self.validate_views(&data_type, true),
            DataType::BinaryView => self.validate_views(&data_type, false),
            DataType::Dictionary(index_type, ..) => self.validate_dictionary_indices(index_type),
            DataType::Union(fields, mode) => {
                let child_ids = fields.child_ids();
                let type_codes = self.typed_buffer::<i8>(1);
                for i in self.offset()..self.offset() + self.len() {
                    let code = type_codes[i];
                    if code < 0 || child_ids[code as usize] < 0 {
                        return Err(invalid(&data_type, format!("invalid type code {code} at {i}")));
                    }
                    if *mode == UnionMode::Dense {
                        let child = &self.children()[child_ids[code as usize] as usize];
                        let value_offset = self.typed_buffer::<i32>(2)[i];
                        if value_offset < 0 || value_offset as usize >= child.len() {
                            return Err(invalid(
                                &data_type,
                                format!("dense offset {value_offset} at {i} out of child range"),
                            ));
                        }
                    }
                }
                Ok(())
            }
            DataType::RunEndEncoded(..) => self.validate_run_ends(&data_type),
            _ => Ok(()),
        }
    }

    fn values_len(&self, n: usize) -> usize {
        self.buffers()[n].as_ref().map_or(0, |b| b.len())
    }

    fn validate_children(&self, data_type: &DataType, end: usize) -> Result<()> {
        let expected = data_type.num_children();
        if self.children().len() != expected {
            return Err(invalid(
                data_type,
                format!("expected {expected} children, got {}", self.children().len()),
            ));
        }
        match data_type {
            DataType::List(field)
            | DataType::LargeList(field)
            | DataType::ListView(field)
            | DataType::LargeListView(field)
            | DataType::Map(field, _) => check_child_type(data_type, field.data_type(), self.child(0)),
            DataType::FixedSizeList(field, size) => {
                check_child_type(data_type, field.data_type(), self.child(0))?;
                let required = end * (*size as usize);
                if self.child(0).len() < required {
                    return Err(invalid(
                        data_type,
                        format!("child holds {} values, {required} required", self.child(0).len()),
                    ));
                }
                Ok(())
            }
            DataType::Struct(fields) => {
                for (field, child) in fields.iter().zip(self.children()) {
                    check_child_type(data_type, field.data_type(), child)?;
                    if child.len() < end {
                        return Err(invalid(
                            data_type,
                            format!("field '{}' holds {} values, {end} required", field.name(), child.len()),
                        ));
                    }
                }
                Ok(())
            }
            DataType::Union(fields, mode) => {
                for ((_, field), child) in fields.iter().zip(self.children()) {
                    check_child_type(data_type, field.data_type(), child)?;
                    if *mode == UnionMode::Sparse && child.len() < end {
                        return Err(invalid(
                            data_type,
                            format!("sparse child '{}' shorter than the union", field.name()),
                        ));
                    }
                }
                Ok(())
            }
            DataType::RunEndEncoded(run_ends, values) => {
                check_child_type(data_type, run_ends.data_type(), self.child(0))?;
                check_child_type(data_type, values.data_type(), self.child(1))?;
                if !matches!(run_ends.data_type(), DataType::Int16 | DataType::Int32 | DataType::Int64) {
                    return Err(invalid(data_type, "run ends must be int16, int32 or int64"));
                }
                verify_data!(run_ends, self.child(0).len() == self.child(1).len());
                verify_data!(run_ends, self.child(0).null_count() == 0);
                Ok(())
            }
            DataType::Dictionary(index_type, value_type, _) => {
                if !index_type.is_integer() {
                    return Err(invalid(data_type, "dictionary index type must be an integer"));
                }
                match self.dictionary() {
                    Some(dictionary) if dictionary.data_type() == value_type.as_ref() => Ok(()),
                    Some(dictionary) => Err(Error::type_mismatch(
                        "dictionary values",
                        value_type,
                        dictionary.data_type(),
                    )),
                    None => Err(invalid(data_type, "dictionary is missing")),
                }
            }
            _ => Ok(()),
        }
    }

    /// Checks the first and last offsets of offset-based layouts.
    fn validate_value_bounds(&self, data_type: &DataType) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        match data_type {
            DataType::Utf8 | DataType::Binary => {
                self.validate_offset_bounds::<i32>(data_type, self.values_len(2))
            }
            DataType::LargeUtf8 | DataType::LargeBinary => {
                self.validate_offset_bounds::<i64>(data_type, self.values_len(2))
            }
            DataType::List(_) | DataType::Map(..) => {
                self.validate_offset_bounds::<i32>(data_type, self.child(0).len())
            }
            DataType::LargeList(_) => {
                self.validate_offset_bounds::<i64>(data_type, self.child(0).len())
            }
            _ => Ok(()),
        }
    }

    fn validate_offset_bounds<O: OffsetSize>(&self, data_type: &DataType, limit: usize) -> Result<()> {
        let offsets = &self.typed_buffer::<O>(1)[self.offset()..=self.offset() + self.len()];
        let first = offsets[0];
        let last = offsets[offsets.len() - 1];
        if first < O::zero() || last < first {
            return Err(invalid(
                data_type,
                format!("offsets {first:?}..{last:?} are not a valid range"),
            ));
        }
        if last.as_usize() > limit {
            return Err(invalid(
                data_type,
                format!("last offset {last:?} exceeds values length {limit}"),
            ));
        }
        Ok(())
    }

    fn validate_offsets_full<O: OffsetSize>(
        &self,
        data_type: &DataType,
        limit: usize,
        utf8: bool,
    ) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let offsets = &self.typed_buffer::<O>(1)[self.offset()..=self.offset() + self.len()];
        for (i, pair) in offsets.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(invalid(
                    data_type,
                    format!("offsets decrease at {i}: {:?} > {:?}", pair[0], pair[1]),
                ));
            }
            if pair[1].as_usize() > limit {
                return Err(invalid(
                    data_type,
                    format!("offset {:?} at {} exceeds values length {limit}", pair[1], i + 1),
                ));
            }
            if utf8 && self.is_valid(i) {
                let bytes = &self.buffer(2)[pair[0].as_usize()..pair[1].as_usize()];
                if let Err(e) = std::str::from_utf8(bytes) {
                    return Err(invalid(data_type, format!("invalid UTF-8 at {i}: {e}")));
                }
            }
        }
        Ok(())
    }

    fn validate_list_views<O: OffsetSize>(&self, data_type: &DataType) -> Result<()> {
        let child_len = self.child(0).len();
        let offsets = self.typed_buffer::<O>(1);
        let sizes = self.typed_buffer::<O>(2);
        for i in 0..self.len() {
            if self.is_null(i) {
                continue;
            }
            let (offset, size) = (offsets[self.offset() + i], sizes[self.offset() + i]);
            if offset < O::zero() || size < O::zero() {
                return Err(invalid(data_type, format!("negative offset or size at {i}")));
            }
            if offset.as_usize() + size.as_usize() > child_len {
                return Err(invalid(
                    data_type,
                    format!(
                        "view {i} ({offset:?}, {size:?}) exceeds child length {child_len}"
                    ),
                ));
            }
        }
        Ok(())
    }

    fn validate_views(&self, data_type: &DataType, utf8: bool) -> Result<()> {
        let views = self.typed_buffer::<ByteView>(1);
        let data_buffers = &self.buffers()[2..];
        for i in 0..self.len() {
            if self.is_null(i) {
                continue;
            }
            let view = &views[self.offset() + i];
            let bytes = if view.is_inline() {
                view.inline_bytes()
            } else {
                let buffer = data_buffers
                    .get(view.buffer_index as usize)
                    .and_then(|b| b.as_ref())
                    .ok_or_else(|| {
                        invalid(
                            data_type,
                            format!("view {i} refers to missing buffer {}", view.buffer_index),
                        )
                    })?;
                let start = view.offset as usize;
                let end = start + view.length as usize;
                if end > buffer.len() {
                    return Err(invalid(
                        data_type,
                        format!("view {i} range {start}..{end} exceeds buffer length {}", buffer.len()),
                    ));
                }
                let bytes = &buffer[start..end];
                if bytes[..4] != view.prefix.to_le_bytes() {
                    return Err(invalid(data_type, format!("view {i} prefix does not match data")));
                }
                bytes
            };
            if utf8 {
                if let Err(e) = std::str::from_utf8(bytes) {
                    return Err(invalid(data_type, format!("invalid UTF-8 at {i}: {e}")));
                }
            }
        }
        Ok(())
    }

    fn validate_dictionary_indices(&self, index_type: &DataType) -> Result<()> {
        let dictionary_len = self.dictionary().map_or(0, |d| d.len()) as i64;
        let Some(indices) = self.buffers()[1].as_ref() else {
            return Ok(());
        };
        for i in 0..self.len() {
            if self.is_null(i) {
                continue;
            }
            let index = integer_value(index_type, indices, self.offset() + i);
            if index < 0 || index >= dictionary_len {
                return Err(Error::index_out_of_bounds(format!(
                    "dictionary index {index} at {i} out of range [0, {dictionary_len})"
                )));
            }
        }
        Ok(())
    }

    fn validate_run_ends(&self, data_type: &DataType) -> Result<()> {
        let run_ends = self.child(0);
        if run_ends.is_empty() {
            return if self.is_empty() {
                Ok(())
            } else {
                Err(invalid(data_type, "no runs for a non-empty array"))
            };
        }
        let buffer = run_ends.buffer(1);
        let mut prev = 0i64;
        for i in 0..run_ends.len() {
            let run_end = integer_value(run_ends.data_type(), buffer, run_ends.offset() + i);
            if run_end <= prev {
                return Err(invalid(
                    data_type,
                    format!("run ends must be positive and strictly increasing, got {run_end} at {i}"),
                ));
            }
            prev = run_end;
        }
        if (prev as u64) < (self.offset() + self.len()) as u64 {
            return Err(invalid(
                data_type,
                format!(
                    "last run end {prev} is less than offset + length {}",
                    self.offset() + self.len()
                ),
            ));
        }
        Ok(())
    }
}

fn check_child_type(parent: &DataType, expected: &DataType, child: &ArrayData) -> Result<()> {
    if child.data_type() != expected {
        return Err(Error::type_mismatch(
            format!("child of {parent}"),
            expected,
            child.data_type(),
        ));
    }
    Ok(())
}

fn invalid(data_type: &DataType, message: impl Into<String>) -> Error {
    Error::invalid_data(data_type.to_string(), message)
}

#[cfg(test)]
mod tests {
    use quiver_bytes::Buffer;
    use quiver_common::ErrorKind;
    use quiver_format::DataType;

    use crate::{
        array::{Array, StringArray},
        data::ArrayData,
    };

    fn utf8(offsets: &[i32], values: &[u8]) -> ArrayData {
        ArrayData::new(
            DataType::Utf8,
            offsets.len() - 1,
            0,
            None,
            vec![
                None,
                Some(Buffer::from_typed_slice(offsets)),
                Some(Buffer::copy_from_slice(values)),
            ],
            vec![],
        )
    }

    #[test]
    fn test_valid_string_data() {
        let data = utf8(&[0, 1, 3], b"abc");
        data.validate_full().unwrap();
    }

    #[test]
    fn test_short_values_buffer() {
        let err = utf8(&[0, 1, 5], b"abc").validate().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidData { .. }));
    }

    #[test]
    fn test_empty_and_null_strings() {
        utf8(&[0, 0, 0, 0], b"").validate_full().unwrap();

        let array = StringArray::from(vec![Some("ab"), None, Some(""), None]);
        let data = array.to_data();
        data.validate_full().unwrap();
        data.slice(1, 4).validate_full().unwrap();
    }

    #[test]
    fn test_decreasing_offsets() {
        let data = utf8(&[0, 2, 1, 3], b"abc");
        data.validate().unwrap();
        let err = data.validate_full().unwrap_err();
        assert!(err.to_string().contains("decrease"), "{err}");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = utf8(&[0, 2], &[0xff, 0xfe]).validate_full().unwrap_err();
        assert!(err.to_string().contains("UTF-8"), "{err}");
    }

    #[test]
    fn test_short_fixed_width_buffer() {
        let data = ArrayData::new(
            DataType::Int64,
            3,
            0,
            None,
            vec![None, Some(Buffer::from_typed_slice(&[1i64, 2]))],
            vec![],
        );
        assert!(data.validate().is_err());
        assert!(data.slice(0, 2).validate().is_ok());
    }

    #[test]
    fn test_dictionary_index_bounds() {
        let dictionary = utf8(&[0, 1, 2], b"ab");
        let data = ArrayData::with_dictionary(
            DataType::dictionary_of(DataType::Int8, DataType::Utf8),
            3,
            0,
            None,
            vec![None, Some(Buffer::from_typed_slice(&[0i8, 1, 2]))],
            vec![],
            Some(dictionary),
        );
        let err = data.validate_full().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexOutOfBounds { .. }));
        data.slice(0, 2).validate_full().unwrap();
    }

    #[test]
    fn test_run_ends_must_increase() {
        let run_ends = ArrayData::new(
            DataType::Int32,
            2,
            0,
            None,
            vec![None, Some(Buffer::from_typed_slice(&[3i32, 3]))],
            vec![],
        );
        let values = ArrayData::new(
            DataType::Int64,
            2,
            0,
            None,
            vec![None, Some(Buffer::from_typed_slice(&[1i64, 2]))],
            vec![],
        );
        let data = ArrayData::new(
            DataType::run_end_encoded_of(DataType::Int32, DataType::Int64),
            3,
            0,
            None,
            vec![None],
            vec![run_ends, values],
        );
        assert!(data.validate().is_ok());
        assert!(data.validate_full().is_err());
    }
}

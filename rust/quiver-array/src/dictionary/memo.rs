//! Hash table assigning dense codes to distinct values.

use std::borrow::Cow;

use ahash::AHashMap;
use quiver_bytes::MutableBuffer;
use quiver_common::{Result, error::Error};
use quiver_format::{DataType, NativeType, f16};

use crate::{
    array::{
        BinaryViewType, ByteArrayType, ByteView, ByteViewType, GenericBinaryType,
        GenericStringType, StringViewType,
    },
    builder::{ArrayBuilder, ByteViewBuilder, GenericByteBuilder, ValidityBuilder},
    data::ArrayData,
};

/// How the memo table stores the values of its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    /// Only nulls.
    Null,
    /// Fixed-width values of the given byte width.
    Fixed(usize),
    /// Variable-length strings or byte strings.
    Bytes,
}

/// Maps distinct values to codes `0, 1, 2, ...` in insertion order.
///
/// Values are keyed by their byte representation. For floating point
/// types every NaN is stored as the canonical quiet NaN, so all NaN
/// payloads share one code. Null can be inserted once and gets a code like
/// any other value.
#[derive(Debug)]
pub struct MemoTable {
    value_type: DataType,
    kind: ValueKind,
    entries: AHashMap<Vec<u8>, usize>,
    values: Vec<Vec<u8>>,
    null_index: Option<usize>,
}

impl MemoTable {
    /// Creates an empty table for values of `value_type`.
    ///
    /// Fails with `NotImplemented` for booleans and nested types.
    pub fn new(value_type: &DataType) -> Result<MemoTable> {
        let storage = value_type.storage_type();
        let kind = match storage {
            DataType::Null => ValueKind::Null,
            DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Binary
            | DataType::LargeBinary
            | DataType::Utf8View
            | DataType::BinaryView => ValueKind::Bytes,
            other => match other.primitive_width() {
                Some(width) => ValueKind::Fixed(width),
                None => {
                    return Err(Error::not_implemented(format!(
                        "memo table for {value_type} values"
                    )));
                }
            },
        };
        Ok(MemoTable {
            value_type: value_type.clone(),
            kind,
            entries: AHashMap::default(),
            values: Vec::new(),
            null_index: None,
        })
    }

    pub fn value_type(&self) -> &DataType {
        &self.value_type
    }

    /// Number of distinct values, null included.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Code of `value`, inserting it when unseen. The flag tells whether
    /// the value was inserted by this call.
    ///
    /// # Panics
    ///
    /// Panics when the table's type is not stored as `T`.
    pub fn get_or_insert<T: NativeType>(&mut self, value: T) -> (usize, bool) {
        self.assert_native::<T>();
        self.get_or_insert_bytes(bytemuck::bytes_of(&value))
    }

    /// Like [`get_or_insert`](Self::get_or_insert), for the raw bytes of a
    /// value.
    ///
    /// # Panics
    ///
    /// Panics when the table holds fixed-width values and `value` has a
    /// different width, or when it holds only nulls.
    pub fn get_or_insert_bytes(&mut self, value: &[u8]) -> (usize, bool) {
        let key = self.canonical(value);
        if let Some(&code) = self.entries.get(key.as_ref()) {
            return (code, false);
        }
        let code = self.values.len();
        let key = key.into_owned();
        self.values.push(key.clone());
        self.entries.insert(key, code);
        (code, true)
    }

    pub fn get_or_insert_null(&mut self) -> (usize, bool) {
        match self.null_index {
            Some(code) => (code, false),
            None => {
                let code = self.values.len();
                self.values.push(Vec::new());
                self.null_index = Some(code);
                (code, true)
            }
        }
    }

    /// Code of slot `i` of `data`, inserting the value when unseen.
    ///
    /// # Panics
    ///
    /// Panics when `data` does not hold values of the table's type.
    pub fn get_or_insert_slot(&mut self, data: &ArrayData, i: usize) -> (usize, bool) {
        if data.is_null(i) {
            self.get_or_insert_null()
        } else {
            self.get_or_insert_bytes(value_bytes(data, i))
        }
    }

    /// Code of `value` if present.
    pub fn get(&self, value: &[u8]) -> Option<usize> {
        if self.kind == ValueKind::Null {
            return None;
        }
        self.entries.get(self.canonical(value).as_ref()).copied()
    }

    /// Code of a fixed-width `value` if present.
    ///
    /// # Panics
    ///
    /// Panics when the table's type is not stored as `T`.
    pub fn get_native<T: NativeType>(&self, value: T) -> Option<usize> {
        self.assert_native::<T>();
        self.get(bytemuck::bytes_of(&value))
    }

    pub fn get_null(&self) -> Option<usize> {
        self.null_index
    }

    /// Code of slot `i` of `data` if its value is present.
    pub fn get_slot(&self, data: &ArrayData, i: usize) -> Option<usize> {
        if data.is_null(i) {
            self.get_null()
        } else {
            self.get(value_bytes(data, i))
        }
    }

    /// Forgets every value.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.values.clear();
        self.null_index = None;
    }

    /// Values with codes `start..size()` as an array of the table's type,
    /// in code order.
    ///
    /// # Panics
    ///
    /// Panics when `start > size()`.
    pub fn dictionary_data(&self, start: usize) -> ArrayData {
        assert!(
            start <= self.size(),
            "dictionary start {start} past memo table size {}",
            self.size()
        );
        let storage = self.value_type.storage_type();
        let data = match (self.kind, storage) {
            (ValueKind::Null, _) => {
                let len = self.size() - start;
                ArrayData::new(DataType::Null, len, 0, Some(len), vec![None], vec![])
            }
            (ValueKind::Fixed(width), _) => self.fixed_data(storage, width, start),
            (_, DataType::Utf8) => self.bytes_data::<GenericStringType<i32>>(start),
            (_, DataType::LargeUtf8) => self.bytes_data::<GenericStringType<i64>>(start),
            (_, DataType::Binary) => self.bytes_data::<GenericBinaryType<i32>>(start),
            (_, DataType::LargeBinary) => self.bytes_data::<GenericBinaryType<i64>>(start),
            (_, DataType::Utf8View) => self.views_data::<StringViewType>(start),
            (_, DataType::BinaryView) => self.views_data::<BinaryViewType>(start),
            (_, other) => unreachable!("memo table kind does not match {other}"),
        };
        if matches!(self.value_type, DataType::Extension(_)) {
            data.with_data_type(self.value_type.clone())
        } else {
            data
        }
    }

    fn assert_native<T: NativeType>(&self) {
        assert!(
            T::is_compatible(&self.value_type),
            "{} values cannot be memoized as {}",
            self.value_type,
            T::DATA_TYPE
        );
    }

    fn is_null_code(&self, code: usize) -> bool {
        self.null_index == Some(code)
    }

    fn fixed_data(&self, storage: &DataType, width: usize, start: usize) -> ArrayData {
        let len = self.size() - start;
        let mut values = MutableBuffer::with_capacity(len * width);
        let mut validity = ValidityBuilder::with_capacity(len);
        for code in start..self.size() {
            if self.is_null_code(code) {
                values.extend_with(width, 0);
                validity.append(false);
            } else {
                values.extend_from_slice(&self.values[code]);
                validity.append(true);
            }
        }
        let (validity, null_count) = validity.finish();
        ArrayData::new(
            storage.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(values.freeze())],
            vec![],
        )
    }

    fn bytes_data<T: ByteArrayType>(&self, start: usize) -> ArrayData {
        let bytes = self.values[start..].iter().map(Vec::len).sum();
        let mut builder = GenericByteBuilder::<T>::with_capacity(self.size() - start, bytes);
        for code in start..self.size() {
            if self.is_null_code(code) {
                builder.append_null();
            } else {
                builder.append_value(T::from_bytes(&self.values[code]));
            }
        }
        builder.finish_data()
    }

    fn views_data<T: ByteViewType>(&self, start: usize) -> ArrayData {
        let mut builder = ByteViewBuilder::<T>::with_capacity(self.size() - start);
        for code in start..self.size() {
            if self.is_null_code(code) {
                builder.append_null();
            } else {
                builder.append_value(T::from_bytes(&self.values[code]));
            }
        }
        builder.finish_data()
    }

    /// Key under which `value` is stored.
    fn canonical<'a>(&self, value: &'a [u8]) -> Cow<'a, [u8]> {
        match self.kind {
            ValueKind::Fixed(width) => assert_eq!(
                value.len(),
                width,
                "value of {} bytes for {} with width {width}",
                value.len(),
                self.value_type
            ),
            ValueKind::Null => panic!("only nulls can be memoized for {}", self.value_type),
            ValueKind::Bytes => return Cow::Borrowed(value),
        }
        let is_nan = match self.value_type.storage_type() {
            DataType::Float16 => f16::from_le_bytes([value[0], value[1]]).is_nan(),
            DataType::Float32 => f32::from_le_bytes(fixed_bytes(value)).is_nan(),
            DataType::Float64 => f64::from_le_bytes(fixed_bytes(value)).is_nan(),
            _ => false,
        };
        if !is_nan {
            return Cow::Borrowed(value);
        }
        Cow::Owned(match self.value_type.storage_type() {
            DataType::Float16 => f16::NAN.to_le_bytes().to_vec(),
            DataType::Float32 => f32::NAN.to_le_bytes().to_vec(),
            _ => f64::NAN.to_le_bytes().to_vec(),
        })
    }
}

fn fixed_bytes<const N: usize>(value: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(value);
    bytes
}

/// Bytes of the valid slot `i` of a fixed-width or byte-like array.
///
/// # Panics
///
/// Panics for types without a byte representation per slot (booleans,
/// nested types).
pub(crate) fn value_bytes(data: &ArrayData, i: usize) -> &[u8] {
    let pos = data.offset() + i;
    match data.data_type().storage_type() {
        DataType::Utf8 | DataType::Binary => {
            let offsets = data.typed_buffer::<i32>(1);
            &data.buffer(2)[offsets[pos] as usize..offsets[pos + 1] as usize]
        }
        DataType::LargeUtf8 | DataType::LargeBinary => {
            let offsets = data.typed_buffer::<i64>(1);
            &data.buffer(2)[offsets[pos] as usize..offsets[pos + 1] as usize]
        }
        DataType::Utf8View | DataType::BinaryView => {
            let view = &data.typed_buffer::<ByteView>(1)[pos];
            if view.is_inline() {
                view.inline_bytes()
            } else {
                let start = view.offset as usize;
                &data.buffer(2 + view.buffer_index as usize)[start..start + view.length as usize]
            }
        }
        other => match other.primitive_width() {
            Some(width) => &data.buffer(1)[pos * width..(pos + 1) * width],
            None => panic!("{other} values have no byte representation"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Array, Float64Array, StringArray, make_array};

    #[test]
    fn test_codes_are_stable() {
        let mut memo = MemoTable::new(&DataType::Utf8).unwrap();
        assert_eq!(memo.get_or_insert_bytes(b"a"), (0, true));
        assert_eq!(memo.get_or_insert_bytes(b"b"), (1, true));
        assert_eq!(memo.get_or_insert_bytes(b"a"), (0, false));
        assert_eq!(memo.get_or_insert_null(), (2, true));
        assert_eq!(memo.get_or_insert_null(), (2, false));
        assert_eq!(memo.get(b"b"), Some(1));
        assert_eq!(memo.get(b"z"), None);
        assert_eq!(memo.size(), 3);

        let dictionary = make_array(memo.dictionary_data(0));
        assert_eq!(dictionary.to_string(), r#"["a" "b" (null)]"#);
        let delta = make_array(memo.dictionary_data(1));
        assert_eq!(delta.to_string(), r#"["b" (null)]"#);
    }

    #[test]
    fn test_nans_share_a_code() {
        let mut memo = MemoTable::new(&DataType::Float64).unwrap();
        let other_nan = f64::from_bits(f64::NAN.to_bits() | 1);
        assert!(other_nan.is_nan());
        assert_eq!(memo.get_or_insert(f64::NAN), (0, true));
        assert_eq!(memo.get_or_insert(other_nan), (0, false));
        assert_eq!(memo.get_or_insert(-0.0f64), (1, true));
        assert_eq!(memo.get_or_insert(0.0f64), (2, true));
        let dictionary = make_array(memo.dictionary_data(0));
        let floats = dictionary.as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(floats.value(0).is_nan());
    }

    #[test]
    fn test_slots_of_sliced_arrays() {
        let array = StringArray::from(vec![Some("x"), None, Some("y"), Some("x")]);
        let data = array.to_data().slice(1, 4);
        let mut memo = MemoTable::new(&DataType::Utf8).unwrap();
        let codes: Vec<usize> = (0..data.len()).map(|i| memo.get_or_insert_slot(&data, i).0).collect();
        assert_eq!(codes, vec![0, 1, 2]);
        assert_eq!(memo.get_null(), Some(0));
    }

    #[test]
    fn test_reset_and_unsupported_types() {
        let mut memo = MemoTable::new(&DataType::Int16).unwrap();
        memo.get_or_insert(7i16);
        memo.reset();
        assert_eq!(memo.size(), 0);
        assert_eq!(memo.get_or_insert(9i16), (0, true));
        assert!(MemoTable::new(&DataType::Boolean).is_err());
        assert!(MemoTable::new(&DataType::list_of(DataType::Int8)).is_err());
    }

    #[test]
    #[should_panic(expected = "cannot be memoized")]
    fn test_wrong_native_type_panics() {
        MemoTable::new(&DataType::Int32).unwrap().get_or_insert(1i64);
    }
}

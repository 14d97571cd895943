//! Concatenation of arrays of one logical type into a single array.
//!
//! Fixed-width values and bitmaps are copied; offsets, list-view positions,
//! view buffer indices, dense union offsets and run ends are rebased onto
//! the concatenated layout with explicit overflow checks. Nested types
//! concatenate the child ranges each input references. Dictionary arrays
//! keep a shared dictionary or are unified first.

use std::sync::Arc;

use itertools::Itertools;
use quiver_bytes::Buffer;
use quiver_common::{Result, checked_or_overflow, error::Error};
use quiver_format::{DataType, UnionMode};

use crate::{
    array::{Array, ArrayRef, make_array, range_of_values_used},
    data::ArrayData,
    offset::OffsetSize,
};

mod buffers;
mod dictionary;
mod run_end;

use buffers::{
    concat_bitmaps, concat_fixed_width, concat_offsets, concat_validity, concat_value_ranges,
    concat_views,
};

/// Concatenates `arrays` into one array.
///
/// Fails with `InvalidArgument` on empty input, with `TypeMismatch` when
/// the arrays differ in type, and with `Overflow` when a rebased offset or
/// run end does not fit its integer width.
pub fn concatenate(arrays: &[&dyn Array]) -> Result<ArrayRef> {
    let inputs = arrays.iter().map(|a| a.to_data()).collect_vec();
    concatenate_data(&inputs).map(make_array)
}

/// Like [`concatenate`], over array data.
pub fn concatenate_data(inputs: &[ArrayData]) -> Result<ArrayData> {
    let Some(first) = inputs.first() else {
        return Err(Error::invalid_arg(
            "arrays",
            "concatenation requires at least one array",
        ));
    };
    if let Some(other) = inputs.iter().find(|d| d.data_type() != first.data_type()) {
        return Err(Error::type_mismatch(
            "concatenate",
            first.data_type(),
            other.data_type(),
        ));
    }
    concat_data(inputs)
}

/// Concatenation of inputs already known to share one type.
fn concat_data(inputs: &[ArrayData]) -> Result<ArrayData> {
    let data_type = inputs[0].data_type();
    if let DataType::Extension(ext) = data_type {
        let storage = inputs
            .iter()
            .map(|d| d.with_data_type(ext.storage_type().clone()))
            .collect_vec();
        return Ok(concat_data(&storage)?.with_data_type(data_type.clone()));
    }

    let len = checked_or_overflow!(
        inputs.iter().try_fold(0usize, |acc, d| acc.checked_add(d.len())),
        "concatenated length exceeds usize"
    );

    let with_validity = |buffers: Vec<Option<Buffer>>, children| {
        let (validity, null_count) = concat_validity(inputs, len);
        let mut all = vec![validity];
        all.extend(buffers);
        ArrayData::new(data_type.clone(), len, 0, Some(null_count), all, children)
    };

    Ok(match data_type {
        DataType::Null => ArrayData::new(DataType::Null, len, 0, None, vec![None], vec![]),
        DataType::Boolean => with_validity(vec![Some(concat_bitmaps(inputs, 1, len))], vec![]),
        DataType::Utf8 | DataType::Binary => {
            let (offsets, ranges) = concat_offsets::<i32>(inputs)?;
            let values = concat_value_ranges(inputs, 2, &ranges);
            with_validity(vec![Some(offsets), Some(values)], vec![])
        }
        DataType::LargeUtf8 | DataType::LargeBinary => {
            let (offsets, ranges) = concat_offsets::<i64>(inputs)?;
            let values = concat_value_ranges(inputs, 2, &ranges);
            with_validity(vec![Some(offsets), Some(values)], vec![])
        }
        DataType::Utf8View | DataType::BinaryView => with_validity(concat_views(inputs)?, vec![]),
        DataType::List(_) | DataType::Map(..) => {
            let (offsets, child) = concat_lists::<i32>(inputs)?;
            with_validity(vec![Some(offsets)], vec![child])
        }
        DataType::LargeList(_) => {
            let (offsets, child) = concat_lists::<i64>(inputs)?;
            with_validity(vec![Some(offsets)], vec![child])
        }
        DataType::ListView(_) => {
            let (offsets, sizes, child) = concat_list_views::<i32>(inputs)?;
            with_validity(vec![Some(offsets), Some(sizes)], vec![child])
        }
        DataType::LargeListView(_) => {
            let (offsets, sizes, child) = concat_list_views::<i64>(inputs)?;
            with_validity(vec![Some(offsets), Some(sizes)], vec![child])
        }
        DataType::FixedSizeList(_, size) => {
            let size = *size as usize;
            let children = inputs
                .iter()
                .map(|d| d.child(0).slice(d.offset() * size, (d.offset() + d.len()) * size))
                .collect_vec();
            with_validity(vec![], vec![concat_data(&children)?])
        }
        DataType::Struct(fields) => {
            let children = (0..fields.len())
                .map(|i| concat_data(&sliced_children(inputs, i)))
                .collect::<Result<Vec<_>>>()?;
            with_validity(vec![], children)
        }
        DataType::Union(fields, mode) => {
            let type_codes = concat_fixed_width(inputs, 1, 1);
            let (buffers, children) = match mode {
                UnionMode::Sparse => {
                    let children = (0..fields.len())
                        .map(|i| concat_data(&sliced_children(inputs, i)))
                        .collect::<Result<Vec<_>>>()?;
                    (vec![None, Some(type_codes)], children)
                }
                UnionMode::Dense => {
                    let (offsets, children) = concat_dense_union(data_type, inputs)?;
                    (vec![None, Some(type_codes), Some(offsets)], children)
                }
            };
            ArrayData::new(data_type.clone(), len, 0, Some(0), buffers, children)
        }
        DataType::Dictionary(..) => dictionary::concat_dictionaries(data_type, inputs, len)?,
        DataType::RunEndEncoded(..) => run_end::concat_run_end_encoded(data_type, inputs)?,
        DataType::Extension(_) => unreachable!("extension types are unwrapped above"),
        other => {
            let width = other
                .primitive_width()
                .ok_or_else(|| Error::not_implemented(format!("concatenation of {other}")))?;
            with_validity(vec![Some(concat_fixed_width(inputs, 1, width))], vec![])
        }
    })
}

/// Child `i` of every input, sliced to the input's logical range.
fn sliced_children(inputs: &[ArrayData], i: usize) -> Vec<ArrayData> {
    inputs
        .iter()
        .map(|d| d.child(i).slice(d.offset(), d.offset() + d.len()))
        .collect()
}

fn concat_lists<O: OffsetSize>(
    inputs: &[ArrayData],
) -> Result<(Buffer, ArrayData)> {
    let (offsets, ranges) = concat_offsets::<O>(inputs)?;
    let children = inputs
        .iter()
        .zip(&ranges)
        .map(|(d, &(start, len))| d.child(0).slice(start, start + len))
        .collect_vec();
    Ok((offsets, concat_data(&children)?))
}

/// List views keep only the child range their valid views use. Null and
/// empty views come out as `(0, 0)`.
fn concat_list_views<O: OffsetSize>(
    inputs: &[ArrayData],
) -> Result<(Buffer, Buffer, ArrayData)> {
    let len: usize = inputs.iter().map(ArrayData::len).sum();
    let mut offsets = Vec::with_capacity(len);
    let mut sizes = Vec::with_capacity(len);
    let mut children = Vec::with_capacity(inputs.len());
    let mut total = 0usize;
    for data in inputs {
        let (start, used) = range_of_values_used(data);
        let (Some(base), Some(start_at), Some(_)) = (
            O::from_usize_checked(total),
            O::from_usize_checked(start),
            O::from_usize_checked(total + used),
        ) else {
            return Err(Error::overflow(format!(
                "concatenated {}list view values exceed {} entries",
                O::PREFIX.to_lowercase(),
                total + used
            )));
        };
        if !data.is_empty() {
            let in_offsets = &data.typed_buffer::<O>(1)[data.offset()..];
            let in_sizes = &data.typed_buffer::<O>(2)[data.offset()..];
            for i in 0..data.len() {
                if data.is_valid(i) && in_sizes[i] > O::zero() {
                    offsets.push(in_offsets[i] - start_at + base);
                    sizes.push(in_sizes[i]);
                } else {
                    offsets.push(O::zero());
                    sizes.push(O::zero());
                }
            }
        }
        children.push(data.child(0).slice(start, start + used));
        total += used;
    }
    Ok((
        Buffer::from_typed_slice(&offsets),
        Buffer::from_typed_slice(&sizes),
        concat_data(&children)?,
    ))
}

/// Dense unions append whole children; each slot's offset is shifted by
/// the length its child had accumulated from earlier inputs.
fn concat_dense_union(
    data_type: &DataType,
    inputs: &[ArrayData],
) -> Result<(Buffer, Vec<ArrayData>)> {
    let DataType::Union(fields, _) = data_type else {
        unreachable!("dispatched on union types only");
    };
    let child_ids = fields.child_ids();
    let mut child_base = vec![0usize; fields.len()];
    let mut offsets = Vec::new();
    for data in inputs {
        let codes = data.typed_buffer::<i8>(1);
        let value_offsets = data.typed_buffer::<i32>(2);
        for i in data.offset()..data.offset() + data.len() {
            let code = codes[i];
            let child = usize::try_from(child_ids[code as u8 as usize])
                .unwrap_or_else(|_| panic!("type code {code} is not part of {data_type}"));
            let offset = value_offsets[i] as usize + child_base[child];
            offsets.push(i32::try_from(offset).map_err(|_| {
                Error::overflow(format!("dense union offset {offset} exceeds i32"))
            })?);
        }
        for (c, base) in child_base.iter_mut().enumerate() {
            *base += data.child(c).len();
        }
    }
    let children = (0..fields.len())
        .map(|c| {
            let parts = inputs.iter().map(|d| d.child(c).clone()).collect_vec();
            concat_data(&parts)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((Buffer::from_typed_slice(&offsets), children))
}

/// Concatenates arrays held as [`ArrayRef`]s.
pub fn concatenate_refs(arrays: &[ArrayRef]) -> Result<ArrayRef> {
    let arrays = arrays.iter().map(Arc::as_ref).collect_vec();
    concatenate(&arrays)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_common::error::ErrorKind;
    use quiver_format::{Field, UnionFields};

    use super::*;
    use crate::{
        array::{
            DictionaryArray, Int16Array, Int32Array, Int64Array, ListArray, ListViewArray,
            RunEndEncodedArray, StringArray, StringViewArray, UnionArray,
        },
        builder::{ArrayBuilder, DictionaryBuilder, make_builder},
    };

    fn from_text(data_type: &DataType, values: &[&str]) -> ArrayRef {
        let mut builder = make_builder(data_type);
        for v in values {
            builder.append_value_from_str(v).unwrap();
        }
        builder.finish()
    }

    fn strs(array: &dyn Array) -> Vec<String> {
        (0..array.len()).map(|i| array.value_str(i)).collect()
    }

    fn concat_checked(arrays: &[&dyn Array]) -> ArrayRef {
        let result = concatenate(arrays).unwrap();
        result.to_data().validate_full().unwrap();
        let expected = arrays.iter().flat_map(|a| strs(*a)).collect::<Vec<_>>();
        assert_eq!(strs(result.as_ref()), expected);
        result
    }

    #[test]
    fn test_string_offsets_rebased() {
        let a = StringArray::from(vec!["x", "yz"]);
        let b = StringArray::from(vec!["ab"]);
        let result = concat_checked(&[&a, &b]);
        let strings = result.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(strings.offsets(), &[0, 1, 3, 5]);
        assert_eq!(strings.value_data(), b"xyzab");
        assert_eq!(result.null_count(), 0);
        assert!(result.data().validity().is_none());
    }

    #[test]
    fn test_invalid_inputs() {
        let err = concatenate(&[]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

        let ints = Int32Array::from_values(vec![1]);
        let strings = StringArray::from(vec!["a"]);
        let err = concatenate(&[&ints, &strings]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn test_primitives_null_and_boolean() {
        let a = Int64Array::from_options(vec![Some(1), None, Some(3)]);
        let b = Int64Array::from_values(vec![4, 5]);
        let result = concat_checked(&[a.slice(1, 3).as_ref(), &b]);
        assert_eq!(result.null_count(), 1);

        let nulls = from_text(&DataType::Null, &["(null)", "(null)"]);
        assert_eq!(concat_checked(&[nulls.as_ref(), nulls.as_ref()]).null_count(), 4);

        let bools = from_text(&DataType::Boolean, &["true", "false", "(null)", "true"]);
        concat_checked(&[bools.slice(1, 4).as_ref(), bools.as_ref()]);
    }

    #[test]
    fn test_sliced_lists_copy_referenced_children() {
        let list_type = DataType::list_of(DataType::Int32);
        let a = from_text(&list_type, &["[1,2]", "[3]", "(null)", "[4,5,6]"]);
        let b = from_text(&list_type, &["[7]"]);
        let result = concat_checked(&[a.slice(1, 4).as_ref(), b.as_ref()]);
        let list = result.as_any().downcast_ref::<ListArray>().unwrap();
        assert_eq!(list.offsets(), &[0, 1, 1, 4, 5]);
        assert_eq!(list.list_values().len(), 5);
        assert_eq!(result.to_string(), "[[3] (null) [4 5 6] [7]]");
    }

    #[test]
    fn test_struct_and_fixed_size_list_children() {
        let struct_type = DataType::Struct(
            vec![
                Field::new("n", DataType::Int32, true),
                Field::new("s", DataType::Utf8, true),
            ]
            .into(),
        );
        let a = from_text(&struct_type, &[r#"{"n":1,"s":"a"}"#, "(null)", r#"{"n":3}"#]);
        concat_checked(&[a.slice(1, 3).as_ref(), a.as_ref()]);

        let fsl_type = DataType::fixed_size_list_of(DataType::Int8, 2);
        let b = from_text(&fsl_type, &["[1,2]", "(null)", "[5,6]"]);
        let result = concat_checked(&[b.slice(2, 3).as_ref(), b.as_ref()]);
        assert_eq!(result.data().child(0).len(), 8);
    }

    #[test]
    fn test_list_view_keeps_used_range() {
        let values: ArrayRef = Arc::new(Int32Array::from_values(vec![0, 1, 2, 3, 4, 5]));
        let views = ListViewArray::try_new(
            Arc::new(Field::list_item(DataType::Int32)),
            &[4, 0, 2],
            &[2, 1, 0],
            values,
            Some(quiver_bytes::Buffer::copy_from_slice(&[0b101])),
        )
        .unwrap();
        let result = concat_checked(&[&views, &views]);
        let result = result.as_any().downcast_ref::<ListViewArray>().unwrap();
        assert_eq!(result.offsets(), &[0, 0, 0, 2, 0, 0]);
        assert_eq!(result.sizes(), &[2, 0, 0, 2, 0, 0]);
        assert_eq!(result.list_values().to_string(), "[4 5 4 5]");
    }

    #[test]
    fn test_view_buffer_indices_shift() {
        let a = StringViewArray::from(vec!["a value longer than twelve", "short"]);
        let b = StringViewArray::from(vec![Some("another long value here"), None]);
        let result = concat_checked(&[&a, &b]);
        let views = result.as_any().downcast_ref::<StringViewArray>().unwrap();
        let first = a.data_buffers().count() as u32;
        assert_eq!(views.views()[2].buffer_index, first);
        assert_eq!(views.value(2), "another long value here");
    }

    #[test]
    fn test_dictionaries_shared_or_unified() {
        let dict_type = DataType::dictionary_of(DataType::Int8, DataType::Utf8);
        let mut builder = DictionaryBuilder::new(dict_type.clone());
        for v in ["a", "b", "(null)"] {
            builder.append_value_from_str(v).unwrap();
        }
        let first = builder.finish();

        let shared = concat_checked(&[&first, &first]);
        assert!(
            shared
                .data()
                .dictionary()
                .unwrap()
                .ptr_eq(first.data().dictionary().unwrap())
        );

        let mut other = DictionaryBuilder::new(dict_type);
        other.append_str("c").unwrap();
        other.append_str("a").unwrap();
        let second = other.finish();
        let unified = concat_checked(&[&first, &second]);
        let unified = unified.as_any().downcast_ref::<DictionaryArray>().unwrap();
        assert_eq!(unified.dictionary().to_string(), r#"["a" "b" "c"]"#);
        assert_eq!(unified.value_index(4), 0);
    }

    #[test]
    fn test_run_end_slices() {
        let run_ends: ArrayRef = Arc::new(Int32Array::from_values(vec![2, 3, 6]));
        let values: ArrayRef = Arc::new(StringArray::from(vec![Some("a"), None, Some("c")]));
        let array = RunEndEncodedArray::try_new(run_ends, values).unwrap();
        let result = concat_checked(&[array.slice(1, 4).as_ref(), array.slice(4, 6).as_ref()]);
        let result = result.as_any().downcast_ref::<RunEndEncodedArray>().unwrap();
        assert_eq!(result.run_ends().to_string(), "[1 2 3 5]");
        assert_eq!(result.values().len(), 4);
    }

    #[test]
    fn test_dense_union_offsets() {
        let fields = UnionFields::try_new(
            vec![0, 1],
            vec![
                Field::new("i", DataType::Int32, true),
                Field::new("s", DataType::Utf8, true),
            ],
        )
        .unwrap();
        let dense = DataType::Union(fields.clone(), UnionMode::Dense);
        let a = from_text(&dense, &[r#"[0,1]"#, r#"[1,"x"]"#, r#"[0,2]"#]);
        let b = from_text(&dense, &[r#"[1,"y"]"#, r#"[0,3]"#]);
        let result = concat_checked(&[a.as_ref(), b.as_ref()]);
        let union = result.as_any().downcast_ref::<UnionArray>().unwrap();
        assert_eq!(union.value_offsets(), &[0, 0, 1, 1, 2]);
        assert_eq!(union.field(0).len(), 3);

        let sparse = DataType::Union(fields, UnionMode::Sparse);
        let c = from_text(&sparse, &[r#"[1,"p"]"#, r#"[0,9]"#, "(null)"]);
        concat_checked(&[c.slice(1, 3).as_ref(), c.as_ref()]);
    }

    #[test]
    fn test_offset_overflow_is_reported() {
        let huge = ArrayData::new(
            DataType::Utf8,
            1,
            0,
            Some(0),
            vec![
                None,
                Some(quiver_bytes::Buffer::from_typed_slice(&[0i32, i32::MAX])),
                Some(quiver_bytes::Buffer::new()),
            ],
            vec![],
        );
        let err = concatenate_data(&[huge.clone(), huge]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Overflow { .. }));
    }

    #[test]
    fn test_run_end_overflow_is_reported() {
        let run_ends: ArrayRef = Arc::new(Int16Array::from_values(vec![20_000]));
        let values: ArrayRef = Arc::new(StringArray::from(vec!["a"]));
        let array = RunEndEncodedArray::try_new(run_ends, values).unwrap();
        let err = concatenate(&[&array, &array]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Overflow { .. }));
    }

    #[test]
    fn test_concatenate_refs() {
        let parts: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from_values(vec![1])),
            Arc::new(Int32Array::from_values(vec![2, 3])),
        ];
        assert_eq!(concatenate_refs(&parts).unwrap().to_string(), "[1 2 3]");
    }
}

//! Rewriting dictionary indices through a transposition map.

use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use crate::{
    builder::ValidityBuilder,
    data::ArrayData,
    offset::{integer_buffer, integer_max, integer_value},
};

/// Whether `transpose_map` maps every code to itself.
pub fn is_trivial_transposition(transpose_map: &[i32]) -> bool {
    transpose_map
        .iter()
        .enumerate()
        .all(|(i, &code)| usize::try_from(code) == Ok(i))
}

/// Re-encodes the indices of the dictionary array `data` through
/// `transpose_map` (old code to new code) and attaches `dictionary`.
///
/// `in_type` is the dictionary type of `data` (which may carry an extension
/// type on top), `out_type` the dictionary type of the result. When both
/// index types agree and the map is the identity over the whole dictionary
/// of `data`, the result shares the validity and index buffers of `data`.
/// Otherwise every index is translated into a new buffer; null slots get
/// index `0`.
///
/// Fails with `IndexOutOfBounds` when a valid slot holds an index outside
/// the map, and with `Overflow` when a new code does not fit the output
/// index type.
pub fn transpose_dict_indices(
    data: &ArrayData,
    in_type: &DataType,
    out_type: &DataType,
    dictionary: &ArrayData,
    transpose_map: &[i32],
) -> Result<ArrayData> {
    let (Some((in_index, _)), Some((out_index, _))) =
        (in_type.dictionary_types(), out_type.dictionary_types())
    else {
        return Err(Error::invalid_arg(
            "in_type",
            format!("expected dictionary types, got {in_type} and {out_type}"),
        ));
    };

    let covers_dictionary = transpose_map.len() >= data.dictionary().map_or(0, ArrayData::len);
    if in_index == out_index && covers_dictionary && is_trivial_transposition(transpose_map) {
        return Ok(ArrayData::with_dictionary(
            out_type.clone(),
            data.len(),
            data.offset(),
            Some(data.null_count()),
            vec![data.buffers()[0].clone(), data.buffers()[1].clone()],
            vec![],
            Some(dictionary.clone()),
        ));
    }

    let out_max = integer_max(out_index).ok_or_else(|| {
        Error::invalid_arg("out_type", format!("{out_index} is not an integer index type"))
    })?;
    let mut codes = Vec::with_capacity(data.len());
    if let Some(indices) = data.buffers()[1].as_ref() {
        for i in 0..data.len() {
            if data.is_null(i) {
                codes.push(0);
                continue;
            }
            let index = integer_value(in_index, indices, data.offset() + i);
            let code = usize::try_from(index)
                .ok()
                .and_then(|index| transpose_map.get(index))
                .ok_or_else(|| {
                    Error::index_out_of_bounds(format!(
                        "dictionary index {index} at {i} outside transposition map of length {}",
                        transpose_map.len()
                    ))
                })?;
            if *code < 0 || *code as u64 > out_max {
                return Err(Error::overflow(format!(
                    "transposed dictionary index {code} for {out_index}"
                )));
            }
            codes.push(*code as i64);
        }
    }

    let mut validity = ValidityBuilder::with_capacity(data.len());
    validity.append_packed(data.validity().map(|b| b.as_slice()), data.offset(), data.len());
    let (validity, null_count) = validity.finish();
    Ok(ArrayData::with_dictionary(
        out_type.clone(),
        data.len(),
        0,
        Some(null_count),
        vec![validity, Some(integer_buffer(out_index, codes.into_iter()))],
        vec![],
        Some(dictionary.clone()),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_common::error::ErrorKind;

    use super::*;
    use crate::array::{
        Array, ArrayRef, DictionaryArray, Int8Array, Int32Array, StringArray, make_array,
    };

    fn sample() -> DictionaryArray {
        let indices: ArrayRef = Arc::new(Int8Array::from_options(vec![Some(1), None, Some(0), Some(1)]));
        let dictionary: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        DictionaryArray::try_new(
            DataType::dictionary_of(DataType::Int8, DataType::Utf8),
            indices,
            dictionary,
        )
        .unwrap()
    }

    #[test]
    fn test_trivial_transposition_shares_buffers() {
        let array = sample();
        let data = array.to_data();
        let out = transpose_dict_indices(
            &data,
            data.data_type(),
            data.data_type(),
            data.dictionary().unwrap(),
            &[0, 1],
        )
        .unwrap();
        assert!(out.buffer(1).ptr_eq(data.buffer(1)));
        assert!(is_trivial_transposition(&[]));
        assert!(!is_trivial_transposition(&[1, 0]));
    }

    #[test]
    fn test_transpose_to_wider_index() {
        let array = sample();
        let data = array.to_data().slice(1, 4);
        let new_dictionary = StringArray::from(vec!["z", "b", "a"]).to_data();
        let out_type = DataType::dictionary_of(DataType::Int32, DataType::Utf8);
        let out =
            transpose_dict_indices(&data, data.data_type(), &out_type, &new_dictionary, &[2, 1])
                .unwrap();
        assert_eq!(out.offset(), 0);
        assert_eq!(out.typed_buffer::<i32>(1), &[0, 2, 1]);
        assert_eq!(out.null_count(), 1);
        out.validate_full().unwrap();
        let transposed = make_array(out);
        assert_eq!(transposed.to_string(), r#"[(null) "a" "b"]"#);
    }

    #[test]
    fn test_index_outside_map_is_reported() {
        let array = sample();
        let data = array.to_data();
        let err = transpose_dict_indices(
            &data,
            data.data_type(),
            data.data_type(),
            data.dictionary().unwrap(),
            &[0],
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_non_dictionary_type_rejected() {
        let data = Int32Array::from_values(vec![1]).to_data();
        let result = transpose_dict_indices(&data, &DataType::Int32, &DataType::Int32, &data, &[0]);
        assert!(result.is_err());
    }
}

//! Dictionary encoding: the memo table behind dictionary builders, the
//! unifier that merges diverged dictionaries, and index transposition.

use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use crate::{
    array::{ArrayRef, make_array},
    data::ArrayData,
};

mod memo;
mod transpose;
mod unifier;

pub use memo::MemoTable;
pub(crate) use memo::value_bytes;
pub use transpose::{is_trivial_transposition, transpose_dict_indices};
pub use unifier::DictionaryUnifier;

/// Rewrites the chunks of one logical column so that every dictionary,
/// including dictionaries nested in struct, list, map, union and run-end
/// children, is shared by all chunks.
///
/// Index types are kept; a unified dictionary too large for a chunk's
/// index type fails with `DictionaryIndexOverflow`. With fewer than two
/// chunks, or when the type contains no dictionary, the input chunks are
/// returned as they are.
pub fn unify_chunked_dicts(chunks: &[ArrayRef]) -> Result<Vec<ArrayRef>> {
    let Some(first) = chunks.first() else {
        return Ok(Vec::new());
    };
    if chunks.len() == 1 {
        return Ok(chunks.to_vec());
    }
    let data_type = first.data_type().clone();
    if let Some(other) = chunks.iter().find(|c| c.data_type() != &data_type) {
        return Err(Error::type_mismatch(
            "dictionary unification",
            &data_type,
            other.data_type(),
        ));
    }
    let mut data: Vec<ArrayData> = chunks.iter().map(|c| c.to_data()).collect();
    if !unify_recursive(&data_type, &mut data)? {
        return Ok(chunks.to_vec());
    }
    Ok(data.into_iter().map(make_array).collect())
}

fn unify_recursive(data_type: &DataType, chunks: &mut [ArrayData]) -> Result<bool> {
    let storage = data_type.storage_type();
    let mut changed = false;

    for (i, field) in storage.child_fields().iter().enumerate() {
        let mut children: Vec<ArrayData> = chunks.iter().map(|c| c.child(i).clone()).collect();
        if !unify_recursive(field.data_type(), &mut children)? {
            continue;
        }
        for (chunk, child) in chunks.iter_mut().zip(children) {
            let mut new_children = chunk.children().to_vec();
            new_children[i] = child;
            *chunk = chunk.clone().into_builder().children(new_children).build();
        }
        changed = true;
    }

    if let DataType::Dictionary(index_type, value_type, _) = storage {
        let mut unifier = DictionaryUnifier::new(value_type)?;
        let mut maps = Vec::with_capacity(chunks.len());
        for chunk in chunks.iter() {
            let dictionary = chunk.dictionary().ok_or_else(|| {
                Error::invalid_data(data_type.to_string(), "dictionary is missing")
            })?;
            maps.push(unifier.unify_and_transpose(make_array(dictionary.clone()).as_ref())?);
        }
        let dictionary = unifier.get_result_with_index_type(index_type)?.to_data();
        for (chunk, map) in chunks.iter_mut().zip(&maps) {
            let transposed = transpose_dict_indices(chunk, storage, storage, &dictionary, map)?;
            *chunk = match data_type {
                DataType::Extension(_) => transposed.with_data_type(data_type.clone()),
                _ => transposed,
            };
        }
        changed = true;
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_common::error::ErrorKind;

    use super::*;
    use crate::array::{
        Array, DictionaryArray, Int8Array, Int32Array, StringArray, StructArray,
    };

    fn dict_array(indices: Vec<Option<i8>>, values: Vec<&str>) -> ArrayRef {
        Arc::new(
            DictionaryArray::try_new(
                DataType::dictionary_of(DataType::Int8, DataType::Utf8),
                Arc::new(Int8Array::from_options(indices)),
                Arc::new(StringArray::from(values)),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_chunks_share_one_dictionary() {
        let chunks = vec![
            dict_array(vec![Some(0), Some(1)], vec!["a", "b"]),
            dict_array(vec![Some(1), None, Some(0)], vec!["b", "c"]),
        ];
        let unified = unify_chunked_dicts(&chunks).unwrap();
        let first = unified[0].as_any().downcast_ref::<DictionaryArray>().unwrap();
        let second = unified[1].as_any().downcast_ref::<DictionaryArray>().unwrap();
        assert_eq!(first.dictionary().to_string(), r#"["a" "b" "c"]"#);
        assert!(first.dictionary().to_data().ptr_eq(&second.dictionary().to_data()));
        assert_eq!(unified[1].to_string(), r#"["c" (null) "b"]"#);
        assert_eq!(second.value_index(2), 1);
    }

    #[test]
    fn test_nested_dictionaries_are_unified() {
        let chunk = |dict: ArrayRef| -> ArrayRef {
            Arc::new(StructArray::from_columns(vec![("d", dict)]).unwrap())
        };
        let chunks = vec![
            chunk(dict_array(vec![Some(0)], vec!["x"])),
            chunk(dict_array(vec![Some(0)], vec!["y"])),
        ];
        let unified = unify_chunked_dicts(&chunks).unwrap();
        let second = unified[1].as_any().downcast_ref::<StructArray>().unwrap();
        let dict = second.field(0).as_any().downcast_ref::<DictionaryArray>().unwrap();
        assert_eq!(dict.dictionary().len(), 2);
        assert_eq!(unified[1].value_str(0), r#"{"d":"y"}"#);
    }

    #[test]
    fn test_plain_chunks_untouched() {
        let chunks: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from_values(vec![1])),
            Arc::new(Int32Array::from_values(vec![2])),
        ];
        let unified = unify_chunked_dicts(&chunks).unwrap();
        assert!(Arc::ptr_eq(&unified[0], &chunks[0]));
        let mixed: Vec<ArrayRef> = vec![chunks[0].clone(), dict_array(vec![], vec![])];
        let err = unify_chunked_dicts(&mixed).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    }
}

use log::debug;
use quiver_common::Result;
use quiver_format::DataType;

use super::buffers::{concat_fixed_width, concat_validity};
use crate::{
    array::make_array,
    compare::array_equal,
    data::ArrayData,
    dictionary::{DictionaryUnifier, transpose_dict_indices},
};

fn dictionary_data(data: &ArrayData) -> &ArrayData {
    data.dictionary()
        .unwrap_or_else(|| panic!("{} data has no dictionary", data.data_type()))
}

/// Concatenates dictionary arrays. Inputs sharing one dictionary keep it
/// and only their indices are appended; otherwise the dictionaries are
/// unified and every input's indices are transposed first.
pub(super) fn concat_dictionaries(
    data_type: &DataType,
    inputs: &[ArrayData],
    len: usize,
) -> Result<ArrayData> {
    let Some((index_type, value_type)) = data_type.dictionary_types() else {
        unreachable!("dispatched on dictionary types only");
    };
    let width = index_type
        .primitive_width()
        .unwrap_or_else(|| panic!("{index_type} is not an integer index type"));

    let first = dictionary_data(&inputs[0]);
    let shared = inputs[1..].iter().map(dictionary_data).all(|dict| {
        dict.ptr_eq(first)
            || array_equal(make_array(first.clone()).as_ref(), make_array(dict.clone()).as_ref())
    });
    if shared {
        let (validity, null_count) = concat_validity(inputs, len);
        return Ok(ArrayData::with_dictionary(
            data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity, Some(concat_fixed_width(inputs, 1, width))],
            vec![],
            Some(first.clone()),
        ));
    }

    debug!(
        "concatenating {} {data_type} arrays with differing dictionaries; unifying",
        inputs.len()
    );
    let mut unifier = DictionaryUnifier::new(value_type)?;
    let mut maps = Vec::with_capacity(inputs.len());
    for data in inputs {
        let dict = make_array(dictionary_data(data).clone());
        maps.push(unifier.unify_and_transpose(dict.as_ref())?);
    }
    let unified = unifier.get_result_with_index_type(index_type)?.to_data();
    let transposed = inputs
        .iter()
        .zip(&maps)
        .map(|(data, map)| transpose_dict_indices(data, data_type, data_type, &unified, map))
        .collect::<Result<Vec<_>>>()?;

    let (validity, null_count) = concat_validity(&transposed, len);
    Ok(ArrayData::with_dictionary(
        data_type.clone(),
        len,
        0,
        Some(null_count),
        vec![validity, Some(concat_fixed_width(&transposed, 1, width))],
        vec![],
        Some(unified),
    ))
}

use std::any::Any;

use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use super::{Array, ArrayRef, make_array};
use crate::{
    data::ArrayData,
    marshal::MarshalValue,
    offset::{integer_value, is_dictionary_index_type},
};

/// Dictionary-encoded array: integer indices into a separate dictionary
/// of distinct values.
///
/// The indices array holds the validity; null slots may carry any index.
#[derive(Debug, Clone)]
pub struct DictionaryArray {
    data: ArrayData,
    indices: ArrayRef,
    dictionary: ArrayRef,
}

impl DictionaryArray {
    pub fn from_data(data: ArrayData) -> DictionaryArray {
        let Some((index_type, value_type)) = data.data_type().storage_type().dictionary_types()
        else {
            panic!("{} data cannot be viewed as a dictionary array", data.data_type());
        };
        let dictionary = data
            .dictionary()
            .unwrap_or_else(|| panic!("{} data has no dictionary", data.data_type()))
            .clone();
        assert_eq!(
            dictionary.data_type(),
            value_type,
            "dictionary values do not match the value type"
        );
        let indices = ArrayData::new(
            index_type.clone(),
            data.len(),
            data.offset(),
            data.null_count_is_known().then(|| data.null_count()),
            data.buffers().to_vec(),
            vec![],
        );
        DictionaryArray {
            indices: make_array(indices),
            dictionary: make_array(dictionary),
            data,
        }
    }

    /// Builds a dictionary array and checks every valid index against the
    /// dictionary length.
    pub fn try_new(
        data_type: DataType,
        indices: ArrayRef,
        dictionary: ArrayRef,
    ) -> Result<DictionaryArray> {
        let array = Self::new_unchecked(data_type, indices, dictionary)?;
        array.validate_indices()?;
        Ok(array)
    }

    /// Builds a dictionary array without checking index bounds. Types are
    /// still checked.
    pub fn new_unchecked(
        data_type: DataType,
        indices: ArrayRef,
        dictionary: ArrayRef,
    ) -> Result<DictionaryArray> {
        let Some((index_type, value_type)) = data_type.storage_type().dictionary_types() else {
            return Err(Error::type_mismatch(
                "dictionary array",
                "dictionary",
                data_type.to_string(),
            ));
        };
        if !is_dictionary_index_type(index_type) {
            return Err(Error::invalid_arg(
                "data_type",
                format!("dictionary index type must be an integer, got {index_type}"),
            ));
        }
        if indices.data_type() != index_type {
            return Err(Error::type_mismatch(
                "dictionary indices",
                index_type,
                indices.data_type().to_string(),
            ));
        }
        if dictionary.data_type() != value_type {
            return Err(Error::type_mismatch(
                "dictionary values",
                value_type,
                dictionary.data_type().to_string(),
            ));
        }
        let indices = indices.to_data();
        let data = ArrayData::with_dictionary(
            data_type,
            indices.len(),
            indices.offset(),
            indices.null_count_is_known().then(|| indices.null_count()),
            indices.buffers().to_vec(),
            vec![],
            Some(dictionary.to_data()),
        );
        Ok(DictionaryArray::from_data(data))
    }

    fn validate_indices(&self) -> Result<()> {
        let dict_len = self.dictionary.len() as i64;
        for i in 0..self.len() {
            if self.is_null(i) {
                continue;
            }
            let index = self.value_index(i);
            if index < 0 || index >= dict_len {
                return Err(Error::index_out_of_bounds(format!(
                    "dictionary index {index} at slot {i} out of bounds for dictionary of length {dict_len}"
                )));
            }
        }
        Ok(())
    }

    pub fn index_type(&self) -> &DataType {
        self.indices.data_type()
    }

    pub fn value_type(&self) -> &DataType {
        self.dictionary.data_type()
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self.data.data_type().storage_type(), DataType::Dictionary(_, _, true))
    }

    pub fn indices(&self) -> &ArrayRef {
        &self.indices
    }

    pub fn dictionary(&self) -> &ArrayRef {
        &self.dictionary
    }

    /// Dictionary index of slot `i`, widened to `i64`.
    #[inline]
    pub fn value_index(&self, i: usize) -> i64 {
        integer_value(self.index_type(), self.data.buffer(1), self.data.offset() + i)
    }

    /// Whether indices of `self` and `other` address the same values, i.e.
    /// both dictionaries agree on the longer one's prefix.
    pub fn can_compare_indices(&self, other: &DictionaryArray) -> bool {
        if self.index_type() != other.index_type() || self.value_type() != other.value_type() {
            return false;
        }
        let (short, long) = if self.dictionary.len() <= other.dictionary.len() {
            (&self.dictionary, &other.dictionary)
        } else {
            (&other.dictionary, &self.dictionary)
        };
        crate::compare::array_equal(short.as_ref(), long.slice(0, short.len()).as_ref())
    }
}

impl Array for DictionaryArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        self.dictionary.value_str(self.value_index(i) as usize)
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        self.dictionary.get_one_for_marshal(self.value_index(i) as usize)
    }

    fn display_value(&self, i: usize) -> String {
        if self.is_null(i) {
            super::NULL_VALUE_STR.to_string()
        } else {
            self.dictionary.display_value(self.value_index(i) as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_common::error::ErrorKind;

    use super::*;
    use crate::array::{Int8Array, StringArray};

    fn dict_type() -> DataType {
        DataType::dictionary_of(DataType::Int8, DataType::Utf8)
    }

    #[test]
    fn test_lookup_through_dictionary() {
        let indices: ArrayRef = Arc::new(Int8Array::from_options(vec![Some(1), None, Some(0), Some(1)]));
        let dictionary: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        let array = DictionaryArray::try_new(dict_type(), indices, dictionary).unwrap();
        assert_eq!(array.value_index(0), 1);
        assert_eq!(array.value_str(0), "b");
        assert_eq!(array.value_str(1), "(null)");
        assert_eq!(array.null_count(), 1);
        assert_eq!((&array as &dyn Array).to_string(), r#"["b" (null) "a" "b"]"#);

        let slice = array.slice(2, 4);
        assert_eq!(slice.to_string(), r#"["a" "b"]"#);
    }

    #[test]
    fn test_out_of_bounds_index() {
        let indices: ArrayRef = Arc::new(Int8Array::from_values(vec![0, 2]));
        let dictionary: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        let err = DictionaryArray::try_new(dict_type(), indices, dictionary).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_null_slot_index_is_not_checked() {
        let indices = Int8Array::from_options(vec![Some(0), None]);
        let mut raw = indices.values().to_vec();
        raw[1] = 100;
        let data = ArrayData::new(
            DataType::Int8,
            2,
            0,
            None,
            vec![
                indices.to_data().buffers()[0].clone(),
                Some(quiver_bytes::Buffer::from_typed_slice(&raw)),
            ],
            vec![],
        );
        let dictionary: ArrayRef = Arc::new(StringArray::from(vec!["a"]));
        assert!(DictionaryArray::try_new(dict_type(), make_array(data), dictionary).is_ok());
    }

    #[test]
    fn test_can_compare_indices() {
        let a = DictionaryArray::try_new(
            dict_type(),
            Arc::new(Int8Array::from_values(vec![0])),
            Arc::new(StringArray::from(vec!["a", "b"])),
        )
        .unwrap();
        let b = DictionaryArray::try_new(
            dict_type(),
            Arc::new(Int8Array::from_values(vec![0])),
            Arc::new(StringArray::from(vec!["a", "b", "c"])),
        )
        .unwrap();
        let c = DictionaryArray::try_new(
            dict_type(),
            Arc::new(Int8Array::from_values(vec![0])),
            Arc::new(StringArray::from(vec!["b"])),
        )
        .unwrap();
        assert!(a.can_compare_indices(&b));
        assert!(!a.can_compare_indices(&c));
    }
}

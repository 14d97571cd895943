//! Merging dictionaries that diverged across arrays or chunks.

use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use super::MemoTable;
use crate::{
    array::{Array, ArrayRef, make_array},
    offset::integer_max,
};

/// Accumulates the distinct values of several dictionaries into one.
///
/// Each unified dictionary can be paired with a transposition map from its
/// old codes to codes of the combined dictionary, to be applied with
/// [`transpose_dict_indices`](super::transpose_dict_indices). Taking the
/// result resets the unifier for the next batch.
#[derive(Debug)]
pub struct DictionaryUnifier {
    memo: MemoTable,
}

impl DictionaryUnifier {
    /// Creates a unifier for dictionaries of `value_type`.
    pub fn new(value_type: &DataType) -> Result<DictionaryUnifier> {
        Ok(DictionaryUnifier {
            memo: MemoTable::new(value_type)?,
        })
    }

    pub fn value_type(&self) -> &DataType {
        self.memo.value_type()
    }

    /// Adds the values of `dictionary`.
    pub fn unify(&mut self, dictionary: &dyn Array) -> Result<()> {
        self.check_type(dictionary)?;
        let data = dictionary.data();
        for i in 0..data.len() {
            self.memo.get_or_insert_slot(data, i);
        }
        Ok(())
    }

    /// Adds the values of `dictionary` and returns, for each of its codes,
    /// the code of the same value in the unified dictionary.
    pub fn unify_and_transpose(&mut self, dictionary: &dyn Array) -> Result<Vec<i32>> {
        self.check_type(dictionary)?;
        let data = dictionary.data();
        (0..data.len())
            .map(|i| {
                let (code, _) = self.memo.get_or_insert_slot(data, i);
                i32::try_from(code)
                    .map_err(|_| Error::dictionary_index_overflow(DataType::Int32, code + 1))
            })
            .collect()
    }

    /// The unified dictionary with the narrowest signed index type able to
    /// address it.
    pub fn get_result(&mut self) -> Result<(DataType, ArrayRef)> {
        let size = self.memo.size();
        let index_type = if size <= i8::MAX as usize {
            DataType::Int8
        } else if size <= i16::MAX as usize {
            DataType::Int16
        } else if size <= i32::MAX as usize {
            DataType::Int32
        } else {
            DataType::Int64
        };
        let data_type = DataType::dictionary_of(index_type, self.value_type().clone());
        Ok((data_type, self.take_dictionary()))
    }

    /// The unified dictionary, checked to be addressable by `index_type`.
    ///
    /// Fails with `DictionaryIndexOverflow` when the dictionary has more
    /// entries than `index_type` can address, and with `InvalidArgument`
    /// when `index_type` is not an integer type.
    pub fn get_result_with_index_type(&mut self, index_type: &DataType) -> Result<ArrayRef> {
        let Some(max) = integer_max(index_type) else {
            return Err(Error::invalid_arg(
                "index_type",
                format!("dictionary index type must be an integer, got {index_type}"),
            ));
        };
        let size = self.memo.size();
        if size as u64 > max {
            return Err(Error::dictionary_index_overflow(index_type, size));
        }
        Ok(self.take_dictionary())
    }

    fn take_dictionary(&mut self) -> ArrayRef {
        let dictionary = make_array(self.memo.dictionary_data(0));
        self.memo.reset();
        dictionary
    }

    fn check_type(&self, dictionary: &dyn Array) -> Result<()> {
        if dictionary.data_type() != self.value_type() {
            return Err(Error::type_mismatch(
                "dictionary unification",
                self.value_type(),
                dictionary.data_type(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quiver_common::error::ErrorKind;

    use super::*;
    use crate::array::{Int32Array, StringArray};

    #[test]
    fn test_unify_and_transpose() {
        let mut unifier = DictionaryUnifier::new(&DataType::Utf8).unwrap();
        let first = StringArray::from(vec!["a", "b"]);
        let second = StringArray::from(vec![Some("c"), Some("a"), None]);
        assert_eq!(unifier.unify_and_transpose(&first).unwrap(), vec![0, 1]);
        assert_eq!(unifier.unify_and_transpose(&second).unwrap(), vec![2, 0, 3]);
        let (data_type, dictionary) = unifier.get_result().unwrap();
        assert_eq!(data_type, DataType::dictionary_of(DataType::Int8, DataType::Utf8));
        assert_eq!(dictionary.to_string(), r#"["a" "b" "c" (null)]"#);

        unifier.unify(&second).unwrap();
        assert_eq!(unifier.get_result().unwrap().1.len(), 3);
    }

    #[test]
    fn test_index_type_selection() {
        let mut unifier = DictionaryUnifier::new(&DataType::Int32).unwrap();
        unifier
            .unify(&Int32Array::from_values((0..200).collect::<Vec<i32>>()))
            .unwrap();
        let err = unifier.get_result_with_index_type(&DataType::Int8).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DictionaryIndexOverflow { .. }));
        assert_eq!(unifier.get_result_with_index_type(&DataType::UInt8).unwrap().len(), 200);

        unifier
            .unify(&Int32Array::from_values((0..200).collect::<Vec<i32>>()))
            .unwrap();
        let (data_type, _) = unifier.get_result().unwrap();
        assert_eq!(data_type, DataType::dictionary_of(DataType::Int16, DataType::Int32));
    }

    #[test]
    fn test_type_mismatch() {
        let mut unifier = DictionaryUnifier::new(&DataType::Utf8).unwrap();
        let err = unifier.unify(&Int32Array::from_values(vec![1])).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
        assert!(unifier.get_result_with_index_type(&DataType::Utf8).is_err());
    }
}

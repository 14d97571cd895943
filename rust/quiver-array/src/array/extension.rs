use std::any::Any;

use quiver_common::{Result, error::Error};
use quiver_format::{DataType, ExtensionRef};

use super::{Array, ArrayRef, make_array};
use crate::{data::ArrayData, marshal::MarshalValue};

/// Array of a user-defined extension type; values are read through the
/// storage array.
#[derive(Debug, Clone)]
pub struct ExtensionArray {
    data: ArrayData,
    storage: ArrayRef,
}

impl ExtensionArray {
    pub fn from_data(data: ArrayData) -> ExtensionArray {
        let DataType::Extension(ext) = data.data_type() else {
            panic!("{} data cannot be viewed as an extension array", data.data_type());
        };
        let storage = make_array(data.with_data_type(ext.storage_type().clone()));
        ExtensionArray { data, storage }
    }

    /// Wraps `storage` as an array of `ext`.
    pub fn try_new(ext: ExtensionRef, storage: ArrayRef) -> Result<ExtensionArray> {
        if storage.data_type() != ext.storage_type() {
            return Err(Error::type_mismatch(
                format!("extension {} storage", ext.name()),
                ext.storage_type(),
                storage.data_type(),
            ));
        }
        let data = storage.to_data().with_data_type(DataType::Extension(ext));
        Ok(ExtensionArray::from_data(data))
    }

    pub fn extension_type(&self) -> &ExtensionRef {
        match self.data.data_type() {
            DataType::Extension(ext) => ext,
            _ => unreachable!("checked in from_data"),
        }
    }

    pub fn storage(&self) -> &ArrayRef {
        &self.storage
    }
}

impl Array for ExtensionArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        self.storage.value_str(i)
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        self.storage.get_one_for_marshal(i)
    }

    fn display_value(&self, i: usize) -> String {
        self.storage.display_value(i)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_format::ExtensionType;

    use super::*;
    use crate::array::{FixedSizeBinaryArray, Int32Array};

    #[derive(Debug)]
    struct Tagged(DataType);

    impl ExtensionType for Tagged {
        fn name(&self) -> &str {
            "test.tagged"
        }

        fn storage_type(&self) -> &DataType {
            &self.0
        }

        fn serialize(&self) -> String {
            String::new()
        }

        fn deserialize(&self, storage: DataType, _serialized: &str) -> Result<ExtensionRef> {
            Ok(Arc::new(Tagged(storage)))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_storage_roundtrip() {
        let storage: ArrayRef = Arc::new(Int32Array::from_options(vec![Some(4), None]));
        let array = ExtensionArray::try_new(Arc::new(Tagged(DataType::Int32)), storage).unwrap();
        assert_eq!(array.extension_type().name(), "test.tagged");
        assert_eq!(array.storage().data_type(), &DataType::Int32);
        assert_eq!(array.value_str(0), "4");
        assert!(array.is_null(1));
        assert_eq!(array.slice(1, 2).null_count(), 1);
    }

    #[test]
    fn test_extension_over_null_storage() {
        let ext: ExtensionRef = Arc::new(Tagged(DataType::Null));
        let data = ArrayData::new(DataType::Extension(ext), 3, 0, None, vec![None], vec![]);
        assert_eq!(data.null_count(), 3);
        assert_eq!(data.slice(1, 3).null_count(), 2);

        let array = ExtensionArray::from_data(data);
        assert!(array.is_null(0));
        assert_eq!(array.value_str(2), "(null)");
    }

    #[test]
    fn test_storage_type_checked() {
        let storage: ArrayRef = Arc::new(FixedSizeBinaryArray::from_options(2, vec![Some(&b"ab"[..])]));
        let ext = Arc::new(Tagged(DataType::Int32));
        assert!(ExtensionArray::try_new(ext, storage).is_err());
    }
}

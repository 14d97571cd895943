use std::any::Any;

use quiver_common::Result;
use quiver_format::{DataType, ExtensionRef};

use super::{ArrayBuilder, downcast_builder_mut, make_builder};
use crate::{array::ExtensionArray, data::ArrayData};

/// Builder of extension arrays: appends go to a builder of the storage
/// type and the finished data is re-typed as the extension.
#[derive(Debug)]
pub struct ExtensionBuilder {
    data_type: DataType,
    storage: Box<dyn ArrayBuilder>,
}

impl ExtensionBuilder {
    pub fn new(ext: ExtensionRef) -> ExtensionBuilder {
        ExtensionBuilder {
            storage: make_builder(ext.storage_type()),
            data_type: DataType::Extension(ext),
        }
    }

    pub fn storage_builder(&mut self) -> &mut dyn ArrayBuilder {
        self.storage.as_mut()
    }

    pub fn storage_builder_as<B: ArrayBuilder>(&mut self) -> &mut B {
        downcast_builder_mut(self.storage.as_mut())
    }

    pub fn finish(&mut self) -> ExtensionArray {
        ExtensionArray::from_data(self.finish_data())
    }
}

impl ArrayBuilder for ExtensionBuilder {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    fn null_count(&self) -> usize {
        self.storage.null_count()
    }

    fn append_null(&mut self) {
        self.storage.append_null();
    }

    fn append_nulls(&mut self, n: usize) {
        self.storage.append_nulls(n);
    }

    fn append_empty_value(&mut self) {
        self.storage.append_empty_value();
    }

    fn reserve(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }

    fn resize(&mut self, len: usize) {
        self.storage.resize(len);
    }

    fn finish_data(&mut self) -> ArrayData {
        self.storage.finish_data().with_data_type(self.data_type.clone())
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        self.storage.append_value_from_str(s)
    }

    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        self.storage.append_json(value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_format::ExtensionType;

    use super::*;
    use crate::{array::Array, builder::FixedSizeBinaryBuilder};

    #[derive(Debug)]
    struct Uuid;

    static STORAGE: DataType = DataType::FixedSizeBinary(16);

    impl ExtensionType for Uuid {
        fn name(&self) -> &str {
            "builder.uuid"
        }

        fn storage_type(&self) -> &DataType {
            &STORAGE
        }

        fn serialize(&self) -> String {
            String::new()
        }

        fn deserialize(&self, _storage: DataType, _serialized: &str) -> Result<ExtensionRef> {
            Ok(Arc::new(Uuid))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_appends_reach_storage() {
        let mut b = ExtensionBuilder::new(Arc::new(Uuid));
        b.storage_builder_as::<FixedSizeBinaryBuilder>()
            .append_value([7u8; 16]);
        b.append_null();
        b.append_empty_value();
        assert_eq!((b.len(), b.null_count()), (3, 1));

        let array = b.finish();
        assert_eq!(array.data_type().to_string(), "extension<builder.uuid>");
        assert_eq!(array.storage().data_type(), &STORAGE);
        assert!(array.is_null(1));
        array.to_data().validate_full().unwrap();
    }
}

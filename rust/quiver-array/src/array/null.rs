use std::any::Any;

use quiver_format::DataType;

use super::Array;
use crate::{data::ArrayData, marshal::MarshalValue};

/// Array of the `null` type: every slot is null and there are no buffers.
#[derive(Debug, Clone)]
pub struct NullArray {
    data: ArrayData,
}

impl NullArray {
    pub fn new(len: usize) -> NullArray {
        NullArray {
            data: ArrayData::new(DataType::Null, len, 0, Some(len), vec![None], vec![]),
        }
    }

    pub fn from_data(data: ArrayData) -> NullArray {
        assert_eq!(data.data_type().storage_type(), &DataType::Null);
        NullArray { data }
    }
}

impl Array for NullArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, _i: usize) -> String {
        super::NULL_VALUE_STR.to_string()
    }

    fn marshal_value(&self, _i: usize) -> MarshalValue {
        MarshalValue::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_slots_null() {
        let array = NullArray::new(3);
        assert_eq!(array.null_count(), 3);
        assert!(array.is_null(0));
        assert_eq!((&array as &dyn Array).to_string(), "[(null) (null) (null)]");
        let slice = array.slice(1, 3);
        assert_eq!(slice.null_count(), 2);
    }
}

use std::any::Any;

use quiver_bits::get_bit;
use quiver_format::DataType;

use super::Array;
use crate::{builder::BooleanBuilder, data::ArrayData, marshal::MarshalValue};

/// Array of bit-packed booleans.
#[derive(Debug, Clone)]
pub struct BooleanArray {
    data: ArrayData,
}

impl BooleanArray {
    pub fn from_data(data: ArrayData) -> BooleanArray {
        assert_eq!(
            data.data_type().storage_type(),
            &DataType::Boolean,
            "boolean array over non-boolean data"
        );
        BooleanArray { data }
    }

    #[inline]
    pub fn value(&self, i: usize) -> bool {
        assert!(i < self.len(), "index {i} out of bounds for length {}", self.len());
        get_bit(self.data.buffer(1), self.data.offset() + i)
    }

    /// Number of valid slots holding `true`.
    pub fn true_count(&self) -> usize {
        (0..self.len())
            .filter(|&i| self.is_valid(i) && self.value(i))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<bool>> + '_ {
        (0..self.len()).map(|i| self.is_valid(i).then(|| self.value(i)))
    }
}

impl Array for BooleanArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        self.value(i).to_string()
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        MarshalValue::Bool(self.value(i))
    }
}

impl From<Vec<bool>> for BooleanArray {
    fn from(values: Vec<bool>) -> Self {
        let mut builder = BooleanBuilder::with_capacity(values.len());
        builder.append_values(&values, &[]);
        builder.finish()
    }
}

impl From<Vec<Option<bool>>> for BooleanArray {
    fn from(values: Vec<Option<bool>>) -> Self {
        let mut builder = BooleanBuilder::with_capacity(values.len());
        for value in values {
            builder.append_option(value);
        }
        builder.finish()
    }
}

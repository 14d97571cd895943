use std::any::Any;

use quiver_common::{Result, error::Error};
use quiver_format::DataType;

use super::ArrayBuilder;
use crate::{array::NULL_VALUE_STR, data::ArrayData};

/// Builder of `null` arrays; only counts slots.
#[derive(Debug, Default)]
pub struct NullBuilder {
    len: usize,
}

impl NullBuilder {
    pub fn new() -> NullBuilder {
        NullBuilder::default()
    }
}

impl ArrayBuilder for NullBuilder {
    fn data_type(&self) -> &DataType {
        &DataType::Null
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.len
    }

    fn null_count(&self) -> usize {
        self.len
    }

    fn append_null(&mut self) {
        self.len += 1;
    }

    fn append_nulls(&mut self, n: usize) {
        self.len += n;
    }

    fn append_empty_value(&mut self) {
        self.len += 1;
    }

    fn append_empty_values(&mut self, n: usize) {
        self.len += n;
    }

    fn reserve(&mut self, _additional: usize) {}

    fn resize(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    fn finish_data(&mut self) -> ArrayData {
        let len = std::mem::take(&mut self.len);
        ArrayData::new(DataType::Null, len, 0, Some(len), vec![None], vec![])
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        if s != NULL_VALUE_STR {
            return Err(Error::parse(s, DataType::Null, "only nulls can be appended"));
        }
        self.append_null();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

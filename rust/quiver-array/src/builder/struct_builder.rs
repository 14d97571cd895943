use std::any::Any;

use quiver_common::{Result, error::Error};
use quiver_format::{DataType, Fields};

use super::{
    ArrayBuilder, ValidityBuilder, append_json_text, downcast_builder_mut,
    make_builder_with_capacity,
};
use crate::{array::StructArray, data::ArrayData};

/// Builder of struct arrays with one child builder per field.
///
/// Valid rows only record validity; the caller appends to every field
/// builder. Null and empty rows fill all children so their lengths stay
/// equal.
#[derive(Debug)]
pub struct StructBuilder {
    data_type: DataType,
    children: Vec<Box<dyn ArrayBuilder>>,
    validity: ValidityBuilder,
}

impl StructBuilder {
    pub fn new(fields: Fields) -> StructBuilder {
        StructBuilder::with_capacity(fields, 0)
    }

    pub fn with_capacity(fields: Fields, capacity: usize) -> StructBuilder {
        let children = fields
            .iter()
            .map(|f| make_builder_with_capacity(f.data_type(), capacity))
            .collect();
        StructBuilder {
            data_type: DataType::Struct(fields),
            children,
            validity: ValidityBuilder::with_capacity(capacity),
        }
    }

    pub fn fields(&self) -> &Fields {
        match &self.data_type {
            DataType::Struct(fields) => fields,
            _ => unreachable!("struct builder always has a struct type"),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.children.len()
    }

    /// Records a row. A null row also appends a null to every child.
    pub fn append(&mut self, valid: bool) {
        if valid {
            self.validity.append(true);
        } else {
            self.append_null();
        }
    }

    pub fn field_builder(&mut self, i: usize) -> &mut dyn ArrayBuilder {
        self.children[i].as_mut()
    }

    pub fn field_builder_as<B: ArrayBuilder>(&mut self, i: usize) -> &mut B {
        downcast_builder_mut(self.children[i].as_mut())
    }

    pub fn finish(&mut self) -> StructArray {
        StructArray::from_data(self.finish_data())
    }
}

impl ArrayBuilder for StructBuilder {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.validity.len()
    }

    fn capacity(&self) -> usize {
        self.validity.capacity()
    }

    fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    fn append_null(&mut self) {
        self.validity.append(false);
        for child in &mut self.children {
            child.append_null();
        }
    }

    fn append_nulls(&mut self, n: usize) {
        self.validity.append_n(n, false);
        for child in &mut self.children {
            child.append_nulls(n);
        }
    }

    fn append_empty_value(&mut self) {
        self.validity.append(true);
        for child in &mut self.children {
            child.append_empty_value();
        }
    }

    fn append_empty_values(&mut self, n: usize) {
        self.validity.append_n(n, true);
        for child in &mut self.children {
            child.append_empty_values(n);
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.validity.reserve(additional);
        for child in &mut self.children {
            child.reserve(additional);
        }
    }

    fn resize(&mut self, len: usize) {
        if len < self.len() {
            self.validity.truncate(len);
            for child in &mut self.children {
                child.resize(len);
            }
        } else {
            self.reserve(len - self.len());
        }
    }

    /// # Panics
    ///
    /// Panics when a field builder's length differs from the row count.
    fn finish_data(&mut self) -> ArrayData {
        let len = self.validity.len();
        for (field, child) in self.fields().iter().zip(&self.children) {
            assert_eq!(
                child.len(),
                len,
                "struct field '{}' has {} values for {len} rows",
                field.name(),
                child.len()
            );
        }
        let (validity, null_count) = self.validity.finish();
        let children = self.children.iter_mut().map(|c| c.finish_data()).collect();
        ArrayData::new(
            self.data_type.clone(),
            len,
            0,
            Some(null_count),
            vec![validity],
            children,
        )
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        append_json_text(self, s)
    }

    /// Appends a JSON object; absent fields become nulls and unknown keys
    /// are ignored.
    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        let object = match value {
            serde_json::Value::Null => {
                self.append_null();
                return Ok(());
            }
            serde_json::Value::Object(object) => object,
            other => {
                return Err(Error::parse(
                    other.to_string(),
                    &self.data_type,
                    "expected a JSON object",
                ));
            }
        };
        let names: Vec<String> = self.fields().iter().map(|f| f.name().to_string()).collect();
        for (name, child) in names.iter().zip(&mut self.children) {
            match object.get(name) {
                Some(v) => child.append_json(v)?,
                None => child.append_null(),
            }
        }
        self.validity.append(true);
        Ok(())
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
    use quiver_format::Field;

    use super::*;
    use crate::{
        array::Array,
        builder::{BooleanBuilder, Int64Builder},
    };

    fn fields() -> Fields {
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("flag", DataType::Boolean, true),
        ]
        .into()
    }

    #[test]
    fn test_rows_and_null_rows() {
        let mut b = StructBuilder::new(fields());
        b.field_builder_as::<Int64Builder>(0).append_value(7);
        b.field_builder_as::<BooleanBuilder>(1).append_value(true);
        b.append(true);
        b.append(false);
        b.append_empty_value();
        let array = b.finish();
        assert_eq!(array.len(), 3);
        assert_eq!(array.null_count(), 1);
        assert_eq!(array.field(0).null_count(), 1);
        assert_eq!(array.value_str(0), r#"{"id":7,"flag":true}"#);
        assert_eq!(array.value_str(2), r#"{"id":0,"flag":false}"#);
    }

    #[test]
    #[should_panic(expected = "has 0 values for 1 rows")]
    fn test_unbalanced_children_panic() {
        let mut b = StructBuilder::new(fields());
        b.append(true);
        b.finish_data();
    }
}

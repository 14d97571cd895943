use std::any::Any;

use quiver_bytes::Buffer;
use quiver_common::Result;
use quiver_format::{DataType, Field, Fields};

use super::{Array, ArrayRef, make_array};
use crate::{data::ArrayData, marshal::MarshalValue};

/// Array of records, one child array per field.
///
/// Children are exposed already sliced to this array's offset and length,
/// so slot `i` of the struct is slot `i` of every field.
#[derive(Debug, Clone)]
pub struct StructArray {
    data: ArrayData,
    fields: Vec<ArrayRef>,
}

impl StructArray {
    pub fn from_data(data: ArrayData) -> StructArray {
        assert!(
            matches!(data.data_type().storage_type(), DataType::Struct(_)),
            "{} data cannot be viewed as a struct array",
            data.data_type()
        );
        let (offset, len) = (data.offset(), data.len());
        let fields = data
            .children()
            .iter()
            .map(|child| {
                if offset == 0 && child.len() == len {
                    make_array(child.clone())
                } else {
                    make_array(child.slice(offset, offset + len))
                }
            })
            .collect();
        StructArray { data, fields }
    }

    pub fn try_new(
        fields: Fields,
        children: Vec<ArrayRef>,
        validity: Option<Buffer>,
    ) -> Result<StructArray> {
        let len = children.first().map_or(0, |c| c.len());
        let data = ArrayData::builder(DataType::Struct(fields))
            .len(len)
            .buffers(vec![validity])
            .children(children.iter().map(|c| c.to_data()).collect())
            .build_validated()?;
        Ok(StructArray::from_data(data))
    }

    /// All-valid struct of named nullable columns.
    pub fn from_columns(columns: Vec<(&str, ArrayRef)>) -> Result<StructArray> {
        let fields = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Fields>();
        StructArray::try_new(fields, columns.into_iter().map(|(_, a)| a).collect(), None)
    }

    pub fn fields(&self) -> &Fields {
        match self.data.data_type().storage_type() {
            DataType::Struct(fields) => fields,
            _ => unreachable!("checked in from_data"),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Child array of field `i`.
    pub fn field(&self, i: usize) -> &ArrayRef {
        &self.fields[i]
    }

    pub fn field_by_name(&self, name: &str) -> Option<&ArrayRef> {
        self.fields().index_of(name).map(|i| &self.fields[i])
    }

    pub fn columns(&self) -> &[ArrayRef] {
        &self.fields
    }
}

impl Array for StructArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        self.marshal_value(i).to_json()
    }

    fn marshal_value(&self, i: usize) -> MarshalValue {
        MarshalValue::Record(
            self.fields()
                .iter()
                .zip(&self.fields)
                .map(|(field, child)| (field.name().to_string(), child.get_one_for_marshal(i)))
                .collect(),
        )
    }

    fn display_value(&self, i: usize) -> String {
        if self.is_null(i) {
            return super::NULL_VALUE_STR.to_string();
        }
        let values: Vec<String> = self.fields.iter().map(|c| c.display_value(i)).collect();
        format!("{{{}}}", values.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::array::{Int32Array, StringArray};

    fn sample() -> StructArray {
        StructArray::from_columns(vec![
            ("a", Arc::new(Int32Array::from_options(vec![Some(1), None, Some(3)])) as ArrayRef),
            ("b", Arc::new(StringArray::from(vec!["x", "y", "z"])) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_struct_access() {
        let array = sample();
        assert_eq!(array.num_fields(), 2);
        assert_eq!(array.field_by_name("b").unwrap().value_str(1), "y");
        assert_eq!(array.value_str(1), r#"{"a":null,"b":"y"}"#);
        assert_eq!((&array as &dyn Array).to_string(), r#"[{1 "x"} {(null) "y"} {3 "z"}]"#);
    }

    #[test]
    fn test_sliced_struct_slices_children() {
        let array = sample();
        let slice = StructArray::from_data(array.to_data().slice(1, 3));
        assert_eq!(slice.field(0).len(), 2);
        assert_eq!(slice.field(1).value_str(0), "y");
        assert!(slice.field(0).is_null(0));
    }

    #[test]
    fn test_mismatched_children_rejected() {
        let fields = Fields::from(vec![Field::new("a", DataType::Int64, true)]);
        let child: ArrayRef = Arc::new(Int32Array::from_values(vec![1]));
        assert!(StructArray::try_new(fields, vec![child], None).is_err());
    }
}

use std::any::Any;

use quiver_bytes::Buffer;
use quiver_common::{Result, error::Error, verify_arg};
use quiver_format::{DataType, UnionFields, UnionMode};

use super::{Array, ArrayRef, make_array};
use crate::{builder::ValidityBuilder, data::ArrayData, marshal::MarshalValue};

/// Array whose slots each hold a value of one of several child types.
///
/// Sparse unions keep every child as long as the union; dense unions carry
/// an `i32` offset per slot into the selected child. Unions have no validity
/// bitmap of their own: a slot is null when the selected child value is.
#[derive(Debug, Clone)]
pub struct UnionArray {
    data: ArrayData,
    children: Vec<ArrayRef>,
    child_ids: [i32; UnionFields::MAX_TYPE_CODES],
}

impl UnionArray {
    pub fn from_data(data: ArrayData) -> UnionArray {
        let child_ids = match data.data_type().storage_type() {
            DataType::Union(fields, _) => fields.child_ids(),
            other => panic!("{other} data cannot be viewed as a union array"),
        };
        let children = data.children().iter().cloned().map(make_array).collect();
        UnionArray {
            data,
            children,
            child_ids,
        }
    }

    /// Builds a union from type codes, optional dense offsets and children.
    ///
    /// `offsets` must be given exactly for dense unions.
    pub fn try_new(
        fields: UnionFields,
        type_codes: &[i8],
        offsets: Option<&[i32]>,
        children: Vec<ArrayRef>,
    ) -> Result<UnionArray> {
        let mode = if offsets.is_some() {
            UnionMode::Dense
        } else {
            UnionMode::Sparse
        };
        let mut buffers = vec![None, Some(Buffer::from_typed_slice(type_codes))];
        if let Some(offsets) = offsets {
            buffers.push(Some(Buffer::from_typed_slice(offsets)));
        }
        let data = ArrayData::builder(DataType::Union(fields, mode))
            .len(type_codes.len())
            .buffers(buffers)
            .children(children.iter().map(|c| c.to_data()).collect())
            .build_validated()?;
        Ok(UnionArray::from_data(data))
    }

    pub fn mode(&self) -> UnionMode {
        match self.data.data_type().storage_type() {
            DataType::Union(_, mode) => *mode,
            _ => unreachable!("checked in from_data"),
        }
    }

    pub fn union_fields(&self) -> &UnionFields {
        match self.data.data_type().storage_type() {
            DataType::Union(fields, _) => fields,
            _ => unreachable!("checked in from_data"),
        }
    }

    pub fn type_codes(&self) -> &[i8] {
        let offset = self.data.offset();
        &self.data.typed_buffer::<i8>(1)[offset..offset + self.len()]
    }

    #[inline]
    pub fn type_code(&self, i: usize) -> i8 {
        self.type_codes()[i]
    }

    /// Index of the child selected by slot `i`.
    #[inline]
    pub fn child_id(&self, i: usize) -> usize {
        self.child_ids[self.type_code(i) as usize] as usize
    }

    /// Position of slot `i`'s value in its child.
    pub fn value_offset(&self, i: usize) -> usize {
        match self.mode() {
            UnionMode::Sparse => self.data.offset() + i,
            UnionMode::Dense => self.data.typed_buffer::<i32>(2)[self.data.offset() + i] as usize,
        }
    }

    /// Raw dense offsets of this array's slots.
    pub fn value_offsets(&self) -> &[i32] {
        match self.mode() {
            UnionMode::Sparse => &[],
            UnionMode::Dense => {
                let offset = self.data.offset();
                &self.data.typed_buffer::<i32>(2)[offset..offset + self.len()]
            }
        }
    }

    /// Child array `i`, not sliced to this array's range.
    pub fn field(&self, i: usize) -> &ArrayRef {
        &self.children[i]
    }

    pub fn num_fields(&self) -> usize {
        self.children.len()
    }

    /// Child `i` sliced to this array's range, with every slot that does
    /// not select the child masked as null.
    ///
    /// Only sparse unions can be flattened.
    pub fn flattened_field(&self, i: usize) -> Result<ArrayRef> {
        if self.mode() != UnionMode::Sparse {
            return Err(Error::invalid_arg("mode", "only sparse union fields can be flattened"));
        }
        verify_arg!(i, i < self.num_fields());
        let offset = self.data.offset();
        let child = self.children[i].to_data().slice(offset, offset + self.len());
        let storage = child.data_type().storage_type();
        if matches!(storage, DataType::Null) {
            return Ok(make_array(child));
        }
        if !storage.has_validity_bitmap() {
            return Err(Error::not_implemented(format!(
                "flattening a union field of type {}",
                child.data_type()
            )));
        }

        // The bitmap is addressed through the child's offset like the rest
        // of its buffers.
        let code = self.union_fields().type_codes()[i];
        let mut validity = ValidityBuilder::with_capacity(child.offset() + child.len());
        validity.append_n(child.offset(), true);
        for (j, &type_code) in self.type_codes().iter().enumerate() {
            validity.append(type_code == code && child.is_valid(j));
        }
        let (validity, null_count) = validity.finish();
        let mut buffers = child.buffers().to_vec();
        buffers[0] = validity;
        Ok(make_array(
            child.into_builder().buffers(buffers).null_count(null_count).build(),
        ))
    }

    fn selected(&self, i: usize) -> (&ArrayRef, usize) {
        (&self.children[self.child_id(i)], self.value_offset(i))
    }
}

impl Array for UnionArray {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data(&self) -> &ArrayData {
        &self.data
    }

    fn value_text(&self, i: usize) -> String {
        match self.marshal_value(i) {
            MarshalValue::Null => super::NULL_VALUE_STR.to_string(),
            value => value.to_json(),
        }
    }

    /// `[type_code, value]`, or null when the selected child value is null.
    fn marshal_value(&self, i: usize) -> MarshalValue {
        let (child, j) = self.selected(i);
        if child.is_null(j) {
            return MarshalValue::Null;
        }
        MarshalValue::List(vec![
            MarshalValue::Int(self.type_code(i) as i64),
            child.get_one_for_marshal(j),
        ])
    }

    fn display_value(&self, i: usize) -> String {
        let (child, j) = self.selected(i);
        let name = self.union_fields().fields()[self.child_id(i)].name().to_string();
        format!("{{{name}={}}}", child.display_value(j))
    }
}

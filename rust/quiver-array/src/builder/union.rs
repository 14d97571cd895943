use std::{any::Any, sync::Arc};

use quiver_common::{Result, error::Error};
use quiver_format::{DataType, Field, UnionFields, UnionMode};

use super::{
    ArrayBuilder, BufferBuilder, append_json_text, downcast_builder_mut,
    make_builder_with_capacity,
};
use crate::{array::UnionArray, data::ArrayData};

/// Builder of sparse and dense union arrays.
///
/// [`append`](Self::append) records the type code of the next slot; the
/// caller then appends exactly one value to that code's child. In sparse
/// mode every other child receives an empty value so all children stay as
/// long as the union.
#[derive(Debug)]
pub struct UnionBuilder {
    data_type: DataType,
    mode: UnionMode,
    type_codes: BufferBuilder<i8>,
    offsets: BufferBuilder<i32>,
    children: Vec<Box<dyn ArrayBuilder>>,
    child_ids: [i32; UnionFields::MAX_TYPE_CODES],
}

impl UnionBuilder {
    pub fn new_sparse(fields: UnionFields) -> UnionBuilder {
        UnionBuilder::with_capacity(fields, UnionMode::Sparse, 0)
    }

    pub fn new_dense(fields: UnionFields) -> UnionBuilder {
        UnionBuilder::with_capacity(fields, UnionMode::Dense, 0)
    }

    pub fn with_capacity(fields: UnionFields, mode: UnionMode, capacity: usize) -> UnionBuilder {
        let child_capacity = match mode {
            UnionMode::Sparse => capacity,
            UnionMode::Dense => 0,
        };
        let children = fields
            .fields()
            .iter()
            .map(|f| make_builder_with_capacity(f.data_type(), child_capacity))
            .collect();
        UnionBuilder {
            child_ids: fields.child_ids(),
            data_type: DataType::Union(fields, mode),
            mode,
            type_codes: BufferBuilder::with_capacity(capacity),
            offsets: BufferBuilder::with_capacity(match mode {
                UnionMode::Sparse => 0,
                UnionMode::Dense => capacity,
            }),
            children,
        }
    }

    pub fn mode(&self) -> UnionMode {
        self.mode
    }

    /// Starts a slot of type `code`. The value itself goes to
    /// [`child(code)`](Self::child).
    ///
    /// # Panics
    ///
    /// Panics when `code` is not one of the union's type codes.
    pub fn append(&mut self, code: i8) {
        let child_id = self.child_id(code);
        self.type_codes.append(code);
        match self.mode {
            UnionMode::Sparse => {
                for (i, child) in self.children.iter_mut().enumerate() {
                    if i != child_id {
                        child.append_empty_value();
                    }
                }
            }
            UnionMode::Dense => {
                let offset = i32::try_from(self.children[child_id].len())
                    .unwrap_or_else(|_| panic!("dense union child exceeds i32 offsets"));
                self.offsets.append(offset);
            }
        }
    }

    /// Builder of the child selected by `code`.
    pub fn child(&mut self, code: i8) -> &mut dyn ArrayBuilder {
        let child_id = self.child_id(code);
        self.children[child_id].as_mut()
    }

    pub fn child_as<B: ArrayBuilder>(&mut self, code: i8) -> &mut B {
        let child_id = self.child_id(code);
        downcast_builder_mut(self.children[child_id].as_mut())
    }

    /// Registers `child` as a new nullable field named `name` under the
    /// lowest unused type code, and returns that code.
    ///
    /// In sparse mode the child is padded with empty values up to the
    /// union's current length; it must not already be longer.
    pub fn append_child(&mut self, name: &str, mut child: Box<dyn ArrayBuilder>) -> Result<i8> {
        let code = (0..UnionFields::MAX_TYPE_CODES)
            .find(|&c| self.child_ids[c] < 0)
            .ok_or_else(|| {
                Error::invalid_arg("child", format!("{} has no free type code", self.data_type))
            })? as i8;
        if self.mode == UnionMode::Sparse {
            let len = self.len();
            if child.len() > len {
                return Err(Error::invalid_arg(
                    "child",
                    format!("sparse union child has {} values for {len} slots", child.len()),
                ));
            }
            while child.len() < len {
                child.append_empty_value();
            }
        }

        let DataType::Union(fields, _) = &self.data_type else {
            unreachable!("union builder always has a union type");
        };
        let mut type_codes = fields.type_codes().to_vec();
        type_codes.push(code);
        let mut child_fields = fields.fields().to_vec();
        child_fields.push(Arc::new(Field::new(name, child.data_type().clone(), true)));
        let extended = UnionFields::try_new(type_codes, child_fields)?;

        self.child_ids = extended.child_ids();
        self.data_type = DataType::Union(extended, self.mode);
        self.children.push(child);
        Ok(code)
    }

    pub fn finish(&mut self) -> UnionArray {
        UnionArray::from_data(self.finish_data())
    }

    fn child_id(&self, code: i8) -> usize {
        let id = usize::try_from(code)
            .ok()
            .and_then(|c| self.child_ids.get(c))
            .copied()
            .unwrap_or(-1);
        usize::try_from(id)
            .unwrap_or_else(|_| panic!("type code {code} is not part of {}", self.data_type))
    }

    fn first_code(&self) -> i8 {
        match &self.data_type {
            DataType::Union(fields, _) => *fields
                .type_codes()
                .first()
                .unwrap_or_else(|| panic!("cannot append to a union without fields")),
            _ => unreachable!("union builder always has a union type"),
        }
    }
}

impl ArrayBuilder for UnionBuilder {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.type_codes.len()
    }

    fn capacity(&self) -> usize {
        self.type_codes.capacity()
    }

    /// Unions carry no validity bitmap of their own.
    fn null_count(&self) -> usize {
        0
    }

    /// Appends a null to the first child.
    fn append_null(&mut self) {
        let code = self.first_code();
        self.append(code);
        self.child(code).append_null();
    }

    fn append_empty_value(&mut self) {
        let code = self.first_code();
        self.append(code);
        self.child(code).append_empty_value();
    }

    fn reserve(&mut self, additional: usize) {
        self.type_codes.reserve(additional);
        match self.mode {
            UnionMode::Sparse => {
                for child in &mut self.children {
                    child.reserve(additional);
                }
            }
            UnionMode::Dense => self.offsets.reserve(additional),
        }
    }

    fn resize(&mut self, len: usize) {
        if len >= self.len() {
            self.reserve(len - self.len());
            return;
        }
        match self.mode {
            UnionMode::Sparse => {
                for child in &mut self.children {
                    child.resize(len);
                }
            }
            UnionMode::Dense => {
                let mut child_lens = vec![0; self.children.len()];
                for (&code, &offset) in self.type_codes.as_slice()[..len]
                    .iter()
                    .zip(&self.offsets.as_slice()[..len])
                {
                    let child_id = self.child_ids[code as usize] as usize;
                    child_lens[child_id] = child_lens[child_id].max(offset as usize + 1);
                }
                for (child, child_len) in self.children.iter_mut().zip(child_lens) {
                    child.resize(child_len);
                }
                self.offsets.truncate(len);
            }
        }
        self.type_codes.truncate(len);
    }

    /// # Panics
    ///
    /// Panics in sparse mode when a child's length differs from the
    /// union's.
    fn finish_data(&mut self) -> ArrayData {
        let len = self.type_codes.len();
        if self.mode == UnionMode::Sparse {
            for child in &self.children {
                assert_eq!(
                    child.len(),
                    len,
                    "sparse union child has {} values for {len} slots",
                    child.len()
                );
            }
        }
        let mut buffers = vec![None, Some(self.type_codes.finish())];
        if self.mode == UnionMode::Dense {
            buffers.push(Some(self.offsets.finish()));
        }
        let children = self.children.iter_mut().map(|c| c.finish_data()).collect();
        ArrayData::new(self.data_type.clone(), len, 0, Some(0), buffers, children)
    }

    fn append_value_from_str(&mut self, s: &str) -> Result<()> {
        append_json_text(self, s)
    }

    /// Accepts `[type_code, value]` or `null`.
    fn append_json(&mut self, value: &serde_json::Value) -> Result<()> {
        if value.is_null() {
            self.append_null();
            return Ok(());
        }
        let pair = value.as_array().filter(|a| a.len() == 2);
        let code = pair
            .and_then(|p| p[0].as_i64())
            .and_then(|c| i8::try_from(c).ok())
            .filter(|&c| c >= 0 && self.child_ids[c as usize] >= 0);
        match (pair, code) {
            (Some(pair), Some(code)) => {
                self.append(code);
                self.child(code).append_json(&pair[1])
            }
            _ => Err(Error::parse(
                value.to_string(),
                &self.data_type,
                "expected [type_code, value] with a known type code",
            )),
        }
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
        builder::{Float64Builder, Int32Builder, make_builder},
    };

    fn fields() -> UnionFields {
        UnionFields::try_new(
            vec![5, 2],
            vec![
                Field::new("i", DataType::Int32, true),
                Field::new("f", DataType::Float64, true),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_sparse_union() {
        let mut b = UnionBuilder::new_sparse(fields());
        b.append(5);
        b.child_as::<Int32Builder>(5).append_value(1);
        b.append(2);
        b.child_as::<Float64Builder>(2).append_value(2.5);
        b.append_value_from_str("[5, null]").unwrap();
        let union = b.finish();
        assert_eq!(union.type_codes(), &[5, 2, 5]);
        assert_eq!(union.field(1).len(), 3);
        assert_eq!((&union as &dyn Array).to_string(), "[{i=1} {f=2.5} {i=(null)}]");
        union.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_dense_union_offsets() {
        let mut b = UnionBuilder::new_dense(fields());
        b.append_value_from_str("[2, 1.5]").unwrap();
        b.append_value_from_str("[5, 7]").unwrap();
        b.append_value_from_str("[2, 3]").unwrap();
        b.append_value_from_str("[5, 8]").unwrap();
        b.resize(3);
        let union = b.finish();
        assert_eq!(union.value_offsets(), &[0, 0, 1]);
        assert_eq!(union.field(0).len(), 1);
        assert_eq!(union.field(1).len(), 2);
        assert_eq!(union.value_str(2), "[2,3.0]");
        union.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_append_child_pads_sparse_children() {
        let mut b = UnionBuilder::new_sparse(fields());
        b.append(5);
        b.child_as::<Int32Builder>(5).append_value(1);
        let code = b.append_child("s", make_builder(&DataType::Utf8)).unwrap();
        assert_eq!(code, 0);
        b.append(code);
        b.child(code).append_value_from_str("x").unwrap();
        let union = b.finish();
        assert_eq!(union.union_fields().type_codes(), &[5, 2, 0]);
        assert_eq!(union.field(2).len(), 2);
        assert_eq!((&union as &dyn Array).to_string(), r#"[{i=1} {s="x"}]"#);
        union.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_append_child_to_dense_union() {
        let mut b = UnionBuilder::new_dense(fields());
        b.append_value_from_str("[5, 3]").unwrap();
        let code = b.append_child("s", make_builder(&DataType::Utf8)).unwrap();
        b.append_value_from_str(&format!(r#"[{code}, "y"]"#)).unwrap();
        let union = b.finish();
        assert_eq!(union.value_offsets(), &[0, 0]);
        assert_eq!(union.child_id(1), 2);
        assert_eq!((&union as &dyn Array).to_string(), r#"[{i=3} {s="y"}]"#);
        union.to_data().validate_full().unwrap();
    }

    #[test]
    fn test_unknown_code_rejected() {
        let mut b = UnionBuilder::new_sparse(fields());
        assert!(b.append_value_from_str("[3, 1]").is_err());
        assert!(b.is_empty());
    }

    #[test]
    #[should_panic(expected = "type code 0 is not part of")]
    fn test_unknown_code_panics() {
        UnionBuilder::new_dense(fields()).append(0);
    }
}

use std::{fmt, ops::Deref, sync::Arc};

use quiver_common::{Result, error::Error};

use crate::datatype::DataType;

/// A named, typed child slot of a nested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    data_type: DataType,
    nullable: bool,
}

pub type FieldRef = Arc<Field>;

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Field {
        Field {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    /// The conventional `item` field of list-like types.
    pub fn list_item(data_type: DataType) -> Field {
        Field::new("item", data_type, true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Field {
        self.name = name.into();
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Field {
        self.data_type = data_type;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Field {
        self.nullable = nullable;
        self
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)?;
        if self.nullable {
            write!(f, ", nullable")?;
        }
        Ok(())
    }
}

/// Ordered, cheaply clonable list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields(Arc<[FieldRef]>);

impl Fields {
    pub fn empty() -> Fields {
        Fields(Arc::from(Vec::new()))
    }

    /// Position of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|f| f.name() == name)
    }

    pub fn find(&self, name: &str) -> Option<&FieldRef> {
        self.0.iter().find(|f| f.name() == name)
    }
}

impl Deref for Fields {
    type Target = [FieldRef];

    fn deref(&self) -> &[FieldRef] {
        &self.0
    }
}

impl From<Vec<Field>> for Fields {
    fn from(fields: Vec<Field>) -> Fields {
        Fields(fields.into_iter().map(Arc::new).collect())
    }
}

impl From<Vec<FieldRef>> for Fields {
    fn from(fields: Vec<FieldRef>) -> Fields {
        Fields(fields.into())
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Fields {
        Fields(iter.into_iter().map(Arc::new).collect())
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a FieldRef;
    type IntoIter = std::slice::Iter<'a, FieldRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Fields of a union type, each tagged with the type code stored in the
/// union's type-id buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionFields {
    type_codes: Arc<[i8]>,
    fields: Fields,
}

impl UnionFields {
    /// Maximum type code value plus one.
    pub const MAX_TYPE_CODES: usize = 128;

    /// Creates union fields with explicit type codes.
    ///
    /// Codes must be non-negative, below 128 and unique, and there must be
    /// exactly one per field.
    pub fn try_new(type_codes: Vec<i8>, fields: impl Into<Fields>) -> Result<UnionFields> {
        let fields = fields.into();
        if type_codes.len() != fields.len() {
            return Err(Error::invalid_arg(
                "type_codes",
                format!(
                    "{} type codes for {} union fields",
                    type_codes.len(),
                    fields.len()
                ),
            ));
        }
        let mut seen = [false; Self::MAX_TYPE_CODES];
        for &code in &type_codes {
            if code < 0 {
                return Err(Error::invalid_arg(
                    "type_codes",
                    format!("negative union type code {code}"),
                ));
            }
            if std::mem::replace(&mut seen[code as usize], true) {
                return Err(Error::invalid_arg(
                    "type_codes",
                    format!("duplicate union type code {code}"),
                ));
            }
        }
        Ok(UnionFields {
            type_codes: type_codes.into(),
            fields,
        })
    }

    /// Creates union fields with type codes `0..n`.
    pub fn from_fields(fields: impl Into<Fields>) -> UnionFields {
        let fields = fields.into();
        let type_codes = (0..fields.len() as i8).collect::<Vec<_>>();
        UnionFields {
            type_codes: type_codes.into(),
            fields,
        }
    }

    pub fn type_codes(&self) -> &[i8] {
        &self.type_codes
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Child position for a type code.
    pub fn child_index(&self, type_code: i8) -> Option<usize> {
        self.type_codes.iter().position(|&c| c == type_code)
    }

    /// Lookup table from type code to child position; unused codes map to `-1`.
    pub fn child_ids(&self) -> [i32; Self::MAX_TYPE_CODES] {
        let mut ids = [-1; Self::MAX_TYPE_CODES];
        for (i, &code) in self.type_codes.iter().enumerate() {
            ids[code as usize] = i as i32;
        }
        ids
    }

    /// Max type code in use, or `0` when there are no fields.
    pub fn max_type_code(&self) -> i8 {
        self.type_codes.iter().copied().max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i8, &FieldRef)> {
        self.type_codes.iter().copied().zip(self.fields.iter())
    }
}

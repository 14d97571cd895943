//! Values handed to external text/JSON encoders, one slot at a time.

use serde::{Serialize, Serializer, ser::SerializeMap};

/// One array slot in a shape an external encoder understands.
///
/// Byte-like values serialize as base64 text, records as maps keyed by field
/// name (in field order).
#[derive(Debug, Clone, PartialEq)]
pub enum MarshalValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<MarshalValue>),
    Record(Vec<(String, MarshalValue)>),
}

impl MarshalValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MarshalValue::Null)
    }

    /// Serializes to a JSON string.
    pub fn to_json(&self) -> String {
        // Serialization of this enum into a string writer cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for MarshalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MarshalValue::Null => serializer.serialize_unit(),
            MarshalValue::Bool(v) => serializer.serialize_bool(*v),
            MarshalValue::Int(v) => serializer.serialize_i64(*v),
            MarshalValue::UInt(v) => serializer.serialize_u64(*v),
            MarshalValue::Float(v) => serializer.serialize_f64(*v),
            MarshalValue::String(v) => serializer.serialize_str(v),
            MarshalValue::Bytes(v) => {
                use base64::Engine;
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(v))
            }
            MarshalValue::List(values) => serializer.collect_seq(values),
            MarshalValue::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for MarshalValue {
    fn from(v: bool) -> Self {
        MarshalValue::Bool(v)
    }
}

impl From<&str> for MarshalValue {
    fn from(v: &str) -> Self {
        MarshalValue::String(v.to_string())
    }
}

impl From<String> for MarshalValue {
    fn from(v: String) -> Self {
        MarshalValue::String(v)
    }
}

impl<T: Into<MarshalValue>> From<Option<T>> for MarshalValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(MarshalValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::MarshalValue;

    #[test]
    fn test_json_shapes() {
        let value = MarshalValue::Record(vec![
            ("b".to_string(), MarshalValue::Int(-1)),
            ("a".to_string(), MarshalValue::List(vec![MarshalValue::Null, true.into()])),
            ("c".to_string(), MarshalValue::Bytes(b"hi".to_vec())),
        ]);
        assert_eq!(value.to_json(), r#"{"b":-1,"a":[null,true],"c":"aGk="}"#);
    }

    #[test]
    fn test_option_conversion() {
        assert!(MarshalValue::from(None::<&str>).is_null());
        assert_eq!(MarshalValue::from(Some("x")), MarshalValue::String("x".into()));
    }
}

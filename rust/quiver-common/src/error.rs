use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        ErrorKind::InvalidOperation { name: name.into() }.into()
    }

    pub fn not_implemented(message: impl Into<String>) -> Error {
        ErrorKind::NotImplemented {
            message: message.into(),
        }
        .into()
    }

    pub fn type_mismatch(
        context: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Error {
        ErrorKind::TypeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into()
    }

    pub fn overflow(context: impl Into<String>) -> Error {
        ErrorKind::Overflow {
            context: context.into(),
        }
        .into()
    }

    pub fn dictionary_index_overflow(index_type: impl ToString, dictionary_len: usize) -> Error {
        ErrorKind::DictionaryIndexOverflow {
            index_type: index_type.to_string(),
            dictionary_len,
        }
        .into()
    }

    pub fn index_out_of_bounds(message: impl Into<String>) -> Error {
        ErrorKind::IndexOutOfBounds {
            message: message.into(),
        }
        .into()
    }

    pub fn invalid_data(element: impl Into<String>, message: impl Into<String>) -> Error {
        ErrorKind::InvalidData {
            element: element.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn parse(
        value: impl Into<String>,
        data_type: impl ToString,
        message: impl Into<String>,
    ) -> Error {
        ErrorKind::Parse {
            value: value.into(),
            data_type: data_type.to_string(),
            message: message.into(),
        }
        .into()
    }

    /// Whether this error reports an integer width that was too small for the
    /// result (offset rebasing, run-end rebasing or dictionary index width).
    pub fn is_overflow(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Overflow { .. } | ErrorKind::DictionaryIndexOverflow { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("not yet implemented: {message}")]
    NotImplemented { message: String },

    #[error("type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("integer overflow: {context}")]
    Overflow { context: String },

    #[error("dictionary of {dictionary_len} entries does not fit index type {index_type}")]
    DictionaryIndexOverflow {
        index_type: String,
        dictionary_len: usize,
    },

    #[error("index out of bounds: {message}")]
    IndexOutOfBounds { message: String },

    #[error("invalid array data for '{element}': {message}")]
    InvalidData { element: String, message: String },

    #[error("failed to parse '{value}' as {data_type}: {message}")]
    Parse {
        value: String,
        data_type: String,
        message: String,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::dictionary_index_overflow("int8", 300);
        assert_eq!(
            e.to_string(),
            "dictionary of 300 entries does not fit index type int8"
        );
        assert!(e.is_overflow());

        let e = Error::type_mismatch("concatenate", "int32", "utf8");
        assert_eq!(
            e.to_string(),
            "type mismatch in concatenate: expected int32, got utf8"
        );
        assert!(!e.is_overflow());
    }

    #[test]
    fn test_error_size() {
        assert_eq!(std::mem::size_of::<Error>(), std::mem::size_of::<usize>());
    }
}

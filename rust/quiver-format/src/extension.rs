//! User-defined logical types layered over a storage type.
//!
//! An extension type is identified by its name. Implementations are
//! registered once in a process-wide registry; readers that only know the
//! name and the serialized parameters resolve the registered prototype and
//! let it rebuild a concrete instance through [`ExtensionType::deserialize`].

use std::{
    any::Any,
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, LazyLock, RwLock},
};

use quiver_common::{Result, error::Error};

use crate::datatype::DataType;

pub type ExtensionRef = Arc<dyn ExtensionType>;

pub trait ExtensionType: Debug + Send + Sync + 'static {
    /// Unique name of the extension type.
    fn name(&self) -> &str;

    /// Physical type the values are stored as.
    fn storage_type(&self) -> &DataType;

    /// Serialized type parameters.
    fn serialize(&self) -> String;

    /// Builds an instance of this extension over `storage` from parameters
    /// produced by [`serialize`](Self::serialize).
    fn deserialize(&self, storage: DataType, serialized: &str) -> Result<ExtensionRef>;

    fn as_any(&self) -> &dyn Any;

    /// Equality of two extension types. The default compares name, storage
    /// type and serialized parameters.
    fn extension_equals(&self, other: &dyn ExtensionType) -> bool {
        self.name() == other.name()
            && self.storage_type() == other.storage_type()
            && self.serialize() == other.serialize()
    }
}

impl PartialEq for dyn ExtensionType {
    fn eq(&self, other: &dyn ExtensionType) -> bool {
        self.extension_equals(other)
    }
}

impl Eq for dyn ExtensionType {}

type Registry = HashMap<String, ExtensionRef, ahash::RandomState>;

static REGISTRY: LazyLock<RwLock<Registry>> =
    LazyLock::new(|| RwLock::new(HashMap::with_hasher(ahash::RandomState::new())));

/// Registers an extension type under its name.
///
/// Fails with `InvalidOperation` when the name is already registered.
pub fn register_extension_type(ext: ExtensionRef) -> Result<()> {
    let mut registry = REGISTRY
        .write()
        .map_err(|_| Error::invalid_operation("extension registry poisoned"))?;
    let name = ext.name().to_string();
    if registry.contains_key(&name) {
        return Err(Error::invalid_operation(format!(
            "extension type '{name}' is already registered"
        )));
    }
    log::debug!("registering extension type '{name}'");
    registry.insert(name, ext);
    Ok(())
}

/// Removes a registered extension type.
///
/// Fails with `InvalidOperation` when the name is not registered.
pub fn unregister_extension_type(name: &str) -> Result<()> {
    let mut registry = REGISTRY
        .write()
        .map_err(|_| Error::invalid_operation("extension registry poisoned"))?;
    match registry.remove(name) {
        Some(_) => Ok(()),
        None => Err(Error::invalid_operation(format!(
            "extension type '{name}' is not registered"
        ))),
    }
}

/// Looks up a registered extension type by name.
pub fn get_extension_type(name: &str) -> Option<ExtensionRef> {
    REGISTRY.read().ok()?.get(name).cloned()
}

/// Resolves a registered extension by name and rebuilds it over `storage`
/// from its serialized parameters.
pub fn resolve_extension_type(
    name: &str,
    storage: DataType,
    serialized: &str,
) -> Result<ExtensionRef> {
    let prototype = get_extension_type(name).ok_or_else(|| {
        Error::invalid_arg("name", format!("unknown extension type '{name}'"))
    })?;
    prototype.deserialize(storage, serialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Uuid {
        storage: DataType,
    }

    fn uuid() -> Arc<Uuid> {
        Arc::new(Uuid {
            storage: DataType::FixedSizeBinary(16),
        })
    }

    impl ExtensionType for Uuid {
        fn name(&self) -> &str {
            "test.uuid"
        }

        fn storage_type(&self) -> &DataType {
            &self.storage
        }

        fn serialize(&self) -> String {
            String::new()
        }

        fn deserialize(&self, storage: DataType, _serialized: &str) -> Result<ExtensionRef> {
            if storage != DataType::FixedSizeBinary(16) {
                return Err(Error::invalid_arg("storage", "uuid requires fixed_size_binary[16]"));
            }
            Ok(uuid())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_register_resolve() {
        register_extension_type(uuid()).unwrap();
        assert!(register_extension_type(uuid()).is_err());

        let ext = resolve_extension_type("test.uuid", DataType::FixedSizeBinary(16), "").unwrap();
        assert_eq!(ext.name(), "test.uuid");
        assert!(ext.as_any().downcast_ref::<Uuid>().is_some());
        assert!(resolve_extension_type("test.uuid", DataType::Int8, "").is_err());
        assert!(resolve_extension_type("test.other", DataType::Int8, "").is_err());

        let a = DataType::Extension(uuid());
        let b = DataType::Extension(ext);
        assert_eq!(a, b);
        assert_eq!(a.storage_type(), &DataType::FixedSizeBinary(16));
        assert_eq!(a.to_string(), "extension<test.uuid>");

        unregister_extension_type("test.uuid").unwrap();
        assert!(get_extension_type("test.uuid").is_none());
        assert!(unregister_extension_type("test.uuid").is_err());
    }
}

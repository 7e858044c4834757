//! Host base types
//!
//! The parent of every plugin loading context. Host types are always visible
//! and take precedence over archive types with the same name.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::types::{ResolvedType, TypeDescriptor, TypeOrigin};
use super::TypeResolver;
use crate::classfile::AccessFlags;
use crate::error::{PluginError, Result};

/// Root of the host type hierarchy
pub const ROOT_TYPE: &str = "java.lang.Object";

// Standard host types and their direct supertypes
static STANDARD_TYPES: Lazy<Vec<(&'static str, Option<&'static str>, AccessFlags)>> =
    Lazy::new(|| {
        let class = AccessFlags::PUBLIC | AccessFlags::SUPER;
        let abstract_class = class | AccessFlags::ABSTRACT;
        let final_class = class | AccessFlags::FINAL;
        let interface = AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;

        vec![
            (ROOT_TYPE, None, class),
            ("java.lang.String", Some(ROOT_TYPE), final_class),
            ("java.lang.Number", Some(ROOT_TYPE), abstract_class),
            ("java.lang.Integer", Some("java.lang.Number"), final_class),
            ("java.lang.Long", Some("java.lang.Number"), final_class),
            ("java.lang.Double", Some("java.lang.Number"), final_class),
            ("java.lang.Boolean", Some(ROOT_TYPE), final_class),
            ("java.lang.Enum", Some(ROOT_TYPE), abstract_class),
            ("java.lang.Record", Some(ROOT_TYPE), abstract_class),
            ("java.lang.Thread", Some(ROOT_TYPE), class),
            ("java.lang.Throwable", Some(ROOT_TYPE), class),
            ("java.lang.Exception", Some("java.lang.Throwable"), class),
            ("java.lang.RuntimeException", Some("java.lang.Exception"), class),
            ("java.lang.Error", Some("java.lang.Throwable"), class),
            ("java.lang.Runnable", Some(ROOT_TYPE), interface),
            ("java.lang.AutoCloseable", Some(ROOT_TYPE), interface),
            ("java.io.Closeable", Some(ROOT_TYPE), interface),
            ("java.io.Serializable", Some(ROOT_TYPE), interface),
            ("java.io.IOException", Some("java.lang.Exception"), class),
            ("java.util.AbstractCollection", Some(ROOT_TYPE), abstract_class),
            ("java.util.AbstractList", Some("java.util.AbstractCollection"), abstract_class),
            ("java.util.AbstractMap", Some(ROOT_TYPE), abstract_class),
        ]
    });

/// Set of base types provided by the host
pub struct HostTypes {
    types: HashMap<String, ResolvedType>,
    live: Arc<AtomicBool>,
}

impl HostTypes {
    /// Host with no base types at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Host with the standard runtime base types
    #[must_use]
    pub fn standard() -> Self {
        STANDARD_TYPES
            .iter()
            .fold(Self::empty(), |host, (name, extends, access)| {
                host.with_flags(name, *extends, *access)
            })
    }

    /// Add a public class to the host
    #[must_use]
    pub fn with_type(self, name: &str, extends: Option<&str>) -> Self {
        self.with_flags(name, extends, AccessFlags::PUBLIC | AccessFlags::SUPER)
    }

    fn with_flags(mut self, name: &str, extends: Option<&str>, access: AccessFlags) -> Self {
        let descriptor = TypeDescriptor {
            name: name.to_string(),
            super_name: extends.map(str::to_string),
            interfaces: Vec::new(),
            access,
            origin: TypeOrigin::Host,
        };
        self.types
            .insert(name.to_string(), ResolvedType::new(descriptor, self.live.clone()));
        self
    }

    /// Whether a type with this name is built in
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for HostTypes {
    fn default() -> Self {
        Self::standard()
    }
}

impl TypeResolver for HostTypes {
    fn resolve(&self, qualified_name: &str) -> Result<ResolvedType> {
        self.types
            .get(qualified_name)
            .cloned()
            .ok_or_else(|| PluginError::TypeNotFound(qualified_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_contains_root() {
        let host = HostTypes::standard();
        let root = host.resolve(ROOT_TYPE).unwrap();
        assert_eq!(root.super_name(), None);
        assert_eq!(root.origin(), &TypeOrigin::Host);
    }

    #[test]
    fn test_standard_hierarchy_is_closed() {
        let host = HostTypes::standard();
        for (_, extends, _) in STANDARD_TYPES.iter() {
            if let Some(parent) = extends {
                assert!(host.contains(parent), "missing host type {parent}");
            }
        }
    }

    #[test]
    fn test_host_handles_are_stable() {
        let host = HostTypes::standard();
        let a = host.resolve("java.lang.Thread").unwrap();
        let b = host.resolve("java.lang.Thread").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_host_knows_nothing() {
        let host = HostTypes::empty();
        assert!(host.is_empty());
        assert!(matches!(
            host.resolve(ROOT_TYPE),
            Err(PluginError::TypeNotFound(_))
        ));
    }

    #[test]
    fn test_custom_type() {
        let host = HostTypes::empty()
            .with_type(ROOT_TYPE, None)
            .with_type("com.example.Api", Some(ROOT_TYPE));
        let api = host.resolve("com.example.Api").unwrap();
        assert_eq!(api.super_name(), Some(ROOT_TYPE));
        assert!(!api.is_interface());
        assert_eq!(host.len(), 2);
    }

    #[test]
    fn test_interfaces_are_flagged() {
        let host = HostTypes::standard();
        assert!(host.resolve("java.lang.Runnable").unwrap().is_interface());
        assert!(host.resolve("java.lang.Number").unwrap().is_abstract());
    }
}

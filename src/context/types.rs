use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::classfile::AccessFlags;

/// Where a type definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Built into the host
    Host,
    /// Defined by an entry of a plugin archive
    Archive { location: PathBuf, entry: String },
}

/// Interned description of a type
#[derive(Debug)]
pub struct TypeDescriptor {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: AccessFlags,
    pub origin: TypeOrigin,
}

/// Handle to a resolved type
///
/// Handles compare and hash by identity: two handles are equal only if they
/// came from the same resolution in the same context. Resolving the same
/// name twice in one context yields equal handles.
#[derive(Clone)]
pub struct ResolvedType {
    descriptor: Arc<TypeDescriptor>,
    live: Arc<AtomicBool>,
}

impl ResolvedType {
    pub(crate) fn new(descriptor: TypeDescriptor, live: Arc<AtomicBool>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            live,
        }
    }

    /// Qualified name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Qualified name of the declared direct supertype
    #[must_use]
    pub fn super_name(&self) -> Option<&str> {
        self.descriptor.super_name.as_deref()
    }

    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn origin(&self) -> &TypeOrigin {
        &self.descriptor.origin
    }

    /// Archive that defined this type, `None` for host types
    #[must_use]
    pub fn archive(&self) -> Option<&Path> {
        match &self.descriptor.origin {
            TypeOrigin::Archive { location, .. } => Some(location),
            TypeOrigin::Host => None,
        }
    }

    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.descriptor.access.contains(AccessFlags::INTERFACE)
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.descriptor.access.contains(AccessFlags::ABSTRACT)
    }

    /// False once the defining context has been closed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl PartialEq for ResolvedType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.descriptor, &other.descriptor)
    }
}

impl Eq for ResolvedType {}

impl Hash for ResolvedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.descriptor), state);
    }
}

impl fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedType")
            .field("name", &self.descriptor.name)
            .field("super_name", &self.descriptor.super_name)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> TypeDescriptor {
        TypeDescriptor {
            name: name.to_string(),
            super_name: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            access: AccessFlags::PUBLIC,
            origin: TypeOrigin::Host,
        }
    }

    #[test]
    fn test_equality_is_identity() {
        let live = Arc::new(AtomicBool::new(true));
        let a = ResolvedType::new(descriptor("demo.A"), live.clone());
        let same = a.clone();
        let other = ResolvedType::new(descriptor("demo.A"), live);

        assert_eq!(a, same);
        assert_ne!(a, other);
    }

    #[test]
    fn test_validity_follows_flag() {
        let live = Arc::new(AtomicBool::new(true));
        let a = ResolvedType::new(descriptor("demo.A"), live.clone());
        assert!(a.is_valid());

        live.store(false, Ordering::Release);
        assert!(!a.is_valid());
    }
}

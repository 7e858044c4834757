//! Isolated loading context
//!
//! A [`LoadingContext`] resolves qualified type names against a fixed,
//! ordered set of plugin archives. Resolution is parent-first: the parent
//! resolver (normally [`HostTypes`]) is asked before any archive, so base
//! types stay shared across plugins. Archive types are read lazily on first
//! lookup and interned, so resolving a name twice yields the same handle.

pub mod host;
mod types;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::archive::{self, Archive};
use crate::classfile;
use crate::error::{PluginError, Result};
use crate::scanner::PluginSource;

pub use host::HostTypes;
pub use types::{ResolvedType, TypeDescriptor, TypeOrigin};

/// Anything that can turn a qualified name into a type handle
pub trait TypeResolver: Send + Sync {
    /// Resolve a type by qualified name
    ///
    /// # Errors
    /// Returns [`PluginError::TypeNotFound`] if no such type is visible.
    fn resolve(&self, qualified_name: &str) -> Result<ResolvedType>;
}

/// What to do when an archive cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveErrorPolicy {
    /// Fail the whole operation
    #[default]
    Abort,
    /// Log the failure and continue with the next archive
    Skip,
}

/// Lifecycle of a loading context
///
/// Construction either yields a `Ready` context or fails; `Closed` is only
/// reached through [`LoadingContext::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Accepting lookups
    Ready,
    /// Closed; lookups fail and issued handles are invalid
    Closed,
}

enum Slot {
    Unopened,
    Open(Archive),
    /// Failed to open under [`ArchiveErrorPolicy::Skip`]
    Unreadable,
}

struct Inner {
    state: ContextState,
    /// Symbol table of types defined by this context's archives
    defined: HashMap<String, ResolvedType>,
    /// Archive handles, opened on first lookup; indexed like `sources`
    archives: Vec<Slot>,
}

/// Resolution scope over a fixed set of plugin archives
pub struct LoadingContext {
    id: Uuid,
    sources: Vec<PluginSource>,
    parent: Arc<dyn TypeResolver>,
    archive_errors: ArchiveErrorPolicy,
    live: Arc<AtomicBool>,
    inner: Mutex<Inner>,
}

impl LoadingContext {
    /// Create a context over `sources`, delegating to `parent` first
    ///
    /// No archive is opened until the first lookup. Unreadable archives
    /// fail the lookup.
    #[must_use]
    pub fn new(sources: Vec<PluginSource>, parent: Arc<dyn TypeResolver>) -> Self {
        Self::with_policy(sources, parent, ArchiveErrorPolicy::Abort)
    }

    /// Create a context with an explicit policy for unreadable archives
    ///
    /// Under [`ArchiveErrorPolicy::Skip`] an archive that cannot be opened is
    /// logged once and left out of every later lookup.
    #[must_use]
    pub fn with_policy(
        sources: Vec<PluginSource>,
        parent: Arc<dyn TypeResolver>,
        archive_errors: ArchiveErrorPolicy,
    ) -> Self {
        let archives = sources.iter().map(|_| Slot::Unopened).collect();
        let id = Uuid::new_v4();
        debug!("Created loading context {} over {} archive(s)", id, sources.len());

        Self {
            id,
            sources,
            parent,
            archive_errors,
            live: Arc::new(AtomicBool::new(true)),
            inner: Mutex::new(Inner {
                state: ContextState::Ready,
                defined: HashMap::new(),
                archives,
            }),
        }
    }

    /// Unique identifier of this context
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Archives bound to this context, in construction order
    #[must_use]
    pub fn sources(&self) -> &[PluginSource] {
        &self.sources
    }

    /// Locations of the loaded archives, in construction order
    #[must_use]
    pub fn list_loaded_plugin_sources(&self) -> Vec<String> {
        self.sources.iter().map(ToString::to_string).collect()
    }

    /// Policy applied to archives that cannot be read
    #[must_use]
    pub fn archive_errors(&self) -> ArchiveErrorPolicy {
        self.archive_errors
    }

    #[must_use]
    pub fn state(&self) -> ContextState {
        self.lock().state
    }

    /// Number of archive types resolved so far
    #[must_use]
    pub fn defined_count(&self) -> usize {
        self.lock().defined.len()
    }

    /// Resolve the declared direct supertype of `ty`
    ///
    /// Returns `Ok(None)` for root types.
    ///
    /// # Errors
    /// Returns [`PluginError::IllegalState`] if `ty` was issued by a context
    /// that has since been closed, and propagates resolution errors for the
    /// supertype.
    pub fn direct_supertype(&self, ty: &ResolvedType) -> Result<Option<ResolvedType>> {
        if !ty.is_valid() {
            return Err(PluginError::IllegalState(format!(
                "Handle for '{}' belongs to a closed loading context",
                ty.name()
            )));
        }

        match ty.super_name() {
            Some(name) => self.resolve(name).map(Some),
            None => Ok(None),
        }
    }

    /// Close the context
    ///
    /// Drops the symbol table and archive handles and invalidates every
    /// handle this context issued. Closing twice is a no-op.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state == ContextState::Closed {
            return;
        }

        inner.state = ContextState::Closed;
        inner.defined.clear();
        inner.archives.clear();
        self.live.store(false, Ordering::Release);
        debug!("Closed loading context {}", self.id);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded state stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Search the archives in order; first definition wins
    fn define(&self, inner: &mut Inner, qualified_name: &str) -> Result<Option<ResolvedType>> {
        let path = archive::entry_path(qualified_name);

        for (source, slot) in self.sources.iter().zip(inner.archives.iter_mut()) {
            if let Slot::Unopened = slot {
                *slot = match Archive::open(source.location()) {
                    Ok(container) => Slot::Open(container),
                    Err(e) => {
                        self.tolerate(source, e)?;
                        Slot::Unreadable
                    }
                };
            }
            let Slot::Open(container) = slot else {
                continue;
            };

            let bytes = match container.read_entry(&path) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    self.tolerate(source, e)?;
                    continue;
                }
            };

            let descriptor = describe(source.location(), &path, qualified_name, &bytes)?;
            debug!("Resolved {} from {}", qualified_name, source);
            return Ok(Some(ResolvedType::new(descriptor, self.live.clone())));
        }

        Ok(None)
    }

    fn tolerate(&self, source: &PluginSource, err: PluginError) -> Result<()> {
        match self.archive_errors {
            ArchiveErrorPolicy::Abort => Err(err),
            ArchiveErrorPolicy::Skip => {
                warn!("Skipping plugin archive {}: {}", source, err);
                Ok(())
            }
        }
    }
}

impl TypeResolver for LoadingContext {
    fn resolve(&self, qualified_name: &str) -> Result<ResolvedType> {
        let mut inner = self.lock();
        if inner.state == ContextState::Closed {
            return Err(PluginError::IllegalState(format!(
                "Loading context {} is closed",
                self.id
            )));
        }

        if let Some(ty) = inner.defined.get(qualified_name) {
            trace!("Cache hit for {}", qualified_name);
            return Ok(ty.clone());
        }

        match self.parent.resolve(qualified_name) {
            Ok(ty) => return Ok(ty),
            Err(PluginError::TypeNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if qualified_name.is_empty() || qualified_name.contains('/') {
            return Err(PluginError::TypeNotFound(qualified_name.to_string()));
        }

        match self.define(&mut inner, qualified_name)? {
            Some(ty) => {
                inner.defined.insert(qualified_name.to_string(), ty.clone());
                Ok(ty)
            }
            None => Err(PluginError::TypeNotFound(qualified_name.to_string())),
        }
    }
}

/// Parse a type entry and check it declares the expected name
fn describe(location: &Path, entry: &str, expected: &str, bytes: &[u8]) -> Result<TypeDescriptor> {
    let header = classfile::parse(bytes).map_err(|e| {
        PluginError::IllegalState(format!(
            "Malformed type definition {} in '{}': {e}",
            entry,
            location.display()
        ))
    })?;

    if header.this_class != expected {
        return Err(PluginError::IllegalState(format!(
            "Entry {} in '{}' declares '{}' instead of '{}'",
            entry,
            location.display(),
            header.this_class,
            expected
        )));
    }

    Ok(TypeDescriptor {
        name: header.this_class,
        super_name: header.super_class,
        interfaces: header.interfaces,
        access: header.access,
        origin: TypeOrigin::Archive {
            location: location.to_path_buf(),
            entry: entry.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Arc<dyn TypeResolver> {
        Arc::new(HostTypes::standard())
    }

    #[test]
    fn test_empty_context_falls_back_to_host() {
        let context = LoadingContext::new(Vec::new(), host());
        let root = context.resolve(host::ROOT_TYPE).unwrap();
        assert_eq!(root.origin(), &TypeOrigin::Host);
        assert_eq!(context.defined_count(), 0);
    }

    #[test]
    fn test_unknown_type() {
        let context = LoadingContext::new(Vec::new(), host());
        assert!(matches!(
            context.resolve("demo.Missing"),
            Err(PluginError::TypeNotFound(name)) if name == "demo.Missing"
        ));
        assert!(matches!(context.resolve(""), Err(PluginError::TypeNotFound(_))));
    }

    #[test]
    fn test_missing_archive_surfaces_on_lookup() {
        let source = PluginSource::new("/definitely/not/here.jar").unwrap();
        let context = LoadingContext::new(vec![source], host());

        // Host types never touch the archives
        assert!(context.resolve(host::ROOT_TYPE).is_ok());
        assert!(matches!(
            context.resolve("demo.A"),
            Err(PluginError::ArchiveRead { .. })
        ));
    }

    #[test]
    fn test_skip_policy_tolerates_missing_archive() {
        let source = PluginSource::new("/definitely/not/here.jar").unwrap();
        let context = LoadingContext::with_policy(vec![source], host(), ArchiveErrorPolicy::Skip);

        assert_eq!(context.archive_errors(), ArchiveErrorPolicy::Skip);
        assert!(matches!(
            context.resolve("demo.A"),
            Err(PluginError::TypeNotFound(_))
        ));
        assert!(matches!(
            context.resolve("demo.B"),
            Err(PluginError::TypeNotFound(_))
        ));
    }

    #[test]
    fn test_close_is_terminal() {
        let context = LoadingContext::new(Vec::new(), host());
        assert_eq!(context.state(), ContextState::Ready);

        context.close();
        context.close();
        assert_eq!(context.state(), ContextState::Closed);
        assert!(matches!(
            context.resolve(host::ROOT_TYPE),
            Err(PluginError::IllegalState(_))
        ));
    }

    #[test]
    fn test_sources_keep_construction_order() {
        let sources = vec![
            PluginSource::new("/p/zeta.jar").unwrap(),
            PluginSource::new("/p/alpha.jar").unwrap(),
        ];
        let context = LoadingContext::new(sources, host());
        assert_eq!(
            context.list_loaded_plugin_sources(),
            vec!["/p/zeta.jar".to_string(), "/p/alpha.jar".to_string()]
        );
    }

    #[test]
    fn test_context_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LoadingContext>();
    }
}

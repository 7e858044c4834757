//! Plugin manager
//!
//! Ties the scanner, the loading context and the archive enumerator together:
//! load every archive in a directory, resolve types by name and find the
//! direct subtypes of a base type across all loaded archives.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use crate::context::ArchiveErrorPolicy;
use crate::context::{HostTypes, LoadingContext, ResolvedType, TypeResolver};
use crate::error::{PluginError, Result};
use crate::scanner::{PluginDirectory, PluginSource};

/// Options controlling how plugins are loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderOptions {
    #[serde(default)]
    pub archive_errors: ArchiveErrorPolicy,

    /// Open every archive while loading instead of on first use
    #[serde(default)]
    pub verify_archives: bool,
}

/// Loads the plugins of one directory and answers type queries about them
pub struct PluginManager {
    directory: PluginDirectory,
    context: LoadingContext,
    options: LoaderOptions,
}

impl PluginManager {
    /// Load every archive in `path` on top of the standard host types
    ///
    /// # Errors
    /// Returns [`PluginError::DirectoryNotFound`] if the path does not exist
    /// or is not a directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_options(path, LoaderOptions::default(), Arc::new(HostTypes::standard()))
    }

    /// Load every archive in `path` with explicit options and parent resolver
    ///
    /// # Errors
    /// Returns [`PluginError::DirectoryNotFound`] for an invalid path and,
    /// when `verify_archives` is set with the `Abort` policy,
    /// [`PluginError::ArchiveRead`] for the first unreadable archive.
    pub fn with_options<P: AsRef<Path>>(
        path: P,
        options: LoaderOptions,
        parent: Arc<dyn TypeResolver>,
    ) -> Result<Self> {
        let directory = PluginDirectory::open(path)?;
        let mut sources = directory.scan()?;

        if options.verify_archives {
            sources = verify(sources, options.archive_errors)?;
        }

        info!(
            "Loaded {} plugin archive(s) from {}",
            sources.len(),
            directory.path().display()
        );

        Ok(Self {
            directory,
            context: LoadingContext::with_policy(sources, parent, options.archive_errors),
            options,
        })
    }

    /// Plugin directory, canonicalized
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.path()
    }

    #[must_use]
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Loading context backing this manager
    #[must_use]
    pub fn context(&self) -> &LoadingContext {
        &self.context
    }

    /// Locations of the loaded archives, in load order
    #[must_use]
    pub fn list_loaded_plugin_sources(&self) -> Vec<String> {
        self.context.list_loaded_plugin_sources()
    }

    /// Resolve a type by qualified name
    ///
    /// # Errors
    /// Returns [`PluginError::TypeNotFound`] if neither the host nor any
    /// archive defines the type.
    pub fn resolve(&self, qualified_name: &str) -> Result<ResolvedType> {
        self.context.resolve(qualified_name)
    }

    /// Find every archive type whose direct supertype is `base`
    ///
    /// Archives are re-enumerated on every call; results follow archive order,
    /// then entry order. Types extending `base` through an intermediate type
    /// are not included.
    ///
    /// # Errors
    /// - [`PluginError::IllegalState`] if any enumerated type, or its
    ///   supertype, fails to resolve
    /// - [`PluginError::ArchiveRead`] if an archive cannot be read and the
    ///   policy is `Abort`
    pub fn find_direct_subtypes_of(&self, base: &ResolvedType) -> Result<Vec<ResolvedType>> {
        let mut subtypes = Vec::new();

        for source in self.context.sources() {
            let entries = match source.entries() {
                Ok(entries) => entries,
                Err(e) => {
                    self.tolerate(source, e)?;
                    continue;
                }
            };

            for name in entries {
                let name = match name {
                    Ok(name) => name,
                    Err(e) => {
                        self.tolerate(source, e)?;
                        break;
                    }
                };

                let ty = self.context.resolve(&name).map_err(|e| inconsistent(&name, source, &e))?;
                let supertype = self
                    .context
                    .direct_supertype(&ty)
                    .map_err(|e| inconsistent(&name, source, &e))?;

                if supertype.as_ref() == Some(base) {
                    debug!("{} directly extends {}", name, base);
                    subtypes.push(ty);
                }
            }
        }

        Ok(subtypes)
    }

    /// Close the loading context, invalidating every resolved handle
    pub fn close(&self) {
        self.context.close();
    }

    fn tolerate(&self, source: &PluginSource, err: PluginError) -> Result<()> {
        match self.options.archive_errors {
            ArchiveErrorPolicy::Abort => Err(err),
            ArchiveErrorPolicy::Skip => {
                warn!("Skipping plugin archive {}: {}", source, err);
                Ok(())
            }
        }
    }
}

impl TypeResolver for PluginManager {
    fn resolve(&self, qualified_name: &str) -> Result<ResolvedType> {
        self.context.resolve(qualified_name)
    }
}

fn inconsistent(name: &str, source: &PluginSource, err: &PluginError) -> PluginError {
    PluginError::IllegalState(format!("Failed to resolve '{name}' listed in {source}: {err}"))
}

/// Open every archive once, dropping or rejecting unreadable ones
fn verify(sources: Vec<PluginSource>, policy: ArchiveErrorPolicy) -> Result<Vec<PluginSource>> {
    let mut verified = Vec::with_capacity(sources.len());
    for source in sources {
        match source.entries() {
            Ok(_) => verified.push(source),
            Err(e) if policy == ArchiveErrorPolicy::Skip => {
                warn!("Dropping unreadable plugin archive {}: {}", source, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(verified)
}

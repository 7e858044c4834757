//! plugjar - plugin discovery and type loading for jar archives
//!
//! Scans a plugin directory for `.jar` archives, builds one isolated loading
//! context over them and answers two questions: which type does a qualified
//! name refer to, and which archive types directly extend a given base type.
//! Type information is read from the archives' compiled type headers, no
//! runtime is involved.
//!
//! # Modules
//!
//! - [`scanner`]: Plugin directory validation and archive discovery
//! - [`archive`]: Archive entry enumeration and entry reads
//! - [`classfile`]: Compiled type header parser
//! - [`context`]: Isolated loading context and host base types
//! - [`manager`]: Type resolution and direct-subtype queries
//! - [`config`]: Configuration management and serialization
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use plugjar::PluginManager;
//!
//! # fn main() -> Result<(), plugjar::PluginError> {
//! let manager = PluginManager::new("./plugins")?;
//! let base = manager.resolve("com.example.Plugin")?;
//! for ty in manager.find_direct_subtypes_of(&base)? {
//!     println!("{ty}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod classfile;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod scanner;

pub use context::{HostTypes, LoadingContext, ResolvedType, TypeOrigin, TypeResolver};
pub use error::{PluginError, Result};
pub use manager::{ArchiveErrorPolicy, LoaderOptions, PluginManager};
pub use scanner::{PluginDirectory, PluginSource};

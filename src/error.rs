//! Error types for plugin discovery and type resolution

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scanning a plugin directory or resolving types
#[derive(Error, Debug)]
pub enum PluginError {
    /// Plugin directory does not exist or is not a directory
    #[error("Path '{}' does not exist or is no directory", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Opening or reading an archive failed
    #[error("Failed to read archive '{}': {source}", .location.display())]
    ArchiveRead {
        /// Archive that could not be read
        location: PathBuf,
        /// Underlying container or I/O error
        #[source]
        source: zip::result::ZipError,
    },

    /// No type with the qualified name is visible in the context
    #[error("Type not found: {0}")]
    TypeNotFound(String),

    /// Internal inconsistency, usually a corrupted plugin bundle
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

impl PluginError {
    /// Wrap a container error for the given archive
    pub fn archive_read(location: impl Into<PathBuf>, source: impl Into<zip::result::ZipError>) -> Self {
        Self::ArchiveRead {
            location: location.into(),
            source: source.into(),
        }
    }

    /// Whether the caller may reasonably continue after this error
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TypeNotFound(_))
    }
}

/// Result type used throughout the library
pub type Result<T, E = PluginError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_not_found_message() {
        let err = PluginError::DirectoryNotFound(PathBuf::from("/no/such/dir"));
        assert_eq!(
            err.to_string(),
            "Path '/no/such/dir' does not exist or is no directory"
        );
    }

    #[test]
    fn test_archive_read_keeps_location_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err = PluginError::archive_read("/plugins/broken.jar", io);

        match &err {
            PluginError::ArchiveRead { location, .. } => {
                assert_eq!(location, &PathBuf::from("/plugins/broken.jar"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("broken.jar"));
    }

    #[test]
    fn test_only_type_not_found_is_recoverable() {
        assert!(PluginError::TypeNotFound("a.B".into()).is_recoverable());
        assert!(!PluginError::IllegalState("bad".into()).is_recoverable());
    }
}

//! Plugin directory scanning
//!
//! Lists a plugin directory (non-recursively) and produces the archives to
//! load. Order follows the filesystem listing, which is not stable across
//! platforms.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive::ArchiveEntries;
use crate::error::{PluginError, Result};

/// File name suffix of plugin archives (case-sensitive)
pub const ARCHIVE_SUFFIX: &str = ".jar";

/// A single plugin archive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginSource {
    location: PathBuf,
}

impl PluginSource {
    /// Create a source for an archive location
    ///
    /// # Errors
    /// Returns [`PluginError::IllegalState`] if the location does not end in
    /// the archive suffix.
    pub fn new<P: Into<PathBuf>>(location: P) -> Result<Self> {
        let location = location.into();
        if !has_archive_suffix(&location) {
            return Err(PluginError::IllegalState(format!(
                "'{}' is not a {ARCHIVE_SUFFIX} archive",
                location.display()
            )));
        }
        Ok(Self { location })
    }

    /// Archive location
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Enumerate the qualified type names in this archive
    ///
    /// Each call opens the archive again and returns a fresh sequence.
    ///
    /// # Errors
    /// Returns [`PluginError::ArchiveRead`] if the archive cannot be opened.
    pub fn entries(&self) -> Result<ArchiveEntries> {
        ArchiveEntries::open(&self.location)
    }
}

impl std::fmt::Display for PluginSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.location.display())
    }
}

fn has_archive_suffix(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(ARCHIVE_SUFFIX))
}

/// A validated plugin directory
#[derive(Debug, Clone)]
pub struct PluginDirectory {
    path: PathBuf,
}

impl PluginDirectory {
    /// Validate a plugin directory
    ///
    /// The path is canonicalized so that every scanned location is absolute.
    ///
    /// # Errors
    /// Returns [`PluginError::DirectoryNotFound`] if the path does not exist
    /// or is not a directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(PluginError::DirectoryNotFound(path.to_path_buf()));
        }

        let path = fs::canonicalize(path)
            .map_err(|_| PluginError::DirectoryNotFound(path.to_path_buf()))?;
        Ok(Self { path })
    }

    /// Canonical directory path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List the archives in the directory
    ///
    /// # Errors
    /// Returns [`PluginError::IllegalState`] if the directory listing fails.
    pub fn scan(&self) -> Result<Vec<PluginSource>> {
        let listing = fs::read_dir(&self.path).map_err(|e| {
            PluginError::IllegalState(format!(
                "Failed to list plugin directory '{}': {e}",
                self.path.display()
            ))
        })?;

        let mut sources = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|e| {
                PluginError::IllegalState(format!(
                    "Failed to list plugin directory '{}': {e}",
                    self.path.display()
                ))
            })?;

            let location = entry.path();
            if has_archive_suffix(&location) {
                debug!("Found plugin archive {}", location.display());
                sources.push(PluginSource { location });
            }
        }

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        match PluginDirectory::open(&missing) {
            Err(PluginError::DirectoryNotFound(path)) => assert_eq!(path, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plugins.jar");
        fs::write(&file, b"not a dir").unwrap();

        assert!(matches!(
            PluginDirectory::open(&file),
            Err(PluginError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_scan_filters_by_suffix() {
        let dir = tempdir().unwrap();
        for name in ["a.jar", "b.jar", "notes.txt", "c.JAR", "d.jar.bak"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("e.jar"), b"").unwrap();

        let plugins = PluginDirectory::open(dir.path()).unwrap();
        let mut names: Vec<String> = plugins
            .scan()
            .unwrap()
            .iter()
            .map(|s| s.location().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.jar", "b.jar"]);
    }

    #[test]
    fn test_scanned_locations_are_absolute() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jar"), b"").unwrap();

        let sources = PluginDirectory::open(dir.path()).unwrap().scan().unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].location().is_absolute());
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let sources = PluginDirectory::open(dir.path()).unwrap().scan().unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn test_source_requires_suffix() {
        assert!(PluginSource::new("/plugins/a.jar").is_ok());
        assert!(matches!(
            PluginSource::new("/plugins/a.zip"),
            Err(PluginError::IllegalState(_))
        ));
    }
}

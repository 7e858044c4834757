//! Archive access
//!
//! [`ArchiveEntries`] walks an archive in entry order and yields the
//! qualified name of every compiled type it contains. [`Archive`] gives
//! random access to entry contents for the loading context.

use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use tracing::trace;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{PluginError, Result};

/// Suffix of entries holding a compiled type definition
pub const TYPE_SUFFIX: &str = ".class";

type Container = ZipArchive<BufReader<File>>;

/// Translate an entry path to a qualified type name
///
/// Returns `None` for entries that are not compiled types, including an
/// entry whose name is the bare suffix.
#[must_use]
pub fn qualified_name(entry_path: &str) -> Option<String> {
    let stem = entry_path.strip_suffix(TYPE_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('/', "."))
}

/// Translate a qualified type name to the entry path that defines it
#[must_use]
pub fn entry_path(qualified_name: &str) -> String {
    format!("{}{TYPE_SUFFIX}", qualified_name.replace('.', "/"))
}

fn open_container(location: &Path) -> Result<Container> {
    let file = File::open(location).map_err(|e| PluginError::archive_read(location, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| PluginError::archive_read(location, e))
}

/// Lazy, single-pass sequence of the qualified type names in one archive
///
/// Yields names in archive entry order and skips entries that are not
/// compiled types. The first read failure is yielded as
/// [`PluginError::ArchiveRead`] and ends the sequence.
pub struct ArchiveEntries {
    location: PathBuf,
    container: Container,
    cursor: usize,
    done: bool,
}

impl ArchiveEntries {
    /// Open an archive for enumeration
    ///
    /// # Errors
    /// Returns [`PluginError::ArchiveRead`] if the archive cannot be opened or
    /// its directory cannot be read.
    pub fn open<P: AsRef<Path>>(location: P) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        let container = open_container(&location)?;
        Ok(Self {
            location,
            container,
            cursor: 0,
            done: false,
        })
    }

    /// Archive being enumerated
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Total number of entries in the archive, type definitions or not
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.container.len()
    }
}

impl Iterator for ArchiveEntries {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while self.cursor < self.container.len() {
            let index = self.cursor;
            self.cursor += 1;

            let path = match self.container.by_index_raw(index) {
                Ok(entry) => entry.name().to_owned(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(PluginError::archive_read(&self.location, e)));
                }
            };

            match qualified_name(&path) {
                Some(name) => return Some(Ok(name)),
                None => trace!("Skipping non-type entry {} in {}", path, self.location.display()),
            }
        }

        self.done = true;
        None
    }
}

impl FusedIterator for ArchiveEntries {}

/// Random-access handle on an archive
pub struct Archive {
    location: PathBuf,
    container: Container,
}

impl Archive {
    /// Open an archive for entry lookups
    ///
    /// # Errors
    /// Returns [`PluginError::ArchiveRead`] if the archive cannot be opened.
    pub fn open<P: AsRef<Path>>(location: P) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        let container = open_container(&location)?;
        Ok(Self {
            location,
            container,
        })
    }

    /// Archive location
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Read an entry's contents, `None` if the archive has no such entry
    ///
    /// # Errors
    /// Returns [`PluginError::ArchiveRead`] if the entry exists but cannot be read.
    pub fn read_entry(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.container.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(PluginError::archive_read(&self.location, e)),
        };

        let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut data)
            .map_err(|e| PluginError::archive_read(&self.location, e))?;
        Ok(Some(data))
    }
}

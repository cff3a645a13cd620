use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::fs::FileSystem;
use super::watch::WatchTable;
use crate::error::LockResultExt;

/// An in-memory file system. Directories exist implicitly above files.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    watches: WatchTable,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<P, S>(files: impl IntoIterator<Item = (P, S)>) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let fs = Self::new();
        for (path, text) in files {
            fs.write(path, text);
        }
        fs
    }

    /// Create or overwrite a file. Returns whether it already existed.
    pub fn write(&self, path: impl Into<PathBuf>, text: impl Into<String>) -> bool {
        self.files
            .lock()
            .recover_poison("MemoryFileSystem::write")
            .insert(path.into(), text.into())
            .is_some()
    }

    /// Delete a file. Returns whether it existed.
    pub fn remove(&self, path: &Path) -> bool {
        self.files
            .lock()
            .recover_poison("MemoryFileSystem::remove")
            .remove(path)
            .is_some()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let files = self
            .files
            .lock()
            .recover_poison("MemoryFileSystem::read_to_string");
        files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files
            .lock()
            .recover_poison("MemoryFileSystem::is_file")
            .contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .lock()
            .recover_poison("MemoryFileSystem::is_dir")
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let files = self
            .files
            .lock()
            .recover_poison("MemoryFileSystem::read_dir");
        let entries: BTreeSet<PathBuf> = files
            .keys()
            .filter_map(|file| {
                let rest = file.strip_prefix(path).ok()?;
                let first = rest.components().next()?;
                Some(path.join(first))
            })
            .collect();
        if entries.is_empty() {
            return Err(not_found(path));
        }
        Ok(entries.into_iter().collect())
    }

    fn watches(&self) -> &WatchTable {
        &self.watches
    }
}

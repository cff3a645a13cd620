use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::watch::{WatchId, WatchTable, WatchTarget};

/// File access and watch registration used by the registry.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Immediate entries of `path`, sorted.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn watches(&self) -> &WatchTable;

    fn watch_file(&self, path: &Path) -> WatchId {
        self.watches().add(WatchTarget::File(path.to_path_buf()))
    }

    fn watch_directory(&self, path: &Path, recursive: bool) -> WatchId {
        self.watches().add(WatchTarget::Directory {
            path: path.to_path_buf(),
            recursive,
        })
    }

    fn release_watch(&self, id: WatchId) {
        self.watches().release(id);
    }
}

/// The real file system.
#[derive(Debug, Default)]
pub struct OsFileSystem {
    watches: WatchTable,
}

impl OsFileSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn watches(&self) -> &WatchTable {
        &self.watches
    }
}

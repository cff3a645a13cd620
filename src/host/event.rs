use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    Created,
    Changed,
    Deleted,
}

/// A change reported by whatever watches the file system for the embedder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Created)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Changed)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Deleted)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

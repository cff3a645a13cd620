use std::path::Path;

use crate::analysis::SourceProvider;
use crate::document::DocumentStore;
use crate::host::FileSystem;

/// Reads tracked documents from the store and everything else from disk.
pub(super) struct StoreSources<'a> {
    pub(super) documents: &'a DocumentStore,
    pub(super) fs: &'a dyn FileSystem,
}

impl SourceProvider for StoreSources<'_> {
    fn source(&self, path: &Path) -> Option<String> {
        match self.documents.snapshot(path) {
            Some(snapshot) => Some(snapshot.text()),
            None => self.fs.read_to_string(path).ok(),
        }
    }
}

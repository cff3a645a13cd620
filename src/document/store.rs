use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use super::change::ChangeRange;
use super::model::Document;
use super::version_cache::Snapshot;

/// All tracked documents, keyed by normalized path.
///
/// Readers on other threads can take snapshots while the registry mutates
/// other entries.
#[derive(Default)]
pub struct DocumentStore {
    documents: DashMap<PathBuf, Document>,
}

pub struct DocumentHandle<'a> {
    inner: Ref<'a, PathBuf, Document>,
}

impl Deref for DocumentHandle<'_> {
    type Target = Document;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document) -> Option<Document> {
        self.documents
            .insert(document.path().to_path_buf(), document)
    }

    pub fn remove(&self, path: &Path) -> Option<Document> {
        self.documents.remove(path).map(|(_, document)| document)
    }

    pub fn get(&self, path: &Path) -> Option<DocumentHandle<'_>> {
        self.documents
            .get(path)
            .map(|inner| DocumentHandle { inner })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    /// Run `f` with exclusive access to one document. The entry lock is
    /// released before returning.
    pub fn with_mut<R>(&self, path: &Path, f: impl FnOnce(&mut Document) -> R) -> Option<R> {
        self.documents.get_mut(path).map(|mut entry| f(&mut entry))
    }

    pub fn snapshot(&self, path: &Path) -> Option<Snapshot> {
        self.with_mut(path, Document::snapshot)
    }

    pub fn changes_between(&self, path: &Path, old: u64, new: u64) -> Option<ChangeRange> {
        self.get(path).map(|doc| doc.changes_between(old, new))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Paths of every tracked document, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .documents
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        paths
    }

    pub fn open_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .documents
            .iter()
            .filter(|entry| entry.value().is_open())
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_get_remove() {
        let store = DocumentStore::new();
        let path = PathBuf::from("/w/a.txt");
        assert!(store.insert(Document::new(path.clone(), "abc")).is_none());
        assert_eq!(store.get(&path).map(|doc| doc.len()), Some(3));
        assert!(store.remove(&path).is_some());
        assert!(!store.contains(&path));
    }

    #[test]
    fn test_with_mut_edits_in_place() {
        let store = DocumentStore::new();
        let path = PathBuf::from("/w/a.txt");
        store.insert(Document::new(path.clone(), "abc"));
        store
            .with_mut(&path, |doc| doc.edit(0, 0, ">"))
            .unwrap()
            .unwrap();
        assert_eq!(store.snapshot(&path).unwrap().text(), ">abc");
        assert_eq!(store.with_mut(Path::new("/missing"), |_| ()), None);
    }

    #[test]
    fn test_snapshots_are_readable_from_other_threads() {
        let store = Arc::new(DocumentStore::new());
        let path = PathBuf::from("/w/shared.txt");
        store.insert(Document::new(path.clone(), "one\ntwo\n"));
        let snapshot = store.snapshot(&path).unwrap();

        let reader = std::thread::spawn(move || snapshot.index().line_text(1).map(str::to_owned));
        store.with_mut(&path, |doc| doc.edit(0, 3, "ONE")).unwrap().unwrap();

        assert_eq!(reader.join().unwrap().as_deref(), Some("two\n"));
        assert_eq!(store.snapshot(&path).unwrap().text(), "ONE\ntwo\n");
    }

    #[test]
    fn test_open_paths_are_sorted() {
        let store = DocumentStore::new();
        for name in ["/w/c", "/w/a", "/w/b"] {
            let mut doc = Document::new(PathBuf::from(name), "");
            doc.set_open(name != "/w/b");
            store.insert(doc);
        }
        assert_eq!(
            store.open_paths(),
            [PathBuf::from("/w/a"), PathBuf::from("/w/c")]
        );
        assert_eq!(store.paths().len(), 3);
    }
}

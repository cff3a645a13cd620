use dashmap::DashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const LOG_TARGET: &str = "project_service::fs";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(u64);

impl WatchId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchTarget {
    File(PathBuf),
    Directory { path: PathBuf, recursive: bool },
}

impl WatchTarget {
    pub fn path(&self) -> &Path {
        match self {
            WatchTarget::File(path) | WatchTarget::Directory { path, .. } => path,
        }
    }

    /// Whether a change at `changed` falls under this watch.
    pub fn covers(&self, changed: &Path) -> bool {
        match self {
            WatchTarget::File(path) => path == changed,
            WatchTarget::Directory {
                path,
                recursive: true,
            } => changed.starts_with(path) && changed != path,
            WatchTarget::Directory {
                path,
                recursive: false,
            } => changed.parent() == Some(path.as_path()),
        }
    }
}

/// Live watches handed out by a [`super::FileSystem`].
///
/// The table is bookkeeping only: it records what the service wants to hear
/// about so an embedder can wire up real notifications.
#[derive(Debug, Default)]
pub struct WatchTable {
    next_id: AtomicU64,
    watches: DashMap<WatchId, WatchTarget>,
}

impl WatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, target: WatchTarget) -> WatchId {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        log::trace!(target: LOG_TARGET, "{} on {}", id, target.path().display());
        self.watches.insert(id, target);
        id
    }

    pub fn release(&self, id: WatchId) -> Option<WatchTarget> {
        let released = self.watches.remove(&id).map(|(_, target)| target);
        if released.is_none() {
            log::warn!(target: LOG_TARGET, "Released unknown {}", id);
        }
        released
    }

    pub fn get(&self, id: WatchId) -> Option<WatchTarget> {
        self.watches.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// All live watches, ordered by id.
    pub fn targets(&self) -> Vec<(WatchId, WatchTarget)> {
        let mut targets: Vec<_> = self
            .watches
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        targets.sort_by_key(|(id, _)| *id);
        targets
    }

    /// Ids of every watch covering `changed`.
    pub fn matching(&self, changed: &Path) -> Vec<WatchId> {
        let mut ids: Vec<_> = self
            .watches
            .iter()
            .filter(|entry| entry.value().covers(changed))
            .map(|entry| *entry.key())
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::file_exact(WatchTarget::File("/w/a".into()), "/w/a", true)]
    #[case::file_other(WatchTarget::File("/w/a".into()), "/w/b", false)]
    #[case::dir_direct_child(WatchTarget::Directory { path: "/w".into(), recursive: false }, "/w/a", true)]
    #[case::dir_nested_child(WatchTarget::Directory { path: "/w".into(), recursive: false }, "/w/x/a", false)]
    #[case::recursive_nested(WatchTarget::Directory { path: "/w".into(), recursive: true }, "/w/x/a", true)]
    #[case::recursive_self(WatchTarget::Directory { path: "/w".into(), recursive: true }, "/w", false)]
    #[case::sibling_prefix(WatchTarget::Directory { path: "/w".into(), recursive: true }, "/wx/a", false)]
    fn test_covers(#[case] target: WatchTarget, #[case] changed: &str, #[case] expected: bool) {
        assert_eq!(target.covers(Path::new(changed)), expected);
    }

    #[test]
    fn test_add_and_release() {
        let table = WatchTable::new();
        let a = table.add(WatchTarget::File("/w/a".into()));
        let b = table.add(WatchTarget::File("/w/b".into()));
        assert_ne!(a, b);
        assert_eq!(table.matching(Path::new("/w/a")), [a]);
        assert!(table.release(a).is_some());
        assert!(table.release(a).is_none());
        assert_eq!(table.targets().len(), 1);
    }
}

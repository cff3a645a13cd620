use std::path::{Path, PathBuf};

use super::change::ChangeRange;
use super::version_cache::{Snapshot, VersionCache};
use crate::config::VersionCacheConfig;
use crate::error::ServiceResult;
use crate::host::WatchId;
use crate::project::ProjectId;
use crate::text::fnv1a_hash;

/// A tracked file: its text history plus editor and project state.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    cache: VersionCache,
    is_open: bool,
    /// Hash of the last loaded content; `None` once edits have diverged.
    fingerprint: Option<u64>,
    watch: Option<WatchId>,
    default_project: Option<ProjectId>,
}

impl Document {
    pub fn new(path: PathBuf, text: &str) -> Self {
        Self::with_cache(path, text, VersionCache::new(text))
    }

    pub fn with_config(
        path: PathBuf,
        text: &str,
        config: VersionCacheConfig,
        node_capacity: usize,
    ) -> Self {
        Self::with_cache(
            path,
            text,
            VersionCache::with_config(text, config, node_capacity),
        )
    }

    fn with_cache(path: PathBuf, text: &str, cache: VersionCache) -> Self {
        Self {
            path,
            cache,
            is_open: false,
            fingerprint: Some(fnv1a_hash(text)),
            watch: None,
            default_project: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub(crate) fn set_open(&mut self, open: bool) {
        self.is_open = open;
    }

    pub fn default_project(&self) -> Option<ProjectId> {
        self.default_project
    }

    pub(crate) fn set_default_project(&mut self, project: Option<ProjectId>) {
        self.default_project = project;
    }

    pub fn watch(&self) -> Option<WatchId> {
        self.watch
    }

    pub(crate) fn set_watch(&mut self, watch: Option<WatchId>) -> Option<WatchId> {
        std::mem::replace(&mut self.watch, watch)
    }

    pub fn version(&self) -> u64 {
        self.cache.current_version()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    pub fn snapshot(&mut self) -> Snapshot {
        self.cache.get_snapshot()
    }

    pub fn text(&mut self) -> String {
        self.snapshot().text()
    }

    pub fn edit(&mut self, start: usize, delete_len: usize, inserted: &str) -> ServiceResult<()> {
        self.cache.edit(start, delete_len, inserted)?;
        self.fingerprint = None;
        Ok(())
    }

    /// Replace the content unconditionally.
    pub fn reload(&mut self, text: &str) {
        self.cache.reload(text);
        self.fingerprint = Some(fnv1a_hash(text));
    }

    /// Replace the content unless it already equals `text`. Returns whether
    /// a reload happened.
    pub fn reload_if_changed(&mut self, text: &str) -> bool {
        let incoming = fnv1a_hash(text);
        let current = match self.fingerprint {
            Some(hash) => hash,
            None => {
                let hash = fnv1a_hash(&self.text());
                self.fingerprint = Some(hash);
                hash
            }
        };
        if current == incoming {
            return false;
        }
        self.reload(text);
        true
    }

    pub fn changes_between(&self, old: u64, new: u64) -> ChangeRange {
        self.cache.get_text_changes_between_versions(old, new)
    }
}

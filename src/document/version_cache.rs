//! Per-document version history.
//!
//! Edits are buffered and folded into a new [`Snapshot`] lazily: when a
//! snapshot is requested, when too many edits are pending, or when a single
//! edit is large. Only the newest `max_versions` snapshots are retained.

use std::collections::VecDeque;
use std::sync::Arc;

use super::change::{ChangeRange, TextChange};
use crate::config::VersionCacheConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::text::{DEFAULT_NODE_CAPACITY, LineIndex, char_len};

/// An immutable view of a document at one version.
#[derive(Clone, Debug)]
pub struct Snapshot {
    version: u64,
    index: LineIndex,
    changes: Arc<[TextChange]>,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    /// Changes applied on top of the previous version.
    pub fn changes(&self) -> &[TextChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn text(&self) -> String {
        self.index.text()
    }

    pub fn get_text(&self, start: usize, length: usize) -> String {
        self.index.get_text(start, length)
    }
}

#[derive(Debug)]
pub struct VersionCache {
    /// Oldest first; never empty.
    versions: VecDeque<Snapshot>,
    pending: Vec<TextChange>,
    /// Length of the text once `pending` is applied.
    pending_len: usize,
    config: VersionCacheConfig,
    node_capacity: usize,
}

impl VersionCache {
    pub fn new(text: &str) -> Self {
        Self::with_config(text, VersionCacheConfig::default(), DEFAULT_NODE_CAPACITY)
    }

    pub fn with_config(text: &str, config: VersionCacheConfig, node_capacity: usize) -> Self {
        let mut cache = Self {
            versions: VecDeque::new(),
            pending: Vec::new(),
            pending_len: 0,
            config: VersionCacheConfig {
                max_versions: config.max_versions.max(1),
                ..config
            },
            node_capacity,
        };
        cache.reset(0, text);
        cache
    }

    pub fn current_version(&self) -> u64 {
        self.latest().version
    }

    /// Oldest version still answerable by change queries.
    pub fn min_version(&self) -> u64 {
        self.versions.front().map_or(0, |snapshot| snapshot.version)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Length of the document including pending edits.
    pub fn len(&self) -> usize {
        self.pending_len
    }

    pub fn is_empty(&self) -> bool {
        self.pending_len == 0
    }

    /// Queue an edit. Small edits are buffered; a large one, or one that
    /// overflows the buffer, folds everything into a new snapshot.
    pub fn edit(&mut self, start: usize, delete_len: usize, inserted: &str) -> ServiceResult<()> {
        if start > self.pending_len || delete_len > self.pending_len - start {
            return Err(ServiceError::edit_out_of_range(
                start,
                delete_len,
                self.pending_len,
            ));
        }

        let change = TextChange::new(start, delete_len, inserted);
        let inserted_len = change.inserted_len();
        self.pending_len = self.pending_len - delete_len + inserted_len;
        self.pending.push(change);

        if self.pending.len() > self.config.change_count_threshold
            || delete_len > self.config.change_length_threshold
            || inserted_len > self.config.change_length_threshold
        {
            self.get_snapshot();
        }
        Ok(())
    }

    /// Fold pending edits into a new version and return the latest snapshot.
    pub fn get_snapshot(&mut self) -> Snapshot {
        if !self.pending.is_empty() {
            let latest = self.latest();
            let index = self
                .pending
                .iter()
                .fold(latest.index.clone(), |index, change| {
                    index.edit(change.start, change.delete_len, &change.inserted)
                });
            let snapshot = Snapshot {
                version: latest.version + 1,
                index,
                changes: std::mem::take(&mut self.pending).into(),
            };
            self.versions.push_back(snapshot);
            while self.versions.len() > self.config.max_versions {
                self.versions.pop_front();
            }
        }
        self.latest().clone()
    }

    /// Replace the content wholesale. History is discarded, so the new
    /// version is also the oldest answerable one.
    pub fn reload(&mut self, text: &str) {
        let version = self.current_version() + 1;
        self.reset(version, text);
    }

    pub fn get_text_changes_between_versions(&self, old: u64, new: u64) -> ChangeRange {
        if old == new && old <= self.current_version() {
            return ChangeRange::Unchanged;
        }
        if old > new || old < self.min_version() || new > self.current_version() {
            return ChangeRange::Unavailable;
        }
        let changes = self
            .versions
            .iter()
            .filter(|snapshot| snapshot.version > old && snapshot.version <= new)
            .flat_map(|snapshot| snapshot.changes.iter().cloned())
            .collect();
        ChangeRange::Changes(changes)
    }

    fn latest(&self) -> &Snapshot {
        // `versions` is refilled by every reset and never drained below one.
        &self.versions[self.versions.len() - 1]
    }

    fn reset(&mut self, version: u64, text: &str) {
        self.pending.clear();
        self.pending_len = char_len(text);
        self.versions.clear();
        self.versions.push_back(Snapshot {
            version,
            index: LineIndex::with_capacity(text, self.node_capacity),
            changes: Arc::from(Vec::new()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::change::apply_changes;

    fn cache(text: &str) -> VersionCache {
        VersionCache::new(text)
    }

    #[test]
    fn test_edits_are_buffered_until_snapshot() {
        let mut cache = cache("hello");
        cache.edit(5, 0, " world").unwrap();
        assert!(cache.has_pending());
        assert_eq!(cache.current_version(), 0);
        assert_eq!(cache.len(), 11);

        let snapshot = cache.get_snapshot();
        assert_eq!(snapshot.version(), 1);
        assert_eq!(snapshot.text(), "hello world");
        assert!(!cache.has_pending());
    }

    #[test]
    fn test_get_snapshot_without_pending_is_idempotent() {
        let mut cache = cache("abc");
        let first = cache.get_snapshot();
        let second = cache.get_snapshot();
        assert_eq!(first.version(), second.version());
        assert_eq!(cache.current_version(), 0);
    }

    #[test]
    fn test_buffer_overflow_materializes() {
        let mut cache = cache("");
        for i in 0..8 {
            cache.edit(i, 0, "x").unwrap();
        }
        assert_eq!(cache.current_version(), 0);
        cache.edit(8, 0, "y").unwrap();
        assert_eq!(cache.current_version(), 1);
        assert!(!cache.has_pending());
        assert_eq!(cache.get_snapshot().text(), "xxxxxxxxy");
    }

    #[test]
    fn test_large_edit_materializes() {
        let mut cache = cache("abc");
        cache.edit(0, 0, &"z".repeat(257)).unwrap();
        assert_eq!(cache.current_version(), 1);
    }

    #[test]
    fn test_edits_validate_against_projected_length() {
        let mut cache = cache("abc");
        cache.edit(3, 0, "def").unwrap();
        // Valid only because of the pending insert.
        cache.edit(5, 1, "").unwrap();
        let err = cache.edit(6, 0, "!").unwrap_err();
        assert!(matches!(err, ServiceError::EditOutOfRange { len: 5, .. }));
        assert!(cache.edit(2, 4, "").is_err());
        assert_eq!(cache.get_snapshot().text(), "abcde");
    }

    #[test]
    fn test_history_window_evicts_old_versions() {
        let mut cache = cache("");
        for i in 0..12 {
            cache.edit(i, 0, "a").unwrap();
            cache.get_snapshot();
        }
        assert_eq!(cache.current_version(), 12);
        assert_eq!(cache.min_version(), 5);
        assert!(cache.get_text_changes_between_versions(4, 12).is_unavailable());
        assert!(matches!(
            cache.get_text_changes_between_versions(5, 12),
            ChangeRange::Changes(changes) if changes.len() == 7
        ));
    }

    #[test]
    fn test_reload_discards_history_and_bumps_version() {
        let mut cache = cache("one");
        cache.edit(0, 0, "x").unwrap();
        cache.get_snapshot();
        cache.edit(0, 0, "pending").unwrap();

        cache.reload("two");
        assert_eq!(cache.current_version(), 2);
        assert_eq!(cache.min_version(), 2);
        assert!(!cache.has_pending());
        assert_eq!(cache.get_snapshot().text(), "two");
        assert!(cache.get_text_changes_between_versions(1, 2).is_unavailable());
    }

    #[test]
    fn test_change_queries() {
        let mut cache = cache("hello");
        cache.edit(0, 1, "H").unwrap();
        cache.get_snapshot();
        cache.edit(5, 0, "!").unwrap();
        cache.get_snapshot();

        assert_eq!(
            cache.get_text_changes_between_versions(1, 1),
            ChangeRange::Unchanged
        );
        assert!(cache.get_text_changes_between_versions(2, 1).is_unavailable());
        assert!(cache.get_text_changes_between_versions(0, 3).is_unavailable());
        assert_eq!(
            cache.get_text_changes_between_versions(0, 2),
            ChangeRange::Changes(vec![
                TextChange::new(0, 1, "H"),
                TextChange::new(5, 0, "!"),
            ])
        );
    }

    #[test]
    fn test_replaying_changes_reproduces_newer_text() {
        let mut cache = cache("alpha\nbeta\ngamma\n");
        let v0 = cache.get_snapshot();
        cache.edit(6, 4, "BETA").unwrap();
        cache.edit(0, 0, "# ").unwrap();
        cache.get_snapshot();
        cache.edit(19, 0, "delta\n").unwrap();
        let v2 = cache.get_snapshot();

        let ChangeRange::Changes(changes) =
            cache.get_text_changes_between_versions(v0.version(), v2.version())
        else {
            panic!("expected changes");
        };
        assert_eq!(apply_changes(&v0.text(), &changes), v2.text());
    }

    #[test]
    fn test_old_snapshots_survive_later_edits() {
        let mut cache = cache("stable\n");
        let old = cache.get_snapshot();
        cache.edit(0, 6, "changed").unwrap();
        cache.get_snapshot();
        assert_eq!(old.text(), "stable\n");
    }
}

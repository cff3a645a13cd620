//! File system notifications and the watches that produce them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{ProjectRegistry, RegistryEvent, TimerTask};
use crate::host::{FileEvent, FileEventKind, FileSystem, WatchId};
use crate::project::ProjectId;

const LOG_TARGET: &str = "project_service::watch";

/// Why the registry holds a watch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum WatchPurpose {
    /// A tracked document.
    Document(PathBuf),
    /// A configured project's manifest file.
    Manifest(ProjectId),
    /// Everything below a configured project's manifest.
    ManifestTree(ProjectId),
    /// A directory above an inferred root where a manifest may appear.
    ManifestDiscovery(PathBuf),
}

/// Directory watches shared by every inferred project below them.
#[derive(Debug, Default)]
pub(super) struct DirectoryWatchers {
    dirs: HashMap<PathBuf, (WatchId, usize)>,
}

impl DirectoryWatchers {
    /// Take a reference on `dir`. Returns the watch when it was just created.
    pub(super) fn acquire(&mut self, fs: &dyn FileSystem, dir: &Path) -> Option<WatchId> {
        if let Some((_, count)) = self.dirs.get_mut(dir) {
            *count += 1;
            return None;
        }
        let watch = fs.watch_directory(dir, false);
        self.dirs.insert(dir.to_path_buf(), (watch, 1));
        Some(watch)
    }

    /// Drop a reference on `dir`. Returns the watch when it was released.
    pub(super) fn release(&mut self, fs: &dyn FileSystem, dir: &Path) -> Option<WatchId> {
        let entry = self.dirs.get_mut(dir)?;
        entry.1 -= 1;
        if entry.1 > 0 {
            return None;
        }
        let watch = entry.0;
        self.dirs.remove(dir);
        fs.release_watch(watch);
        Some(watch)
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.dirs.len()
    }
}

impl ProjectRegistry {
    /// Deliver a file system notification.
    ///
    /// Only paths covered by one of the registry's watches have an effect.
    pub fn on_file_event(&mut self, event: FileEvent) {
        let path = self.paths.normalize(&event.path);
        let mut purposes: Vec<WatchPurpose> = Vec::new();
        for watch in self.fs.watches().matching(&path) {
            if let Some(purpose) = self.watch_purposes.get(&watch) {
                if !purposes.contains(purpose) {
                    purposes.push(purpose.clone());
                }
            }
        }
        if purposes.is_empty() {
            log::trace!(target: LOG_TARGET, "Unwatched {:?} {}", event.kind, path.display());
            return;
        }
        log::debug!(target: LOG_TARGET, "{:?} {}", event.kind, path.display());

        for purpose in purposes {
            match purpose {
                WatchPurpose::Document(document) => {
                    self.watched_document_changed(&document, event.kind)
                }
                WatchPurpose::Manifest(project) => {
                    let trigger = path.clone();
                    self.update_configured_project(project, Some(&trigger));
                    self.update_structure();
                }
                WatchPurpose::ManifestTree(project) => self.source_tree_changed(project, &path),
                WatchPurpose::ManifestDiscovery(_) => {
                    if event.kind != FileEventKind::Deleted && self.is_manifest_name(&path) {
                        self.new_manifest_detected(&path);
                    }
                }
            }
        }
    }

    fn is_manifest_name(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                self.config
                    .manifest_names
                    .iter()
                    .any(|candidate| candidate == name)
            })
    }

    fn watched_document_changed(&mut self, path: &Path, kind: FileEventKind) {
        if kind == FileEventKind::Deleted {
            self.file_deleted(path);
            return;
        }
        // The editor owns the content of open files.
        if self.is_open(path) {
            return;
        }
        let text = match self.fs.read_to_string(path) {
            Ok(text) => text,
            Err(_) => {
                self.file_deleted(path);
                return;
            }
        };
        let reloaded = self
            .documents
            .with_mut(path, |doc| doc.reload_if_changed(&text))
            .unwrap_or(false);
        if reloaded {
            log::debug!(target: LOG_TARGET, "Reloaded {} from disk", path.display());
            self.mark_containing_stale(path);
            self.change_seq += 1;
            self.schedule(
                TimerTask::StructureUpdate {
                    seq: self.change_seq,
                },
                self.config.timing.structure_update(),
            );
        }
    }

    fn source_tree_changed(&mut self, project: ProjectId, path: &Path) {
        let Some(manifest) = self
            .projects
            .get(&project)
            .and_then(|candidate| candidate.manifest())
        else {
            return;
        };
        if manifest == path {
            return;
        }
        self.schedule(
            TimerTask::FileList(project),
            self.config.timing.file_list_update(),
        );
    }

    /// A tracked file vanished from disk.
    ///
    /// Open files keep their buffer but lose their watch. A closed one is
    /// dropped and every project that reached it is recomputed.
    pub(super) fn file_deleted(&mut self, path: &Path) {
        if self.is_open(path) {
            log::debug!(
                target: LOG_TARGET,
                "{} deleted on disk but open; keeping buffer",
                path.display()
            );
            let watch = self
                .documents
                .with_mut(path, |doc| doc.set_watch(None))
                .flatten();
            if let Some(watch) = watch {
                self.release_watch(watch);
            }
            let project = self.default_project_of(path);
            self.events.push(RegistryEvent::ContextChanged {
                path: path.to_path_buf(),
                project,
            });
            return;
        }
        let affected: Vec<ProjectId> = self
            .projects
            .values()
            .filter(|project| project.contains(path) || project.is_root(path))
            .map(|project| project.id())
            .collect();
        self.drop_document(path);
        for id in &affected {
            if let Some(project) = self.projects.get_mut(id) {
                project.remove_root(path);
                project.mark_stale();
            }
        }
        self.refresh_projects();

        let open: Vec<PathBuf> = self
            .open_roots
            .iter()
            .chain(&self.open_referenced)
            .chain(&self.open_roots_configured)
            .filter(|open| {
                self.default_project_of(open)
                    .is_some_and(|project| affected.contains(&project))
            })
            .cloned()
            .collect();
        for path in open {
            let project = self.default_project_of(&path);
            self.events
                .push(RegistryEvent::ContextChanged { path, project });
        }
        self.update_structure();
    }
}

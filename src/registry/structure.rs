//! Open-file bookkeeping and the structure update pass.

use std::path::{Path, PathBuf};

use super::sources::StoreSources;
use super::watchers::WatchPurpose;
use super::{LOG_TARGET, ProjectRegistry, RegistryEvent, TimerKey, remove_item};
use crate::host::ancestors_of;
use crate::project::{Project, ProjectId, ProjectKind};

const STRUCTURE_TARGET: &str = "project_service::structure";

impl ProjectRegistry {
    /// Re-derive which project every open file belongs to.
    ///
    /// Runs after closes and manifest changes, and from the debounced timer
    /// after edits. Files that lost their project are re-added as if newly
    /// opened; inferred roots reached by another project are demoted into
    /// it; configured projects nobody has open are torn down.
    pub fn update_structure(&mut self) {
        log::debug!(
            target: STRUCTURE_TARGET,
            "Updating structure: {} inferred, {} configured projects",
            self.inferred.len(),
            self.configured.len()
        );
        self.refresh_projects();
        let mut unattached = Vec::new();

        for path in self.open_roots_configured.clone() {
            let still_root = self
                .default_project_of(&path)
                .and_then(|id| self.projects.get(&id))
                .is_some_and(|project| project.is_root(&path));
            if !still_root {
                remove_item(&mut self.open_roots_configured, &path);
                self.set_default(&path, None);
                unattached.push(path);
            }
        }

        for path in self.open_referenced.clone() {
            let reachable = self
                .default_project_of(&path)
                .and_then(|id| self.projects.get(&id))
                .is_some_and(|project| project.contains(&path));
            if !reachable {
                remove_item(&mut self.open_referenced, &path);
                self.set_default(&path, None);
                unattached.push(path);
            }
        }

        for root in self.open_roots.clone() {
            if !self.open_roots.contains(&root) {
                continue;
            }
            let own = self.default_project_of(&root);
            let Some(finder) = self.best_referencing(&root, own) else {
                continue;
            };
            log::debug!(
                target: STRUCTURE_TARGET,
                "{} is reached by {}; dropping its inferred project",
                root.display(),
                finder
            );
            remove_item(&mut self.open_roots, &root);
            if let Some(own) = own {
                let orphans = self.remove_project(own);
                unattached.extend(orphans.into_iter().filter(|path| path != &root));
            }
            self.claim(&root, finder);
            self.events.push(RegistryEvent::ContextChanged {
                path: root,
                project: Some(finder),
            });
        }

        self.reattach(unattached);
        self.prune_unused_configured();
        self.collect_orphan_documents();
    }

    /// Register a newly opened file with the project that should own it,
    /// creating an inferred project when nobody does.
    pub(super) fn add_open_file(&mut self, path: &Path) {
        self.refresh_projects();

        if let Some(id) = self.configured_rooting(path) {
            self.set_default(path, Some(id));
            self.open_roots_configured.push(path.to_path_buf());
            return;
        }
        if let Some(id) = self.best_referencing(path, None) {
            self.set_default(path, Some(id));
            self.open_referenced.push(path.to_path_buf());
            return;
        }

        let id = self.create_inferred_project(path);
        self.set_default(path, Some(id));

        // The new project may reach other inferred roots; they become
        // referenced files of it.
        let reached: Vec<PathBuf> = self
            .open_roots
            .iter()
            .filter(|root| {
                self.projects
                    .get(&id)
                    .is_some_and(|project| project.contains(root))
            })
            .cloned()
            .collect();
        let mut detached = Vec::new();
        for root in reached {
            remove_item(&mut self.open_roots, &root);
            if let Some(old) = self.default_project_of(&root) {
                let orphans = self.remove_project(old);
                detached.extend(orphans.into_iter().filter(|orphan| orphan != &root));
            }
            self.set_default(&root, Some(id));
            self.open_referenced.push(root.clone());
            self.events.push(RegistryEvent::ContextChanged {
                path: root,
                project: Some(id),
            });
        }
        self.open_roots.push(path.to_path_buf());
        self.reattach(detached);
    }

    /// Re-add open files that lost their default project.
    pub(super) fn reattach(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if !self.is_open(&path) || self.default_project_of(&path).is_some() {
                continue;
            }
            remove_item(&mut self.open_roots, &path);
            remove_item(&mut self.open_referenced, &path);
            remove_item(&mut self.open_roots_configured, &path);
            self.add_open_file(&path);
            let project = self.default_project_of(&path);
            self.events
                .push(RegistryEvent::ContextChanged { path, project });
        }
    }

    /// Attach an open file to `project` as root or referenced file.
    pub(super) fn claim(&mut self, path: &Path, project: ProjectId) {
        let is_root = self
            .projects
            .get(&project)
            .is_some_and(|candidate| candidate.is_root(path));
        if is_root {
            self.open_roots_configured.push(path.to_path_buf());
        } else {
            self.open_referenced.push(path.to_path_buf());
        }
        self.set_default(path, Some(project));
    }

    /// Change an open file's default project, keeping open counts in step.
    pub(super) fn set_default(&mut self, path: &Path, project: Option<ProjectId>) {
        let Some((is_open, old)) = self
            .documents
            .get(path)
            .map(|doc| (doc.is_open(), doc.default_project()))
        else {
            return;
        };
        if old == project {
            return;
        }
        if is_open {
            if let Some(old) = old.and_then(|id| self.projects.get_mut(&id)) {
                old.remove_open_ref();
            }
            if let Some(new) = project.and_then(|id| self.projects.get_mut(&id)) {
                new.add_open_ref();
            }
        }
        self.documents
            .with_mut(path, |doc| doc.set_default_project(project));
    }

    /// The project that should own `path` among those reaching it.
    /// Configured projects win over inferred ones.
    pub(super) fn best_referencing(
        &self,
        path: &Path,
        exclude: Option<ProjectId>,
    ) -> Option<ProjectId> {
        self.configured
            .iter()
            .chain(self.inferred.iter())
            .copied()
            .filter(|id| Some(*id) != exclude)
            .find(|id| {
                self.projects
                    .get(id)
                    .is_some_and(|project| project.contains(path))
            })
    }

    fn configured_rooting(&self, path: &Path) -> Option<ProjectId> {
        self.configured.iter().copied().find(|id| {
            self.projects
                .get(id)
                .is_some_and(|project| project.is_root(path))
        })
    }

    pub(super) fn allocate_project_id(&mut self) -> ProjectId {
        self.next_project_id += 1;
        ProjectId::new(self.next_project_id)
    }

    fn create_inferred_project(&mut self, root: &Path) -> ProjectId {
        let id = self.allocate_project_id();
        let mut project = Project::inferred(id, root.to_path_buf());

        let dirs: Vec<PathBuf> = ancestors_of(root).map(Path::to_path_buf).collect();
        for dir in &dirs {
            if let Some(watch) = self.discovery.acquire(self.fs.as_ref(), dir) {
                self.watch_purposes
                    .insert(watch, WatchPurpose::ManifestDiscovery(dir.clone()));
            }
        }
        project.set_discovery_dirs(dirs);

        self.projects.insert(id, project);
        self.inferred.push(id);
        self.refresh_project(id);

        log::info!(target: LOG_TARGET, "Created inferred {} for {}", id, root.display());
        self.events.push(RegistryEvent::ProjectCreated {
            project: id,
            kind: ProjectKind::Inferred,
        });
        id
    }

    /// Tear down a project, releasing its watches. Returns the open files
    /// that used it as their default; they are no longer in any open list.
    pub(super) fn remove_project(&mut self, id: ProjectId) -> Vec<PathBuf> {
        let Some(mut project) = self.projects.remove(&id) else {
            return Vec::new();
        };
        for watch in project.take_watches() {
            self.release_watch(watch);
        }
        for dir in project.take_discovery_dirs() {
            if let Some(watch) = self.discovery.release(self.fs.as_ref(), &dir) {
                self.watch_purposes.remove(&watch);
            }
        }
        self.inferred.retain(|other| *other != id);
        self.configured.retain(|other| *other != id);
        self.timers.cancel(&TimerKey::FileList(id));

        let orphans: Vec<PathBuf> = self
            .open_roots
            .iter()
            .chain(&self.open_referenced)
            .chain(&self.open_roots_configured)
            .filter(|path| self.default_project_of(path) == Some(id))
            .cloned()
            .collect();
        for orphan in &orphans {
            remove_item(&mut self.open_roots, orphan);
            remove_item(&mut self.open_referenced, orphan);
            remove_item(&mut self.open_roots_configured, orphan);
            self.set_default(orphan, None);
        }

        log::info!(
            target: LOG_TARGET,
            "Removed {} ({} open files detached)",
            id,
            orphans.len()
        );
        self.events
            .push(RegistryEvent::ProjectRemoved { project: id });
        orphans
    }

    pub(super) fn prune_unused_configured(&mut self) {
        let unused: Vec<ProjectId> = self
            .configured
            .iter()
            .copied()
            .filter(|id| {
                self.projects
                    .get(id)
                    .is_some_and(|project| project.open_refs() == 0)
            })
            .collect();
        for id in unused {
            let orphans = self.remove_project(id);
            self.reattach(orphans);
        }
    }

    pub(super) fn refresh_projects(&mut self) {
        let stale: Vec<ProjectId> = self
            .projects
            .values()
            .filter(|project| project.is_stale())
            .map(Project::id)
            .collect();
        for id in stale {
            self.refresh_project(id);
        }
    }

    /// Recompute one project's file set and load any new members.
    pub(super) fn refresh_project(&mut self, id: ProjectId) {
        let Some(project) = self.projects.get_mut(&id) else {
            return;
        };
        let sources = StoreSources {
            documents: &self.documents,
            fs: self.fs.as_ref(),
        };
        project.refresh(self.engine.as_ref(), &sources);
        let files = project.files().to_vec();
        for file in files {
            self.ensure_document(&file);
        }
    }

    /// Drop closed documents no project refers to.
    pub(super) fn collect_orphan_documents(&mut self) {
        let orphans: Vec<PathBuf> = self
            .documents
            .paths()
            .into_iter()
            .filter(|path| {
                !self.is_open(path) && !self.projects.values().any(|project| project.contains(path))
            })
            .collect();
        for path in orphans {
            self.drop_document(&path);
        }
    }
}

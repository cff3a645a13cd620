//! Configured projects: opening, re-reading and dropping manifests.

use std::path::{Path, PathBuf};

use super::watchers::WatchPurpose;
use super::{LOG_TARGET, ProjectRegistry, RegistryEvent, remove_item};
use crate::manifest::{ManifestDiagnostic, ManifestOutcome, find_manifest};
use crate::project::{Project, ProjectId, ProjectKind};

impl ProjectRegistry {
    /// Re-read every manifest and re-derive the structure.
    pub fn reload_projects(&mut self) {
        log::info!(target: LOG_TARGET, "Reloading projects");
        for id in self.configured.clone() {
            self.update_configured_project(id, None);
        }
        for root in self.open_roots.clone() {
            self.open_or_update_configured_project_for(&root);
        }
        self.update_structure();
    }

    /// Make sure the manifest nearest to `path`, if any, has a project.
    pub(super) fn open_or_update_configured_project_for(&mut self, path: &Path) {
        let Some(manifest) = self.nearest_manifest(path) else {
            return;
        };
        match self.configured_for_manifest(&manifest) {
            Some(id) => self.update_configured_project(id, Some(path)),
            None => {
                self.open_manifest(&manifest, Some(path));
            }
        }
    }

    fn nearest_manifest(&self, path: &Path) -> Option<PathBuf> {
        let dir = path.parent()?;
        find_manifest(self.fs.as_ref(), dir, &self.config.manifest_names)
            .map(|manifest| self.paths.normalize(&manifest))
    }

    fn configured_for_manifest(&self, manifest: &Path) -> Option<ProjectId> {
        self.configured.iter().copied().find(|id| {
            self.projects
                .get(id)
                .and_then(Project::manifest)
                .is_some_and(|candidate| candidate == manifest)
        })
    }

    fn parse_manifest(&mut self, manifest: &Path, trigger: Option<&Path>) -> ManifestOutcome {
        let outcome = self.parser.parse(manifest, self.fs.as_ref(), &self.paths);
        self.report_diagnostics(manifest, trigger, &outcome.diagnostics);
        outcome
    }

    fn report_diagnostics(
        &mut self,
        manifest: &Path,
        trigger: Option<&Path>,
        diagnostics: &[ManifestDiagnostic],
    ) {
        if diagnostics.is_empty() {
            return;
        }
        for diagnostic in diagnostics {
            log::warn!(target: "project_service::manifest", "{}", diagnostic);
        }
        self.events.push(RegistryEvent::ManifestDiagnostics {
            manifest: manifest.to_path_buf(),
            trigger: trigger.map(Path::to_path_buf),
            diagnostics: diagnostics.to_vec(),
        });
    }

    /// Create a configured project from `manifest`. Returns `None` when the
    /// manifest lists no usable root files.
    pub(super) fn open_manifest(
        &mut self,
        manifest: &Path,
        trigger: Option<&Path>,
    ) -> Option<ProjectId> {
        let outcome = self.parse_manifest(manifest, trigger);
        self.create_configured_project(manifest, outcome)
    }

    fn create_configured_project(
        &mut self,
        manifest: &Path,
        outcome: ManifestOutcome,
    ) -> Option<ProjectId> {
        if !outcome.defines_project() {
            log::info!(
                target: LOG_TARGET,
                "{} lists no root files; no project created",
                manifest.display()
            );
            return None;
        }

        let id = self.allocate_project_id();
        let roots: Vec<PathBuf> = outcome
            .root_files
            .into_iter()
            .filter(|root| self.ensure_document(root))
            .collect();
        let mut project = Project::configured(id, manifest.to_path_buf(), roots, outcome.settings);

        let manifest_watch = self.fs.watch_file(manifest);
        self.watch_purposes
            .insert(manifest_watch, WatchPurpose::Manifest(id));
        project.add_watch(manifest_watch);
        if let Some(dir) = manifest.parent() {
            let tree_watch = self.fs.watch_directory(dir, true);
            self.watch_purposes
                .insert(tree_watch, WatchPurpose::ManifestTree(id));
            project.add_watch(tree_watch);
        }

        self.projects.insert(id, project);
        self.configured.push(id);
        self.refresh_project(id);

        log::info!(
            target: LOG_TARGET,
            "Created configured {} from {}",
            id,
            manifest.display()
        );
        self.events.push(RegistryEvent::ProjectCreated {
            project: id,
            kind: ProjectKind::Configured {
                manifest: manifest.to_path_buf(),
            },
        });
        Some(id)
    }

    /// Re-read a configured project's manifest. The project is removed
    /// when its manifest is gone.
    pub(super) fn update_configured_project(&mut self, id: ProjectId, trigger: Option<&Path>) {
        let Some(manifest) = self.manifest_of(id) else {
            return;
        };
        if !self.fs.is_file(&manifest) {
            log::info!(
                target: LOG_TARGET,
                "{} was deleted; removing {}",
                manifest.display(),
                id
            );
            let orphans = self.remove_project(id);
            self.reattach(orphans);
            return;
        }
        let outcome = self.parse_manifest(&manifest, trigger);
        self.apply_manifest(id, outcome);
    }

    fn manifest_of(&self, id: ProjectId) -> Option<PathBuf> {
        self.projects
            .get(&id)
            .and_then(Project::manifest)
            .map(Path::to_path_buf)
    }

    fn apply_manifest(&mut self, id: ProjectId, outcome: ManifestOutcome) {
        if !outcome.defines_project() {
            // Keep the last good root list until the manifest is fixed.
            return;
        }
        let Some(old_roots) = self.projects.get(&id).map(|project| project.roots().to_vec()) else {
            return;
        };
        let mut detached = Vec::new();

        for removed in old_roots.iter().filter(|root| !outcome.root_files.contains(root)) {
            if let Some(project) = self.projects.get_mut(&id) {
                project.remove_root(removed);
            }
            if self.default_project_of(removed) == Some(id)
                && remove_item(&mut self.open_roots_configured, removed)
            {
                self.set_default(removed, None);
                detached.push(removed.clone());
            }
        }

        for added in outcome.root_files.iter().filter(|root| !old_roots.contains(root)) {
            if !self.ensure_document(added) {
                continue;
            }
            if let Some(project) = self.projects.get_mut(&id) {
                project.add_root(added.clone());
            }
            if !self.is_open(added) {
                continue;
            }
            let previous = self.default_project_of(added);
            if remove_item(&mut self.open_roots, added) {
                if let Some(own) = previous {
                    let orphans = self.remove_project(own);
                    detached.extend(orphans.into_iter().filter(|orphan| orphan != added));
                }
            }
            remove_item(&mut self.open_referenced, added);
            remove_item(&mut self.open_roots_configured, added);
            self.set_default(added, Some(id));
            self.open_roots_configured.push(added.clone());
            self.events.push(RegistryEvent::ContextChanged {
                path: added.clone(),
                project: Some(id),
            });
        }

        if let Some(project) = self.projects.get_mut(&id) {
            project.set_settings(outcome.settings);
            project.mark_stale();
        }
        self.refresh_project(id);
        self.reattach(detached);
    }

    /// Files appeared or vanished under a manifest's directory. Re-reads
    /// the manifest and updates the structure when its root list changed.
    pub(super) fn handle_project_file_list_changes(&mut self, id: ProjectId) {
        let Some(manifest) = self.manifest_of(id) else {
            return;
        };
        if !self.fs.is_file(&manifest) {
            self.update_configured_project(id, None);
            self.update_structure();
            return;
        }
        let outcome = self.parse_manifest(&manifest, None);
        let mut listed = outcome.root_files.clone();
        listed.sort();
        let mut current = self
            .projects
            .get(&id)
            .map(|project| project.roots().to_vec())
            .unwrap_or_default();
        current.sort();
        if listed == current {
            log::debug!(target: LOG_TARGET, "Root files of {} unchanged", id);
            return;
        }
        log::info!(target: LOG_TARGET, "Root files of {} changed", id);
        self.apply_manifest(id, outcome);
        self.update_structure();
    }

    /// A manifest appeared next to or above an inferred root. Its project
    /// is opened and the structure reloaded when it would take over one of
    /// them.
    pub(super) fn new_manifest_detected(&mut self, manifest: &Path) {
        if self.configured_for_manifest(manifest).is_some() {
            return;
        }
        let outcome = self.parse_manifest(manifest, None);
        if !outcome.defines_project() {
            return;
        }
        let takes_over = self.open_roots.iter().any(|root| {
            outcome.root_files.contains(root)
                || self.nearest_manifest(root).as_deref() == Some(manifest)
        });
        if takes_over {
            log::info!(
                target: LOG_TARGET,
                "New manifest {} affects open files",
                manifest.display()
            );
            self.create_configured_project(manifest, outcome);
            self.reload_projects();
        }
    }
}

//! The project registry.
//!
//! Owns every document and project and keeps three lists of open files:
//!
//! - `open_roots`: roots of inferred projects (one project per file)
//! - `open_referenced`: reached from some project without being its root
//! - `open_roots_configured`: roots listed by a manifest
//!
//! Each open file sits in exactly one list and has exactly one default
//! project. All mutation happens through `&mut self`; deferred work is
//! queued on a [`TimerQueue`] and runs when the clock is advanced.

mod configured;
mod events;
mod sources;
mod structure;
mod watchers;

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{AnalysisEngine, ReferenceScanner};
use crate::config::ServiceConfig;
use crate::document::{ChangeRange, Document, DocumentStore, Snapshot};
use crate::error::{ServiceError, ServiceResult};
use crate::host::{FileSystem, PathNormalizer, WatchId};
use crate::manifest::{ManifestParser, TomlManifestParser};
use crate::project::{Project, ProjectId};
use crate::scheduler::TimerQueue;
use crate::text::{Position, Range, char_len};

pub use events::RegistryEvent;
use watchers::{DirectoryWatchers, WatchPurpose};

const LOG_TARGET: &str = "project_service::registry";

/// Replace chars `start..end` of a document with `text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextEdit {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(start, end, "")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum TimerKey {
    Materialize(PathBuf),
    StructureUpdate,
    FileList(ProjectId),
}

#[derive(Clone, Debug)]
enum TimerTask {
    /// Fold buffered edits of one document into a snapshot.
    Materialize(PathBuf),
    /// Re-derive project structure if no edit happened since `seq`.
    StructureUpdate { seq: u64 },
    /// Re-read a manifest after files changed under its directory.
    FileList(ProjectId),
}

impl TimerTask {
    fn key(&self) -> TimerKey {
        match self {
            TimerTask::Materialize(path) => TimerKey::Materialize(path.clone()),
            TimerTask::StructureUpdate { .. } => TimerKey::StructureUpdate,
            TimerTask::FileList(project) => TimerKey::FileList(*project),
        }
    }
}

pub struct RegistryBuilder {
    fs: Arc<dyn FileSystem>,
    config: ServiceConfig,
    base_dir: Option<PathBuf>,
    parser: Option<Arc<dyn ManifestParser>>,
    engine: Option<Arc<dyn AnalysisEngine>>,
}

impl RegistryBuilder {
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Directory relative paths are resolved against. Defaults to the
    /// process working directory.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn parser(mut self, parser: Arc<dyn ManifestParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn AnalysisEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn build(self) -> ServiceResult<ProjectRegistry> {
        let base = self
            .base_dir
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"));
        let paths = PathNormalizer::new(base, self.config.case_sensitive_paths);
        let engine: Arc<dyn AnalysisEngine> = match self.engine {
            Some(engine) => engine,
            None => Arc::new(ReferenceScanner::new(&self.config.analysis, paths.clone())?),
        };
        let parser = self
            .parser
            .unwrap_or_else(|| Arc::new(TomlManifestParser::new()));

        Ok(ProjectRegistry {
            config: self.config,
            fs: self.fs,
            parser,
            engine,
            paths,
            documents: Arc::new(DocumentStore::new()),
            projects: BTreeMap::new(),
            next_project_id: 0,
            inferred: Vec::new(),
            configured: Vec::new(),
            open_roots: Vec::new(),
            open_referenced: Vec::new(),
            open_roots_configured: Vec::new(),
            discovery: DirectoryWatchers::default(),
            watch_purposes: HashMap::new(),
            timers: TimerQueue::new(),
            change_seq: 0,
            events: Vec::new(),
        })
    }
}

pub struct ProjectRegistry {
    config: ServiceConfig,
    fs: Arc<dyn FileSystem>,
    parser: Arc<dyn ManifestParser>,
    engine: Arc<dyn AnalysisEngine>,
    paths: PathNormalizer,
    documents: Arc<DocumentStore>,
    projects: BTreeMap<ProjectId, Project>,
    next_project_id: u64,
    inferred: Vec<ProjectId>,
    configured: Vec<ProjectId>,
    open_roots: Vec<PathBuf>,
    open_referenced: Vec<PathBuf>,
    open_roots_configured: Vec<PathBuf>,
    discovery: DirectoryWatchers,
    watch_purposes: HashMap<WatchId, WatchPurpose>,
    timers: TimerQueue<TimerKey, TimerTask>,
    change_seq: u64,
    events: Vec<RegistryEvent>,
}

fn remove_item(list: &mut Vec<PathBuf>, path: &Path) -> bool {
    match list.iter().position(|item| item == path) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

impl ProjectRegistry {
    pub fn builder(fs: Arc<dyn FileSystem>) -> RegistryBuilder {
        RegistryBuilder {
            fs,
            config: ServiceConfig::default(),
            base_dir: None,
            parser: None,
            engine: None,
        }
    }

    pub fn new(fs: Arc<dyn FileSystem>, config: ServiceConfig) -> ServiceResult<Self> {
        Self::builder(fs).config(config).build()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Shared handle to the document store, for readers on other threads.
    pub fn documents(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.documents)
    }

    pub fn normalize(&self, path: &Path) -> PathBuf {
        self.paths.normalize(path)
    }

    // ----- editor operations -----

    /// Open `path` in the editor, optionally with the editor's content.
    ///
    /// Without `content` the file is read from disk. Returns the file's
    /// default project.
    pub fn open_file(
        &mut self,
        path: impl AsRef<Path>,
        content: Option<&str>,
    ) -> ServiceResult<Option<ProjectId>> {
        let path = self.paths.normalize(path.as_ref());

        let was_open = self.documents.get(&path).map(|doc| doc.is_open());
        match (was_open, content) {
            (Some(_), Some(content)) => {
                let reloaded = self
                    .documents
                    .with_mut(&path, |doc| doc.reload_if_changed(content))
                    .unwrap_or(false);
                if reloaded {
                    self.mark_containing_stale(&path);
                }
            }
            (Some(_), None) => {}
            (None, content) => {
                let text = match content {
                    Some(content) => content.to_string(),
                    None => self.fs.read_to_string(&path).map_err(|err| match err.kind() {
                        io::ErrorKind::NotFound => ServiceError::document_not_found(&path),
                        _ => ServiceError::Io(err),
                    })?,
                };
                self.insert_document(&path, &text);
            }
        }

        if was_open != Some(true) {
            self.documents.with_mut(&path, |doc| doc.set_open(true));
            self.open_or_update_configured_project_for(&path);
            self.add_open_file(&path);
            self.prune_unused_configured();
            self.collect_orphan_documents();
        }

        let project = self.default_project_of(&path);
        log::info!(
            target: LOG_TARGET,
            "Opened {} in {}",
            path.display(),
            project.map_or_else(|| "no project".to_string(), |id| id.to_string())
        );
        self.events.push(RegistryEvent::Opened { path, project });
        Ok(project)
    }

    /// Close `path`. Its content reverts to what is on disk (empty if the
    /// file no longer exists). Any other read failure leaves it open.
    pub fn close_file(&mut self, path: impl AsRef<Path>) -> ServiceResult<()> {
        let path = self.paths.normalize(path.as_ref());
        let is_open = self
            .documents
            .get(&path)
            .map(|doc| doc.is_open())
            .ok_or_else(|| ServiceError::document_not_found(&path))?;
        if !is_open {
            return Ok(());
        }

        let disk = match self.fs.read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                log::warn!(
                    target: "project_service::documents",
                    "Cannot re-read {} on close: {}",
                    path.display(),
                    err
                );
                return Err(ServiceError::Io(err));
            }
        };
        self.documents.with_mut(&path, |doc| doc.reload(&disk));
        self.mark_containing_stale(&path);

        let project = self.default_project_of(&path);
        let was_inferred_root = remove_item(&mut self.open_roots, &path);
        let was_configured_root =
            !was_inferred_root && remove_item(&mut self.open_roots_configured, &path);
        if !was_inferred_root && !was_configured_root {
            remove_item(&mut self.open_referenced, &path);
        }
        self.set_default(&path, None);
        self.documents.with_mut(&path, |doc| doc.set_open(false));

        if let Some(id) = project {
            let unused = self.projects.get(&id).is_some_and(|project| {
                was_inferred_root || (project.is_configured() && project.open_refs() == 0)
            });
            if unused {
                let orphans = self.remove_project(id);
                self.reattach(orphans);
            }
        }

        self.timers
            .cancel(&TimerKey::Materialize(path.clone()));
        log::info!(target: LOG_TARGET, "Closed {}", path.display());
        self.events.push(RegistryEvent::Closed { path, project });
        self.update_structure();
        Ok(())
    }

    /// Apply edits, in order, to an open document.
    ///
    /// The batch is validated up front: either every edit applies or none.
    /// Returns the document's version (pending edits are not yet counted).
    pub fn change_file(&mut self, path: impl AsRef<Path>, edits: &[TextEdit]) -> ServiceResult<u64> {
        let path = self.paths.normalize(path.as_ref());
        let (is_open, len) = self
            .documents
            .get(&path)
            .map(|doc| (doc.is_open(), doc.len()))
            .ok_or_else(|| ServiceError::document_not_found(&path))?;
        if !is_open {
            return Err(ServiceError::document_not_editable(&path));
        }

        let mut projected = len;
        for edit in edits {
            if edit.end < edit.start {
                return Err(ServiceError::invalid_range(format!(
                    "edit end {} precedes start {}",
                    edit.end, edit.start
                )));
            }
            if edit.end > projected {
                return Err(ServiceError::edit_out_of_range(
                    edit.start,
                    edit.end - edit.start,
                    projected,
                ));
            }
            projected = projected - (edit.end - edit.start) + char_len(&edit.text);
        }

        let version = self
            .documents
            .with_mut(&path, |doc| -> ServiceResult<u64> {
                for edit in edits {
                    doc.edit(edit.start, edit.end - edit.start, &edit.text)?;
                }
                Ok(doc.version())
            })
            .ok_or_else(|| ServiceError::document_not_found(&path))??;

        self.change_seq += 1;
        self.schedule(
            TimerTask::Materialize(path.clone()),
            self.config.timing.edit_coalesce(),
        );
        self.schedule(
            TimerTask::StructureUpdate {
                seq: self.change_seq,
            },
            self.config.timing.structure_update(),
        );
        self.mark_containing_stale(&path);
        let project = self.default_project_of(&path);
        self.events.push(RegistryEvent::Changed {
            path,
            project,
            version,
        });
        Ok(version)
    }

    /// Replace the text between two positions.
    pub fn change_range(
        &mut self,
        path: impl AsRef<Path>,
        range: Range,
        text: &str,
    ) -> ServiceResult<u64> {
        let snapshot = self.snapshot(&path)?;
        let start = snapshot.index().position_to_offset(range.start);
        let end = snapshot.index().position_to_offset(range.end);
        self.change_file(path, &[TextEdit::new(start, end, text)])
    }

    // ----- queries -----

    /// The project that owns `path`: the default project of an open file,
    /// otherwise the preferred project that reaches it.
    pub fn project_for(&mut self, path: impl AsRef<Path>) -> Option<ProjectId> {
        let path = self.paths.normalize(path.as_ref());
        if !self.documents.contains(&path) {
            return None;
        }
        if let Some(project) = self.default_project_of(&path) {
            return Some(project);
        }
        self.refresh_projects();
        self.best_referencing(&path, None)
    }

    /// Like [`Self::project_for`], but an open file left without a default
    /// project adopts the one found.
    pub fn forced_project_for(&mut self, path: impl AsRef<Path>) -> Option<ProjectId> {
        let path = self.paths.normalize(path.as_ref());
        let project = self.project_for(&path)?;
        if self.is_open(&path) {
            self.set_default(&path, Some(project));
        }
        Some(project)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn inferred_projects(&self) -> &[ProjectId] {
        &self.inferred
    }

    pub fn configured_projects(&self) -> &[ProjectId] {
        &self.configured
    }

    pub fn open_roots(&self) -> &[PathBuf] {
        &self.open_roots
    }

    pub fn open_referenced(&self) -> &[PathBuf] {
        &self.open_referenced
    }

    pub fn open_roots_configured(&self) -> &[PathBuf] {
        &self.open_roots_configured
    }

    pub fn snapshot(&self, path: impl AsRef<Path>) -> ServiceResult<Snapshot> {
        let path = self.paths.normalize(path.as_ref());
        self.documents
            .snapshot(&path)
            .ok_or_else(|| ServiceError::document_not_found(&path))
    }

    /// Text of `length` chars starting at `start`, clamped to the document.
    pub fn get_text(&self, path: impl AsRef<Path>, start: usize, length: usize) -> ServiceResult<String> {
        Ok(self.snapshot(path)?.get_text(start, length))
    }

    pub fn get_text_range(&self, path: impl AsRef<Path>, range: Range) -> ServiceResult<String> {
        let snapshot = self.snapshot(path)?;
        let start = snapshot.index().position_to_offset(range.start);
        let end = snapshot.index().position_to_offset(range.end);
        if end < start {
            return Err(ServiceError::invalid_range(format!("{range}")));
        }
        Ok(snapshot.get_text(start, end - start))
    }

    pub fn offset_to_position(&self, path: impl AsRef<Path>, offset: usize) -> ServiceResult<Position> {
        Ok(self
            .snapshot(path)?
            .index()
            .char_offset_to_line_and_pos(offset))
    }

    pub fn position_to_offset(&self, path: impl AsRef<Path>, position: Position) -> ServiceResult<usize> {
        Ok(self.snapshot(path)?.index().position_to_offset(position))
    }

    pub fn text_changes_between(
        &self,
        path: impl AsRef<Path>,
        old: u64,
        new: u64,
    ) -> ServiceResult<ChangeRange> {
        let path = self.paths.normalize(path.as_ref());
        self.documents
            .changes_between(&path, old, new)
            .ok_or_else(|| ServiceError::document_not_found(&path))
    }

    /// Notifications produced since the last call.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of content changes so far.
    pub fn change_seq(&self) -> u64 {
        self.change_seq
    }

    // ----- timers -----

    /// Advance the registry clock, running every timer that comes due.
    pub fn advance_time(&mut self, by: Duration) {
        let until = self.timers.now() + by;
        while let Some((_, task)) = self.timers.pop_due(until) {
            self.run_timer(task);
        }
        self.timers.set_now(until);
    }

    /// Run every pending timer, however far in the future.
    pub fn flush_timers(&mut self) {
        while let Some(deadline) = self.timers.next_deadline() {
            let wait = deadline.saturating_sub(self.timers.now());
            self.advance_time(wait);
        }
    }

    /// Time until the next timer is due.
    pub fn next_timer_in(&self) -> Option<Duration> {
        self.timers
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(self.timers.now()))
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    fn schedule(&mut self, task: TimerTask, delay: Duration) {
        self.timers.schedule(task.key(), delay, task);
    }

    fn run_timer(&mut self, task: TimerTask) {
        match task {
            TimerTask::Materialize(path) => {
                if let Some(snapshot) = self.documents.snapshot(&path) {
                    log::trace!(
                        target: "project_service::timers",
                        "{} materialized at version {}",
                        path.display(),
                        snapshot.version()
                    );
                }
            }
            TimerTask::StructureUpdate { seq } if seq == self.change_seq => {
                self.update_structure();
            }
            TimerTask::StructureUpdate { seq } => {
                log::debug!(
                    target: "project_service::timers",
                    "Skipping structure update for change {} (now at {})",
                    seq,
                    self.change_seq
                );
            }
            TimerTask::FileList(project) => self.handle_project_file_list_changes(project),
        }
    }

    // ----- documents -----

    fn insert_document(&mut self, path: &Path, text: &str) {
        let mut document = Document::with_config(
            path.to_path_buf(),
            text,
            self.config.version_cache,
            self.config.line_index.node_capacity,
        );
        let watch = self.fs.watch_file(path);
        self.watch_purposes
            .insert(watch, WatchPurpose::Document(path.to_path_buf()));
        document.set_watch(Some(watch));
        self.documents.insert(document);
        log::debug!(target: "project_service::documents", "Tracking {}", path.display());
    }

    /// Make sure a document exists for `path`, loading it from disk.
    /// Returns false when the file cannot be read.
    fn ensure_document(&mut self, path: &Path) -> bool {
        if self.documents.contains(path) {
            return true;
        }
        match self.fs.read_to_string(path) {
            Ok(text) => {
                self.insert_document(path, &text);
                true
            }
            Err(err) => {
                log::debug!(
                    target: "project_service::documents",
                    "Cannot load {}: {}",
                    path.display(),
                    err
                );
                false
            }
        }
    }

    fn drop_document(&mut self, path: &Path) {
        if let Some(mut document) = self.documents.remove(path) {
            if let Some(watch) = document.set_watch(None) {
                self.release_watch(watch);
            }
            self.timers.cancel(&TimerKey::Materialize(path.to_path_buf()));
            log::debug!(target: "project_service::documents", "Dropped {}", path.display());
        }
    }

    fn default_project_of(&self, path: &Path) -> Option<ProjectId> {
        self.documents
            .get(path)
            .and_then(|doc| doc.default_project())
    }

    fn is_open(&self, path: &Path) -> bool {
        self.documents.get(path).is_some_and(|doc| doc.is_open())
    }

    fn mark_containing_stale(&mut self, path: &Path) {
        for project in self.projects.values_mut() {
            if project.contains(path) {
                project.mark_stale();
            }
        }
    }

    fn release_watch(&mut self, watch: WatchId) {
        self.watch_purposes.remove(&watch);
        self.fs.release_watch(watch);
    }
}

//! Projects group documents around a set of roots.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisEngine, SourceProvider};
use crate::host::WatchId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectId(u64);

impl ProjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectKind {
    /// Created for an open file no other project claims; exactly one root.
    Inferred,
    /// Defined by a manifest.
    Configured { manifest: PathBuf },
}

#[derive(Debug)]
pub struct Project {
    id: ProjectId,
    kind: ProjectKind,
    roots: Vec<PathBuf>,
    files: Vec<PathBuf>,
    file_lookup: HashSet<PathBuf>,
    stale: bool,
    /// Open documents whose default project is this one.
    open_refs: usize,
    settings: toml::Table,
    /// Watches owned by the project (manifest file and tree).
    watches: Vec<WatchId>,
    /// Directories watched for new manifests (inferred projects only).
    discovery_dirs: Vec<PathBuf>,
}

impl Project {
    pub fn inferred(id: ProjectId, root: PathBuf) -> Self {
        Self::new(id, ProjectKind::Inferred, vec![root], toml::Table::new())
    }

    pub fn configured(
        id: ProjectId,
        manifest: PathBuf,
        roots: Vec<PathBuf>,
        settings: toml::Table,
    ) -> Self {
        Self::new(id, ProjectKind::Configured { manifest }, roots, settings)
    }

    fn new(id: ProjectId, kind: ProjectKind, roots: Vec<PathBuf>, settings: toml::Table) -> Self {
        Self {
            id,
            kind,
            roots,
            files: Vec::new(),
            file_lookup: HashSet::new(),
            stale: true,
            open_refs: 0,
            settings,
            watches: Vec::new(),
            discovery_dirs: Vec::new(),
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn kind(&self) -> &ProjectKind {
        &self.kind
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.kind, ProjectKind::Configured { .. })
    }

    pub fn manifest(&self) -> Option<&Path> {
        match &self.kind {
            ProjectKind::Configured { manifest } => Some(manifest),
            ProjectKind::Inferred => None,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_root(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| root == path)
    }

    pub(crate) fn add_root(&mut self, path: PathBuf) {
        if !self.is_root(&path) {
            self.roots.push(path);
            self.stale = true;
        }
    }

    pub(crate) fn remove_root(&mut self, path: &Path) -> bool {
        let before = self.roots.len();
        self.roots.retain(|root| root != path);
        let removed = self.roots.len() != before;
        self.stale |= removed;
        removed
    }

    /// Roots plus everything reachable from them, as of the last refresh.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.file_lookup.contains(path) || self.is_root(path)
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Recompute the file set if it may be out of date.
    pub(crate) fn refresh(&mut self, engine: &dyn AnalysisEngine, sources: &dyn SourceProvider) {
        if !self.stale {
            return;
        }
        self.files = engine.file_set(&self.roots, sources);
        self.file_lookup = self.files.iter().cloned().collect();
        self.stale = false;
    }

    pub fn open_refs(&self) -> usize {
        self.open_refs
    }

    pub(crate) fn add_open_ref(&mut self) {
        self.open_refs += 1;
    }

    pub(crate) fn remove_open_ref(&mut self) {
        self.open_refs = self.open_refs.saturating_sub(1);
    }

    pub fn settings(&self) -> &toml::Table {
        &self.settings
    }

    pub(crate) fn set_settings(&mut self, settings: toml::Table) {
        self.settings = settings;
    }

    pub(crate) fn add_watch(&mut self, watch: WatchId) {
        self.watches.push(watch);
    }

    pub(crate) fn take_watches(&mut self) -> Vec<WatchId> {
        std::mem::take(&mut self.watches)
    }

    pub(crate) fn set_discovery_dirs(&mut self, dirs: Vec<PathBuf>) {
        self.discovery_dirs = dirs;
    }

    pub(crate) fn take_discovery_dirs(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.discovery_dirs)
    }
}

use std::path::PathBuf;

use crate::manifest::ManifestDiagnostic;
use crate::project::{ProjectId, ProjectKind};

/// Notifications for whoever serves the editor, drained with
/// [`super::ProjectRegistry::take_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryEvent {
    Opened {
        path: PathBuf,
        project: Option<ProjectId>,
    },
    /// `project` is the default project the file had while open.
    Closed {
        path: PathBuf,
        project: Option<ProjectId>,
    },
    Changed {
        path: PathBuf,
        project: Option<ProjectId>,
        version: u64,
    },
    /// The project owning an open file changed underneath it; consumers
    /// should refresh anything derived from the file's context.
    ContextChanged {
        path: PathBuf,
        project: Option<ProjectId>,
    },
    ManifestDiagnostics {
        manifest: PathBuf,
        trigger: Option<PathBuf>,
        diagnostics: Vec<ManifestDiagnostic>,
    },
    ProjectCreated {
        project: ProjectId,
        kind: ProjectKind,
    },
    ProjectRemoved {
        project: ProjectId,
    },
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::Opened { .. } => "opened",
            RegistryEvent::Closed { .. } => "closed",
            RegistryEvent::Changed { .. } => "changed",
            RegistryEvent::ContextChanged { .. } => "context",
            RegistryEvent::ManifestDiagnostics { .. } => "manifestDiag",
            RegistryEvent::ProjectCreated { .. } => "projectCreated",
            RegistryEvent::ProjectRemoved { .. } => "projectRemoved",
        }
    }
}

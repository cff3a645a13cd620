//! Project manifests: files that list root documents and settings.
//!
//! The registry only depends on [`ManifestParser`]; [`TomlManifestParser`]
//! is the format shipped with the crate.

mod diagnostics;
mod discovery;
mod toml_manifest;

use std::path::{Path, PathBuf};

use crate::host::{FileSystem, PathNormalizer};

pub use diagnostics::{DiagnosticSeverity, ManifestDiagnostic};
pub use discovery::find_manifest;
pub use toml_manifest::TomlManifestParser;

/// Result of reading one manifest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManifestOutcome {
    /// Normalized, existing root files in manifest order.
    pub root_files: Vec<PathBuf>,
    pub settings: toml::Table,
    pub diagnostics: Vec<ManifestDiagnostic>,
}

impl ManifestOutcome {
    /// A manifest with no root files does not define a project.
    pub fn defines_project(&self) -> bool {
        !self.root_files.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == DiagnosticSeverity::Error)
    }
}

pub trait ManifestParser: Send + Sync {
    fn parse(&self, manifest: &Path, fs: &dyn FileSystem, paths: &PathNormalizer)
    -> ManifestOutcome;
}

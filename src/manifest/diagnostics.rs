use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestDiagnostic {
    pub manifest: PathBuf,
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl ManifestDiagnostic {
    pub fn error(manifest: &Path, message: impl Into<String>) -> Self {
        Self {
            manifest: manifest.to_path_buf(),
            severity: DiagnosticSeverity::Error,
            message: message.into(),
        }
    }

    pub fn warning(manifest: &Path, message: impl Into<String>) -> Self {
        Self {
            manifest: manifest.to_path_buf(),
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for ManifestDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Error => "error",
        };
        write!(f, "{}: {}: {}", self.manifest.display(), level, self.message)
    }
}

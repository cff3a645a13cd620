use std::path::{Path, PathBuf};

/// Supplies the current text of a file, whether open in the editor or only
/// on disk.
pub trait SourceProvider {
    /// `None` when the file does not exist.
    fn source(&self, path: &Path) -> Option<String>;
}

/// Computes the files reachable from a set of roots.
pub trait AnalysisEngine: Send + Sync {
    /// Roots first, then everything they reach, without duplicates.
    /// Files the provider cannot supply are left out.
    fn file_set(&self, roots: &[PathBuf], sources: &dyn SourceProvider) -> Vec<PathBuf>;
}

impl<F> SourceProvider for F
where
    F: Fn(&Path) -> Option<String>,
{
    fn source(&self, path: &Path) -> Option<String> {
        self(path)
    }
}

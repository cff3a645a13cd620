use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Turns user-supplied paths into document keys.
///
/// Relative paths are resolved against `base`, `.`/`..` segments are folded,
/// and on case-insensitive hosts the whole path is lowercased.
#[derive(Clone, Debug)]
pub struct PathNormalizer {
    base: PathBuf,
    case_sensitive: bool,
}

impl PathNormalizer {
    pub fn new(base: impl Into<PathBuf>, case_sensitive: bool) -> Self {
        Self {
            base: base.into(),
            case_sensitive,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn normalize(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };
        let cleaned = absolute.clean();
        if self.case_sensitive {
            cleaned
        } else {
            PathBuf::from(cleaned.to_string_lossy().to_lowercase())
        }
    }

    /// Resolve `relative` against the directory `dir`.
    pub fn resolve_in(&self, dir: &Path, relative: &Path) -> PathBuf {
        self.normalize(&dir.join(relative))
    }
}

/// Proper ancestor directories of `path`, nearest first.
pub fn ancestors_of(path: &Path) -> impl Iterator<Item = &Path> {
    path.ancestors().skip(1).filter(|dir| !dir.as_os_str().is_empty())
}

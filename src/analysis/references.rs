use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use super::traits::{AnalysisEngine, SourceProvider};
use crate::config::AnalysisConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::host::PathNormalizer;

const LOG_TARGET: &str = "project_service::analysis";

/// Follows textual references such as `import "util.txt"`.
///
/// The first capture group of the pattern is a path relative to the
/// referencing file's directory.
#[derive(Clone, Debug)]
pub struct ReferenceScanner {
    pattern: Regex,
    paths: PathNormalizer,
}

impl ReferenceScanner {
    pub fn new(config: &AnalysisConfig, paths: PathNormalizer) -> ServiceResult<Self> {
        let pattern = Regex::new(&config.reference_pattern).map_err(|err| {
            ServiceError::config(format!("invalid reference pattern: {err}"))
        })?;
        Ok(Self { pattern, paths })
    }

    /// Files referenced directly by `path`, in order of appearance.
    pub fn references(&self, path: &Path, text: &str) -> Vec<PathBuf> {
        let dir = path.parent().unwrap_or(Path::new("/"));
        self.pattern
            .captures_iter(text)
            .filter_map(|captures| captures.get(1))
            .map(|target| self.paths.resolve_in(dir, Path::new(target.as_str())))
            .collect()
    }
}

impl AnalysisEngine for ReferenceScanner {
    fn file_set(&self, roots: &[PathBuf], sources: &dyn SourceProvider) -> Vec<PathBuf> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();
        let mut queue: VecDeque<PathBuf> = roots.iter().cloned().collect();

        while let Some(path) = queue.pop_front() {
            if seen.contains(&path) {
                continue;
            }
            let Some(text) = sources.source(&path) else {
                log::trace!(target: LOG_TARGET, "Skipping unreadable {}", path.display());
                continue;
            };
            seen.insert(path.clone());
            queue.extend(
                self.references(&path, &text)
                    .into_iter()
                    .filter(|target| !seen.contains(target)),
            );
            files.push(path);
        }
        files
    }
}

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{ManifestDiagnostic, ManifestOutcome, ManifestParser};
use crate::host::{FileSystem, PathNormalizer};

const LOG_TARGET: &str = "project_service::manifest";

const KNOWN_KEYS: &[&str] = &["files", "include", "extensions", "settings"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawManifest {
    files: Vec<String>,
    include: Vec<String>,
    extensions: Vec<String>,
    settings: toml::Table,
}

/// Reads `project.toml`-style manifests:
///
/// ```toml
/// files = ["main.txt", "lib/util.txt"]
/// include = ["src"]
/// extensions = ["txt"]
///
/// [settings]
/// strict = true
/// ```
///
/// `files` and `include` are relative to the manifest's directory. Every
/// file under an `include` directory is a root, filtered by `extensions`
/// when that list is non-empty.
#[derive(Clone, Debug, Default)]
pub struct TomlManifestParser;

impl TomlManifestParser {
    pub fn new() -> Self {
        Self
    }
}

impl ManifestParser for TomlManifestParser {
    fn parse(
        &self,
        manifest: &Path,
        fs: &dyn FileSystem,
        paths: &PathNormalizer,
    ) -> ManifestOutcome {
        let mut outcome = ManifestOutcome::default();

        let contents = match fs.read_to_string(manifest) {
            Ok(contents) => contents,
            Err(err) => {
                outcome.diagnostics.push(ManifestDiagnostic::error(
                    manifest,
                    format!("Failed to read manifest: {err}"),
                ));
                return outcome;
            }
        };

        let table = match toml::from_str::<toml::Table>(&contents) {
            Ok(table) => table,
            Err(err) => {
                outcome.diagnostics.push(ManifestDiagnostic::error(
                    manifest,
                    format!("Failed to parse manifest: {err}"),
                ));
                return outcome;
            }
        };

        for key in table.keys().filter(|key| !KNOWN_KEYS.contains(&key.as_str())) {
            outcome.diagnostics.push(ManifestDiagnostic::warning(
                manifest,
                format!("Unknown manifest key `{key}`"),
            ));
        }

        let raw = match toml::from_str::<RawManifest>(&contents) {
            Ok(raw) => raw,
            Err(err) => {
                outcome.diagnostics.push(ManifestDiagnostic::error(
                    manifest,
                    format!("Invalid manifest: {err}"),
                ));
                return outcome;
            }
        };

        let dir = manifest.parent().unwrap_or(Path::new("/"));
        let mut seen = HashSet::new();

        for file in &raw.files {
            let path = paths.resolve_in(dir, Path::new(file));
            if !fs.is_file(&path) {
                outcome.diagnostics.push(ManifestDiagnostic::warning(
                    manifest,
                    format!("Listed file does not exist: {}", path.display()),
                ));
                continue;
            }
            if seen.insert(path.clone()) {
                outcome.root_files.push(path);
            }
        }

        let manifest_path = paths.normalize(manifest);
        for include in &raw.include {
            let root = paths.resolve_in(dir, Path::new(include));
            if !fs.is_dir(&root) {
                outcome.diagnostics.push(ManifestDiagnostic::warning(
                    manifest,
                    format!("Included directory does not exist: {}", root.display()),
                ));
                continue;
            }
            for path in walk_files(fs, &root) {
                let path = paths.normalize(&path);
                if path == manifest_path || !matches_extension(&path, &raw.extensions) {
                    continue;
                }
                if seen.insert(path.clone()) {
                    outcome.root_files.push(path);
                }
            }
        }

        if outcome.root_files.is_empty() {
            outcome.diagnostics.push(ManifestDiagnostic::error(
                manifest,
                "Manifest does not list any existing files",
            ));
        }

        log::debug!(
            target: LOG_TARGET,
            "Parsed {}: {} root files, {} diagnostics",
            manifest.display(),
            outcome.root_files.len(),
            outcome.diagnostics.len()
        );

        outcome.settings = raw.settings;
        outcome
    }
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.') == ext)
        })
}

/// Every file below `dir`. A directory's own files come before those of
/// its subdirectories.
fn walk_files(fs: &dyn FileSystem, dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "Cannot list {}: {}", dir.display(), err);
                continue;
            }
        };
        let mut subdirs = Vec::new();
        for entry in entries {
            if fs.is_dir(&entry) {
                subdirs.push(entry);
            } else if fs.is_file(&entry) {
                files.push(entry);
            }
        }
        // Stack order: first subdirectory is walked first.
        pending.extend(subdirs.into_iter().rev());
    }
    files
}

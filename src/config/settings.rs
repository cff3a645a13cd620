use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};
use crate::text::DEFAULT_NODE_CAPACITY;

pub const DEFAULT_MANIFEST_NAME: &str = "project.toml";

/// Tuning knobs for the whole service.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// File names recognised as project manifests, in priority order.
    pub manifest_names: Vec<String>,
    pub case_sensitive_paths: bool,
    pub line_index: LineIndexConfig,
    pub version_cache: VersionCacheConfig,
    pub timing: TimingConfig,
    pub analysis: AnalysisConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            manifest_names: vec![DEFAULT_MANIFEST_NAME.to_string()],
            case_sensitive_paths: true,
            line_index: LineIndexConfig::default(),
            version_cache: VersionCacheConfig::default(),
            timing: TimingConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineIndexConfig {
    pub node_capacity: usize,
}

impl Default for LineIndexConfig {
    fn default() -> Self {
        Self {
            node_capacity: DEFAULT_NODE_CAPACITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionCacheConfig {
    /// Pending edits beyond this count are folded into a snapshot at once.
    pub change_count_threshold: usize,
    /// An edit deleting or inserting more chars than this is folded at once.
    pub change_length_threshold: usize,
    /// Snapshots retained for change queries.
    pub max_versions: usize,
}

impl Default for VersionCacheConfig {
    fn default() -> Self {
        Self {
            change_count_threshold: 8,
            change_length_threshold: 256,
            max_versions: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub edit_coalesce_ms: u64,
    pub structure_update_ms: u64,
    pub file_list_update_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            edit_coalesce_ms: 250,
            structure_update_ms: 1500,
            file_list_update_ms: 250,
        }
    }
}

impl TimingConfig {
    pub fn edit_coalesce(&self) -> Duration {
        Duration::from_millis(self.edit_coalesce_ms)
    }

    pub fn structure_update(&self) -> Duration {
        Duration::from_millis(self.structure_update_ms)
    }

    pub fn file_list_update(&self) -> Duration {
        Duration::from_millis(self.file_list_update_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Regex whose first capture group names a referenced file.
    pub reference_pattern: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_pattern: r#"(?m)^\s*(?:import|include|reference)\s+"([^"]+)""#.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(contents: &str) -> ServiceResult<Self> {
        toml::from_str(contents).map_err(|err| ServiceError::config(err.to_string()))
    }

    /// Replace unusable values with defaults, returning a message per fix.
    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = ServiceConfig::default();
        let mut fixes = Vec::new();

        if self.manifest_names.iter().all(|name| name.trim().is_empty()) {
            fixes.push("manifest_names is empty; using project.toml".to_string());
            self.manifest_names = defaults.manifest_names;
        }
        if self.line_index.node_capacity < 2 {
            fixes.push(format!(
                "line_index.node_capacity {} is below 2; using {}",
                self.line_index.node_capacity, defaults.line_index.node_capacity
            ));
            self.line_index.node_capacity = defaults.line_index.node_capacity;
        }
        if self.version_cache.max_versions == 0 {
            fixes.push(format!(
                "version_cache.max_versions must be at least 1; using {}",
                defaults.version_cache.max_versions
            ));
            self.version_cache.max_versions = defaults.version_cache.max_versions;
        }
        if let Err(err) = regex::Regex::new(&self.analysis.reference_pattern) {
            fixes.push(format!(
                "analysis.reference_pattern is not a valid regex ({err}); using default"
            ));
            self.analysis.reference_pattern = defaults.analysis.reference_pattern;
        }
        fixes
    }
}

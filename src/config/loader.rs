use std::fs;
use std::path::Path;

use super::settings::ServiceConfig;

pub const CONFIG_FILE_NAME: &str = "project-service.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigEventKind {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEvent {
    pub kind: ConfigEventKind,
    pub message: String,
}

impl ConfigEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ConfigEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: ConfigEventKind::Warning,
            message: message.into(),
        }
    }

    /// Forward the event to the `log` facade.
    pub fn log(&self) {
        match self.kind {
            ConfigEventKind::Info => {
                log::info!(target: "project_service::config", "{}", self.message)
            }
            ConfigEventKind::Warning => {
                log::warn!(target: "project_service::config", "{}", self.message)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigLoadOutcome {
    pub config: ServiceConfig,
    pub events: Vec<ConfigEvent>,
}

/// Load the service config from `path`.
///
/// Never fails: a missing or malformed file falls back to defaults and the
/// reason is reported through `events`.
pub fn load_config(path: &Path) -> ConfigLoadOutcome {
    let mut events = Vec::new();
    let mut config = read_config_file(path, &mut events).unwrap_or_default();

    for fix in config.sanitize() {
        events.push(ConfigEvent::warning(fix));
    }

    ConfigLoadOutcome { config, events }
}

fn read_config_file(path: &Path, events: &mut Vec<ConfigEvent>) -> Option<ServiceConfig> {
    if !path.exists() {
        events.push(ConfigEvent::info(format!(
            "No config file at {}; using defaults",
            path.display()
        )));
        return None;
    }

    events.push(ConfigEvent::info(format!(
        "Found config file: {}",
        path.display()
    )));

    match fs::read_to_string(path) {
        Ok(contents) => match ServiceConfig::from_toml_str(&contents) {
            Ok(config) => {
                events.push(ConfigEvent::info(format!(
                    "Successfully loaded {}",
                    path.display()
                )));
                Some(config)
            }
            Err(err) => {
                events.push(ConfigEvent::warning(format!(
                    "Failed to parse {}: {}",
                    path.display(),
                    err
                )));
                None
            }
        },
        Err(err) => {
            events.push(ConfigEvent::warning(format!(
                "Failed to read {}: {}",
                path.display(),
                err
            )));
            None
        }
    }
}

mod loader;
pub mod settings;

pub use loader::{CONFIG_FILE_NAME, ConfigEvent, ConfigEventKind, ConfigLoadOutcome, load_config};
pub use settings::{
    AnalysisConfig, DEFAULT_MANIFEST_NAME, LineIndexConfig, ServiceConfig, TimingConfig,
    VersionCacheConfig,
};

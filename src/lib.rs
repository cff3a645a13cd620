pub mod analysis;
pub mod config;
pub mod document;
pub mod driver;
pub mod error;
pub mod host;
pub mod manifest;
pub mod project;
pub mod registry;
pub mod scheduler;
pub mod text;

pub use config::{ServiceConfig, load_config};
pub use document::{ChangeRange, Snapshot, TextChange};
pub use driver::{DriverHandle, RegistryDriver};
pub use error::{ServiceError, ServiceResult};
pub use host::{FileEvent, FileEventKind, FileSystem, MemoryFileSystem, OsFileSystem};
pub use project::{Project, ProjectId, ProjectKind};
pub use registry::{ProjectRegistry, RegistryBuilder, RegistryEvent, TextEdit};
pub use text::{LineIndex, Position, Range};

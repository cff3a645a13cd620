//! Everything the service needs from its environment.
//!
//! The registry never touches `std::fs` directly; it goes through a
//! [`FileSystem`], so embedders and tests can substitute their own.

mod event;
mod fs;
mod memory;
mod paths;
mod watch;

pub use event::{FileEvent, FileEventKind};
pub use fs::{FileSystem, OsFileSystem};
pub use memory::MemoryFileSystem;
pub use paths::{PathNormalizer, ancestors_of};
pub use watch::{WatchId, WatchTable, WatchTarget};

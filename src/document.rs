//! Documents and their version history.

pub mod change;
pub mod store;
pub mod version_cache;

pub(crate) mod model;

pub use change::{ChangeRange, TextChange, TextChangeRange, apply_changes};
pub use model::Document;
pub use store::{DocumentHandle, DocumentStore};
pub use version_cache::{Snapshot, VersionCache};

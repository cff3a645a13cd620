//! Project membership analysis.
//!
//! Deciding which files belong to a project is delegated to an
//! [`AnalysisEngine`]; the service only needs the transitive file set.

mod references;
mod traits;

pub use references::ReferenceScanner;
pub use traits::{AnalysisEngine, SourceProvider};

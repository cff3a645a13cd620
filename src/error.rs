//! Error handling types for the project service.
//!
//! Input errors (bad ranges, unknown documents) are returned synchronously.
//! Configuration problems are surfaced as diagnostics and never reach this
//! type; see [`crate::manifest`] and [`crate::config`].

use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No document is tracked under this path
    #[error("Document not found: {}", path.display())]
    DocumentNotFound { path: PathBuf },

    /// Edits require the document to be open in the editor
    #[error("Document is not open for editing: {}", path.display())]
    DocumentNotEditable { path: PathBuf },

    /// Edit extends past the end of the (projected) document
    #[error("Edit out of range: {start}+{delete_len} exceeds document length {len}")]
    EditOutOfRange {
        start: usize,
        delete_len: usize,
        len: usize,
    },

    /// Range endpoints are inverted or not addressable
    #[error("Invalid range: {message}")]
    InvalidRange { message: String },

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Helper trait to convert PoisonError into a recovered guard.
pub trait LockResultExt<T> {
    /// Recover the guard from a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "project_service::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

impl ServiceError {
    pub fn document_not_found(path: &Path) -> Self {
        ServiceError::DocumentNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn document_not_editable(path: &Path) -> Self {
        ServiceError::DocumentNotEditable {
            path: path.to_path_buf(),
        }
    }

    pub fn edit_out_of_range(start: usize, delete_len: usize, len: usize) -> Self {
        ServiceError::EditOutOfRange {
            start,
            delete_len,
            len,
        }
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        ServiceError::InvalidRange {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ServiceError::Config {
            message: message.into(),
        }
    }
}

//! Error types for the reorder engine

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reorder operations
pub type Result<T> = std::result::Result<T, ReorderError>;

/// Errors that can occur in reorder operations
#[derive(Debug, Error)]
pub enum ReorderError {
    /// Board not initialized at the given path
    #[error("board not initialized at {path}")]
    NotInitialized { path: PathBuf },

    /// Board already exists
    #[error("board already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// Board is not loaded locally or does not exist remotely
    #[error("board not found: {id}")]
    BoardNotFound { id: String },

    /// Container (list) not found
    #[error("list not found: {id}")]
    ContainerNotFound { id: String },

    /// Item (card) not found
    #[error("card not found: {id}")]
    ItemNotFound { id: String },

    /// Id that cannot be used as a file name
    #[error("invalid id '{id}': ids must be non-empty and may not contain '/', '\\' or '..'")]
    InvalidId { id: String },

    /// Duplicate ID
    #[error("duplicate {item_type} ID: {id}")]
    DuplicateId { item_type: String, id: String },

    /// The remote store refused the write
    #[error("write rejected: {message}")]
    Rejected { message: String },

    /// The remote store could not be reached
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// A drag is in progress and the operation needs an idle session
    #[error("a drag is already in progress")]
    DragInProgress,

    /// Lock is held by another process
    #[error("lock busy - another operation in progress")]
    LockBusy,

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReorderError {
    /// Create a rejected-write error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an unavailable-store error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a duplicate ID error
    pub fn duplicate_id(item_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            item_type: item_type.into(),
            id: id.into(),
        }
    }

    /// Check if this is a failure the user can simply try again after.
    ///
    /// The engine itself never retries; callers use this to word the notice.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::Unavailable { .. } | Self::LockBusy | Self::Io(_)
        )
    }
}

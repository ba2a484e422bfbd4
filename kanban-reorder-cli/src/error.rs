//! Errors reported by CLI commands

use kanban_reorder::{CancelReason, ReorderError};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Reorder(#[from] ReorderError),

    /// The write failed and the local change was undone
    #[error("move rolled back: {reason}")]
    RolledBack { reason: String },

    #[error("move cancelled: {reason:?}")]
    Cancelled { reason: CancelReason },

    #[error("invalid script {path}: {message}")]
    Script { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn script(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Script {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

//! Error type shared by the task model, the store and the manager.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid date '{0}': use YYYY-MM-DD, an RFC 3339 timestamp, or today/tomorrow/in Nd")]
    InvalidDate(String),

    #[error("invalid priority '{0}': expected low, medium, high, urgent or 1-4")]
    InvalidPriority(String),

    #[error("invalid status '{0}': expected todo, in-progress, review or done")]
    InvalidStatus(String),

    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("limit cannot be negative (got {0})")]
    NegativeLimit(i64),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode tasks: {0}")]
    Json(#[from] serde_json::Error),
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io { path: path.into(), source }
    }

    /// Whether the error is a rejected input rather than an environment failure.
    pub fn is_validation(&self) -> bool {
        !matches!(self, TaskError::Io { .. } | TaskError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;

//! Error types for nbindex.
//!
//! Library crates use [`NbIndexError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all nbindex operations.
#[derive(Debug, thiserror::Error)]
pub enum NbIndexError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTTP error while talking to the search backend.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or pattern parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Archive database error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A single notebook could not be processed.
    #[error("failed to process notebook {path}: {message}")]
    Notebook { path: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NbIndexError>;

impl NbIndexError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach a notebook path to a failure.
    pub fn notebook(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Notebook {
            path: path.into(),
            message: msg.into(),
        }
    }
}

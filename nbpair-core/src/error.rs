//! Error types for nbpair-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from reading notebooks and configuration.
#[derive(Debug, Error)]
pub enum NotebookError {
    /// I/O failure, with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed notebook JSON.
    #[error("invalid notebook JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Only nbformat 4 notebooks are supported.
    #[error("unsupported nbformat version {major}.{minor}; only version 4 is supported")]
    UnsupportedVersion { major: u64, minor: u64 },

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration at {path}: {message}")]
    Config { path: PathBuf, message: String },
}

/// Convenience constructor for [`NotebookError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> NotebookError {
    NotebookError::Io {
        path: path.into(),
        source,
    }
}

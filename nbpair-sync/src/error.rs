//! Error types for nbpair-sync.

use std::path::PathBuf;

use thiserror::Error;

use nbpair_core::NotebookError;
use nbpair_formats::FormatError;

/// All errors that can arise from sync and conversion runs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the format layer (parsing, pairing, conversion).
    #[error(transparent)]
    Format(#[from] FormatError),

    /// An error from the notebook model or configuration.
    #[error(transparent)]
    Notebook(#[from] NotebookError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A git command exited with a failure status.
    #[error("git {args} failed: {stderr}")]
    Git { args: String, stderr: String },

    /// A `--pipe` or `--check` command exited with a failure status.
    #[error("command '{command}' failed{}: {stderr}", exit_suffix(*.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The notebook's pairing does not include the file's own format.
    #[error("{path} does not match any of the paired formats '{formats}'")]
    NotInFormats { path: PathBuf, formats: String },
}

fn exit_suffix(code: Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => " (terminated by a signal)".to_string(),
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

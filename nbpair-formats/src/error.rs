//! Error types for nbpair-formats.

use std::path::PathBuf;

use thiserror::Error;

use nbpair_core::NotebookError;

/// All errors that can arise from format parsing, pairing, and conversion.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A format string (`py:light`, `notebooks///ipynb`, …) is malformed.
    #[error("invalid format '{format}': {reason}")]
    InvalidFormat { format: String, reason: String },

    /// A path does not fit the format it is supposed to follow.
    #[error("{path} is not consistent with format '{format}': {reason}")]
    InconsistentPath {
        path: PathBuf,
        format: String,
        reason: String,
    },

    /// The YAML header of a text notebook could not be parsed or written.
    #[error("invalid notebook header: {0}")]
    Header(#[from] serde_yaml::Error),

    /// Cell metadata written inline in a text notebook is not a JSON object.
    #[error("invalid cell metadata on line {line}: {reason}")]
    CellMetadata { line: usize, reason: String },

    /// An error from the notebook model.
    #[error(transparent)]
    Notebook(#[from] NotebookError),
}

pub(crate) fn invalid_format(format: &str, reason: impl Into<String>) -> FormatError {
    FormatError::InvalidFormat {
        format: format.to_string(),
        reason: reason.into(),
    }
}

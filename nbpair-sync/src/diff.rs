//! Unified diffs for `--diff` and `--test`.

use std::path::{Path, PathBuf};

use similar::TextDiff;

use crate::writer::{normalize_line_endings, read_existing};
use crate::SyncError;

/// A single file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Unified diff of `old` against `new`, labelled with `path`. `None` when
/// the two texts are equal.
pub fn diff_text(path: &Path, old: &str, new: &str) -> Option<String> {
    let old = normalize_line_endings(old);
    let new = normalize_line_endings(new);
    if old == new {
        return None;
    }
    let old_header = format!("a/{}", path.display());
    let new_header = format!("b/{}", path.display());
    Some(
        TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string(),
    )
}

/// Compare what would be written to `path` with its current content.
/// A missing file compares as empty.
pub fn diff_file(path: &Path, new: &str) -> Result<Option<FileDiff>, SyncError> {
    let existing = read_existing(path)?.unwrap_or_default();
    Ok(diff_text(path, &existing, new).map(|unified_diff| FileDiff {
        path: path.to_path_buf(),
        unified_diff,
    }))
}

//! Paired paths.
//!
//! Every file of a pairing is derived from one *base*: the notebook path with
//! its format's prefix, suffix and extension removed.
//!
//! ```text
//! formats = "notebooks///ipynb,scripts///py:percent"
//!
//! /repo/notebooks/a/b/nb.ipynb
//!       └ root ┘ prefix └subdir┘ stem
//! base  = { root: /repo, subdir: a/b, stem: nb }
//! py    = /repo/scripts/a/b/nb.py
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::FormatError;
use crate::format::FormatSpec;

/// A notebook path with prefix, suffix and extension removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath {
    /// Directory the format prefixes are relative to.
    pub root: PathBuf,
    /// Sub-folders below a tree prefix root; empty otherwise.
    pub subdir: PathBuf,
    pub stem: String,
}

/// One member of a resolved pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedFile {
    pub path: PathBuf,
    pub format: FormatSpec,
}

impl fmt::Display for PairedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.format)
    }
}

/// Strip `fmt`'s suffix, extension and prefix from `path`.
pub fn base_path(path: &Path, fmt: &FormatSpec) -> Result<BasePath, FormatError> {
    let inconsistent = |reason: String| FormatError::InconsistentPath {
        path: path.to_path_buf(),
        format: fmt.to_string(),
        reason,
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| inconsistent("path has no file name".into()))?;
    let ending = fmt.file_ending();
    let stem = file_name
        .strip_suffix(ending.as_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| inconsistent(format!("file name does not end with '{ending}'")))?;

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let prefix: PathBuf = fmt.prefix.iter().collect();
    let depth = fmt.prefix.len();

    let (root, subdir) = if depth == 0 {
        (dir.to_path_buf(), PathBuf::new())
    } else if fmt.tree {
        let anchor = dir
            .ancestors()
            .find(|ancestor| ancestor.ends_with(&prefix))
            .ok_or_else(|| {
                inconsistent(format!("no '{}' folder above the file", prefix.display()))
            })?;
        let subdir = dir
            .strip_prefix(anchor)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        (pop_components(anchor, depth), subdir)
    } else {
        if !dir.ends_with(&prefix) {
            return Err(inconsistent(format!(
                "file is not in a '{}' folder",
                prefix.display()
            )));
        }
        (pop_components(dir, depth), PathBuf::new())
    };

    Ok(BasePath {
        root,
        subdir,
        stem: stem.to_string(),
    })
}

fn pop_components(path: &Path, count: usize) -> PathBuf {
    let mut out = path.to_path_buf();
    for _ in 0..count {
        out.pop();
    }
    out
}

/// The path of the file in format `fmt` for this base.
pub fn full_path(base: &BasePath, fmt: &FormatSpec) -> PathBuf {
    let mut path = base.root.clone();
    path.extend(&fmt.prefix);
    if !base.subdir.as_os_str().is_empty() {
        path.push(&base.subdir);
    }
    path.push(format!("{}{}", base.stem, fmt.file_ending()));
    path
}

/// The first format of the list that `path` fits.
pub fn find_format<'a>(path: &Path, formats: &'a [FormatSpec]) -> Option<&'a FormatSpec> {
    formats.iter().find(|fmt| base_path(path, fmt).is_ok())
}

/// Every paired file of the notebook at `path` (in format `fmt`), in the
/// order of `formats`.
pub fn paired_paths(
    path: &Path,
    fmt: &FormatSpec,
    formats: &[FormatSpec],
) -> Result<Vec<PairedFile>, FormatError> {
    if !formats.iter().any(|f| f.same_location(fmt)) {
        return Err(FormatError::InconsistentPath {
            path: path.to_path_buf(),
            format: fmt.to_string(),
            reason: format!(
                "format is not one of the paired formats '{}'",
                crate::format::formats_to_string(formats)
            ),
        });
    }
    let base = base_path(path, fmt)?;
    Ok(formats
        .iter()
        .map(|f| PairedFile {
            path: full_path(&base, f),
            format: f.clone(),
        })
        .collect())
}

/// [`find_format`] followed by [`paired_paths`].
///
/// Returns `Ok(None)` when `path` fits none of the formats.
pub fn resolve_pairing(
    path: &Path,
    formats: &[FormatSpec],
) -> Result<Option<(FormatSpec, Vec<PairedFile>)>, FormatError> {
    let Some(fmt) = find_format(path, formats) else {
        return Ok(None);
    };
    let paired = paired_paths(path, fmt, formats)?;
    Ok(Some((fmt.clone(), paired)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

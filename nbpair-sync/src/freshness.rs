//! Which paired file holds the latest edits.
//!
//! There is no sync state on disk: the most recently modified member of a
//! pairing provides the cells (the *inputs*), and the `.ipynb` member, when
//! it exists, provides outputs and notebook metadata (the *outputs*).
//!
//! Signal precedence:
//! 1. `Missing` (no paired file exists)
//! 2. `Stale` (some paired file would be rewritten)
//! 3. `Current`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use nbpair_formats::{FormatSpec, PairedFile};

use crate::error::{io_err, SyncError};
use crate::writer::read_existing;

/// A paired file that exists, with its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: FormatSpec,
    pub modified: DateTime<Utc>,
}

/// The files a sync reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSources {
    /// Newest paired file; its cells win.
    pub inputs: SourceFile,
    /// The `.ipynb` member, if it exists.
    pub outputs: Option<SourceFile>,
}

/// Freshness of a pairing against what a sync would write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreshnessSignal {
    Missing,
    Current,
    Stale { files: Vec<PathBuf> },
}

/// Pick the inputs and outputs files of a pairing. `None` when no paired
/// file exists. Ties on modification time go to the earlier file in `paired`.
pub fn latest_inputs_and_outputs(paired: &[PairedFile]) -> Result<Option<SyncSources>, SyncError> {
    let mut inputs: Option<SourceFile> = None;
    let mut outputs = None;

    for file in paired {
        let Some(modified) = modification_time(&file.path)? else {
            tracing::debug!("not found: {}", file.path.display());
            continue;
        };
        let source = SourceFile {
            path: file.path.clone(),
            format: file.format.clone(),
            modified,
        };
        if outputs.is_none() && source.format.is_ipynb() {
            outputs = Some(source.clone());
        }
        if inputs.as_ref().map_or(true, |newest| source.modified > newest.modified) {
            inputs = Some(source);
        }
    }

    Ok(inputs.map(|inputs| {
        tracing::debug!(
            "inputs: {} (modified {} ago)",
            inputs.path.display(),
            format_datetime_age(inputs.modified)
        );
        SyncSources { inputs, outputs }
    }))
}

/// Compare rendered contents with the files on disk.
pub fn check(rendered: &[(PathBuf, String)]) -> Result<FreshnessSignal, SyncError> {
    let mut present = 0;
    let mut stale = Vec::new();
    for (path, content) in rendered {
        match read_existing(path)? {
            Some(existing) => {
                present += 1;
                if existing != content.replace("\r\n", "\n") {
                    stale.push(path.clone());
                }
            }
            None => stale.push(path.clone()),
        }
    }

    if present == 0 {
        return Ok(FreshnessSignal::Missing);
    }
    if !stale.is_empty() {
        stale.sort();
        stale.dedup();
        return Ok(FreshnessSignal::Stale { files: stale });
    }
    Ok(FreshnessSignal::Current)
}

/// Format age from a chrono timestamp.
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn modification_time(path: &Path) -> Result<Option<DateTime<Utc>>, SyncError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    let modified: SystemTime = meta.modified().map_err(|e| io_err(path, e))?;
    Ok(Some(modified.into()))
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn ages_are_compact() {
        assert_eq!(format_seconds(5), "5s");
        assert_eq!(format_seconds(65), "1m");
        assert_eq!(format_seconds(2 * 3600), "2h");
        assert_eq!(format_seconds(3 * 86400), "3d");
        assert_eq!(format_datetime_age(Utc::now()), "0s");
    }

    #[test]
    fn missing_when_nothing_exists() {
        let tmp = TempDir::new().unwrap();
        let rendered = vec![(tmp.path().join("nb.py"), "x = 1\n".to_string())];
        assert_eq!(check(&rendered).unwrap(), FreshnessSignal::Missing);
    }

    #[test]
    fn current_and_stale() {
        let tmp = TempDir::new().unwrap();
        let py = tmp.path().join("nb.py");
        let md = tmp.path().join("nb.md");
        fs::write(&py, "x = 1\n").unwrap();
        fs::write(&md, "old\n").unwrap();

        let rendered = vec![(py.clone(), "x = 1\n".to_string())];
        assert_eq!(check(&rendered).unwrap(), FreshnessSignal::Current);

        let rendered = vec![(py, "x = 1\n".to_string()), (md.clone(), "new\n".to_string())];
        assert_eq!(
            check(&rendered).unwrap(),
            FreshnessSignal::Stale { files: vec![md] }
        );
    }
}

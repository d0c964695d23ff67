//! Content-gated atomic writes.
//!
//! A paired file is only rewritten when its rendered content differs from
//! what is on disk. Unchanged files keep their modification time.
//!
//! 1. Normalise line endings to LF.
//! 2. Compare with the current file; skip if identical.
//! 3. Write to `<path>.nbpair.tmp`.
//! 4. Rename over the target (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// WriteResult
// ---------------------------------------------------------------------------

/// What happened to one paired file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// New or different content is now on disk.
    Written { path: PathBuf },
    /// On-disk content already matched; the mtime is untouched.
    Unchanged { path: PathBuf },
    /// Dry run: the content differs but nothing was written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }

    /// `true` unless the file was left as it was.
    pub fn changed(&self) -> bool {
        !matches!(self, WriteResult::Unchanged { .. })
    }
}

// ---------------------------------------------------------------------------
// write_if_changed
// ---------------------------------------------------------------------------

/// Atomically write `content` to `path` unless the file already holds it.
pub fn write_if_changed(path: &Path, content: &str, dry_run: bool) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.nbpair.tmp", path.display()));
    write_if_changed_with_tmp(path, content, dry_run, &tmp)
}

fn write_if_changed_with_tmp(
    path: &Path,
    content: &str,
    dry_run: bool,
    tmp: &Path,
) -> Result<WriteResult, SyncError> {
    let normalized = normalize_line_endings(content);
    let content = normalized.as_str();

    if let Some(existing) = read_existing(path)? {
        if existing == content {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Current content of `path` with LF line endings, `None` if it does not exist.
pub(crate) fn read_existing(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(normalize_line_endings(&content))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

pub(crate) fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) -> WriteResult {
        write_if_changed(path, content, false).unwrap()
    }

    #[test]
    fn missing_file_is_created() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notebook.py");
        let result = write(&path, "x = 1\n");
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");
    }

    #[test]
    fn same_content_is_unchanged_and_keeps_mtime() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notebook.md");
        write(&path, "same content\n");
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(50));
        let result = write(&path, "same content\n");
        assert!(matches!(result, WriteResult::Unchanged { .. }));
        assert!(!result.changed());
        let after = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(before, after, "an unchanged file must not be rewritten");
    }

    #[test]
    fn different_content_is_rewritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notebook.py");
        write(&path, "v1\n");
        let result = write(&path, "v2\n");
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(result.path(), path.as_path());
    }

    #[test]
    fn dry_run_leaves_missing_file_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.py");
        let result = write_if_changed(&path, "content", true).unwrap();
        assert!(matches!(result, WriteResult::WouldWrite { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn no_temporary_file_is_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.py");
        write(&path, "data");
        let tmp_path = PathBuf::from(format!("{}.nbpair.tmp", path.display()));
        assert!(!tmp_path.exists(), ".nbpair.tmp must be cleaned up");
    }

    #[test]
    fn prefix_folders_are_created() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scripts").join("nested").join("nb.py");
        write(&path, "content");
        assert!(path.exists());
    }

    #[test]
    fn crlf_on_disk_matches_lf_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("windows.py");
        fs::write(&path, "line1\r\nline2\r\n").unwrap();

        let result = write(&path, "line1\nline2\n");
        assert!(matches!(result, WriteResult::Unchanged { .. }));

        let result = write(&path, "line1\r\nline3\r\n");
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\nline3\n");
    }

    #[test]
    #[cfg(unix)]
    fn failed_rename_keeps_the_old_content() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("locked");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("nb.py");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let scratch = TempDir::new().unwrap();
        let tmp_path = scratch.path().join("nb.py.nbpair.tmp");

        let result = write_if_changed_with_tmp(&path, "new content", false, &tmp_path);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Running as root bypasses directory permissions.
        if result.is_ok() {
            return;
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert!(!tmp_path.exists(), ".nbpair.tmp should be cleaned up");
    }
}

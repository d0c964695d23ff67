//! Thin wrapper over the `git` command line, for pre-commit hooks.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{io_err, SyncError};

fn run_git(dir: &Path, args: &[&str]) -> Result<Output, SyncError> {
    tracing::debug!("git {} (in {})", args.join(" "), dir.display());
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| io_err("git", e))
}

/// Run git and return its stdout, failing on a non-zero status.
fn git_stdout(dir: &Path, args: &[&str]) -> Result<String, SyncError> {
    let output = run_git(dir, args)?;
    if !output.status.success() {
        return Err(SyncError::Git {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Directory git runs in to inspect `path`, and the name to pass it.
fn split(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf());
    (dir, name)
}

/// Top-level directory of the repository containing `dir`, if any.
pub fn repo_root(dir: &Path) -> Result<Option<PathBuf>, SyncError> {
    let output = run_git(dir, &["rev-parse", "--show-toplevel"])?;
    if !output.status.success() {
        return Ok(None);
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!root.is_empty()).then(|| PathBuf::from(root)))
}

/// Files added or modified in the index, as paths under `root`. Deleted
/// files are left out.
pub fn staged_files(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let stdout = git_stdout(
        root,
        &["diff", "--name-only", "--cached", "--diff-filter=d", "-z"],
    )?;
    Ok(stdout
        .split('\0')
        .filter(|name| !name.is_empty())
        .map(|name| root.join(name))
        .collect())
}

/// Stage `paths` in the repository at `root`.
pub fn add(root: &Path, paths: &[PathBuf]) -> Result<(), SyncError> {
    if paths.is_empty() {
        return Ok(());
    }
    let mut args = vec!["add".to_string(), "--".to_string()];
    args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    git_stdout(root, &args)?;
    tracing::info!("staged {} file(s)", paths.len());
    Ok(())
}

/// `true` when `path` exists but is neither tracked nor ignored. Always
/// `false` outside a git repository.
pub fn is_untracked(path: &Path) -> Result<bool, SyncError> {
    let (dir, name) = split(path);
    let name = name.to_string_lossy();
    let output = run_git(&dir, &["ls-files", "--others", "--exclude-standard", "--", &name])?;
    if !output.status.success() {
        return Ok(false);
    }
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
}

/// `true` when the working copy of `path` differs from the index.
pub fn has_unstaged_changes(path: &Path) -> Result<bool, SyncError> {
    let (dir, name) = split(path);
    let name = name.to_string_lossy();
    let output = run_git(&dir, &["diff", "--name-only", "--", &name])?;
    if !output.status.success() {
        return Ok(false);
    }
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .expect("git");
        assert!(status.success(), "git {args:?}");
    }

    fn init_repo() -> TempDir {
        let tmp = TempDir::new().unwrap();
        git(tmp.path(), &["init", "--quiet"]);
        git(tmp.path(), &["config", "user.name", "nbpair tests"]);
        git(tmp.path(), &["config", "user.email", "tests@example.com"]);
        tmp
    }

    #[test]
    fn untracked_until_added() {
        let repo = init_repo();
        let path = repo.path().join("test.py");
        fs::write(&path, "x = 1\n").unwrap();
        assert!(is_untracked(&path).unwrap());

        git(repo.path(), &["add", "test.py"]);
        assert!(!is_untracked(&path).unwrap());

        git(repo.path(), &["commit", "--quiet", "-m", "add test.py"]);
        assert!(!is_untracked(&path).unwrap());
    }

    #[test]
    fn outside_a_repository() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.py");
        fs::write(&path, "x = 1\n").unwrap();
        assert!(!is_untracked(&path).unwrap());
        assert!(!has_unstaged_changes(&path).unwrap());
    }

    #[test]
    fn staged_files_and_unstaged_changes() {
        let repo = init_repo();
        let root = repo_root(repo.path()).unwrap().expect("root");
        fs::write(root.join("a b.ipynb"), "{}").unwrap();
        fs::write(root.join("c.py"), "x = 1\n").unwrap();
        add(&root, &[root.join("a b.ipynb"), root.join("c.py")]).unwrap();

        let mut staged = staged_files(&root).unwrap();
        staged.sort();
        assert_eq!(staged, vec![root.join("a b.ipynb"), root.join("c.py")]);

        assert!(!has_unstaged_changes(&root.join("c.py")).unwrap());
        fs::write(root.join("c.py"), "x = 2\n").unwrap();
        assert!(has_unstaged_changes(&root.join("c.py")).unwrap());
    }
}

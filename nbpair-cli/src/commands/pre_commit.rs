//! Git hook support: staged inputs, staging outputs, and the checks that make
//! a hook fail.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use nbpair_formats::{base_path, is_notebook_extension};
use nbpair_sync::{git, Report, WriteResult};

use super::{display_path, Mode, RunStatus, Session};

/// Staged files the hook should act on, with the repository root.
pub fn staged_notebooks(session: &Session) -> Result<(PathBuf, Vec<PathBuf>)> {
    let cwd = std::env::current_dir().context("could not determine the current directory")?;
    let root = git::repo_root(&cwd)?
        .context("--pre-commit needs to run inside a git repository")?;
    let staged = git::staged_files(&root).context("could not list staged files")?;

    let notebooks: Vec<PathBuf> = staged
        .into_iter()
        .filter(|path| is_candidate(path, session))
        .collect();
    tracing::debug!("{} staged notebook(s)", notebooks.len());
    Ok((root, notebooks))
}

fn is_candidate(path: &Path, session: &Session) -> bool {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !is_notebook_extension(extension) || !path.is_file() {
        return false;
    }
    if let Some(from) = &session.convert.from {
        return base_path(path, from).is_ok();
    }
    // Files already in the destination format are outputs, not inputs.
    match (&session.mode, &session.convert.to) {
        (Mode::Convert, Some(to)) => to.extension != extension,
        _ => true,
    }
}

/// `git add` every file written by this run.
pub fn stage_written(reports: &[Report], root: Option<&Path>) -> Result<()> {
    let written: Vec<PathBuf> = reports
        .iter()
        .flat_map(Report::written)
        .map(Path::to_path_buf)
        .collect();
    if written.is_empty() {
        return Ok(());
    }

    let root = match root {
        Some(root) => root.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().context("could not determine the current directory")?;
            git::repo_root(&cwd)?.context("--pre-commit needs to run inside a git repository")?
        }
    };
    git::add(&root, &written).context("could not stage the written files")?;
    Ok(())
}

/// Fail on written files under `--pre-commit-mode`, on files that differ
/// from the index, and on untracked outputs under `--alert-untracked`.
pub fn check_outputs(reports: &[Report], session: &Session) -> Result<RunStatus> {
    let cwd = std::env::current_dir().ok();
    let mut status = RunStatus::Success;

    for report in reports {
        for file in &report.files {
            let path = file.path();
            let shown = display_path(path, cwd.as_deref());

            let problem = if session.pre_commit_mode
                && matches!(file.result, WriteResult::Written { .. })
            {
                Some(format!("{} was modified by nbpair", shown.display()))
            } else if session.alert_untracked && git::is_untracked(path)? {
                Some(format!(
                    "{} is not tracked by git (run 'git add {}')",
                    shown.display(),
                    shown.display()
                ))
            } else if session.pre_commit_mode && git::has_unstaged_changes(path)? {
                Some(format!(
                    "{} has changes that are not staged (run 'git add {}')",
                    shown.display(),
                    shown.display()
                ))
            } else {
                None
            };

            if let Some(problem) = problem {
                eprintln!("{} {problem}", "error:".red().bold());
                status = RunStatus::Failed;
            }
        }
    }
    Ok(status)
}

//! Command modes. One invocation runs exactly one of them over its notebooks.

pub mod convert;
pub mod paired;
pub mod pre_commit;
pub mod sync;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use colored::Colorize;

use nbpair_formats::FormatSpec;
use nbpair_sync::{ConvertOptions, FileChange, Report, SyncOptions, WriteResult};

use crate::Cli;

/// What an invocation does with each notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    PairedPaths,
    Test(FormatSpec),
    Convert,
    Sync,
}

impl Mode {
    fn of(cli: &Cli) -> Result<Self> {
        if cli.paired_paths {
            return Ok(Mode::PairedPaths);
        }
        if cli.test {
            if let Some(to) = &cli.to {
                return Ok(Mode::Test(to.clone()));
            }
        }
        if cli.to.is_some() {
            return Ok(Mode::Convert);
        }
        if cli.sync || cli.set_formats.is_some() {
            return Ok(Mode::Sync);
        }
        if !cli.pipe.is_empty() || !cli.check.is_empty() {
            return Ok(Mode::Convert);
        }
        bail!("nothing to do: use --to, --sync, --set-formats, --pipe, --check or --paired-paths")
    }
}

/// Overall result of a run, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// A check, alert or round-trip test failed; messages were printed.
    Failed,
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::Failed => ExitCode::FAILURE,
        }
    }
}

/// Settings shared by every mode.
pub struct Session {
    pub mode: Mode,
    pub convert: ConvertOptions,
    pub quiet: bool,
    pub pre_commit: bool,
    pub pre_commit_mode: bool,
    pub alert_untracked: bool,
}

impl Session {
    fn new(cli: &Cli, mode: Mode) -> Self {
        let sync = SyncOptions {
            dry_run: cli.dry_run,
            diff: cli.diff,
            update: cli.update,
            set_formats: cli.set_formats.clone(),
            pipe: cli.pipe.clone(),
            check: cli.check.clone(),
            pipe_fmt: cli.pipe_fmt.clone(),
            warn_only: cli.warn_only,
            user_config_dir: nbpair_core::config::user_config_dir(),
        };
        Self {
            mode,
            convert: ConvertOptions {
                from: cli.from.clone(),
                to: cli.to.clone(),
                output: cli.output.clone(),
                ignore_unmatched: cli.ignore_unmatched,
                sync,
            },
            quiet: cli.quiet,
            pre_commit: cli.pre_commit,
            pre_commit_mode: cli.pre_commit_mode,
            alert_untracked: cli.alert_untracked || cli.pre_commit_mode,
        }
    }

    pub fn sync_options(&self) -> &SyncOptions {
        &self.convert.sync
    }

    fn writes_files(&self) -> bool {
        !(self.convert.sync.dry_run || self.convert.sync.diff)
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(cli: Cli) -> Result<RunStatus> {
    let mode = Mode::of(&cli)?;
    let session = Session::new(&cli, mode);
    let hook = session.pre_commit || session.pre_commit_mode;

    let (repo_root, notebooks) = if hook && cli.notebooks.is_empty() {
        let (root, staged) = pre_commit::staged_notebooks(&session)?;
        (Some(root), staged)
    } else {
        if cli.notebooks.is_empty() {
            bail!("no notebooks given");
        }
        (None, cli.notebooks.clone())
    };

    let mut reports = Vec::new();
    let mut status = RunStatus::Success;
    for notebook in &notebooks {
        if notebook == Path::new("-") {
            convert::run_stdin(&session)?;
            continue;
        }
        let outcome = match &session.mode {
            Mode::PairedPaths => {
                paired::run(notebook, &session)?;
                None
            }
            Mode::Test(to) => {
                if convert::run_test(notebook, to, &session)? == RunStatus::Failed {
                    status = RunStatus::Failed;
                }
                None
            }
            Mode::Convert => convert::run(notebook, &session)?,
            Mode::Sync => sync::run(notebook, &session)?,
        };
        reports.extend(outcome);
    }

    for report in &reports {
        for warning in &report.warnings {
            eprintln!("{} {}: {warning}", "warning:".yellow().bold(), report.path.display());
        }
    }

    if session.writes_files() {
        if session.pre_commit && !session.pre_commit_mode {
            pre_commit::stage_written(&reports, repo_root.as_deref())?;
        }
        if session.alert_untracked
            && pre_commit::check_outputs(&reports, &session)? == RunStatus::Failed
        {
            status = RunStatus::Failed;
        }
    }

    Ok(status)
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

pub fn print_report(verb: &str, report: &Report, session: &Session) {
    let diffs: Vec<&str> = report
        .files
        .iter()
        .filter_map(|f| f.diff.as_deref())
        .collect();
    for diff in &diffs {
        print!("{diff}");
        if !diff.ends_with('\n') {
            println!();
        }
    }
    if session.quiet || !diffs.is_empty() {
        return;
    }

    let prefix = if session.convert.sync.dry_run { "[dry-run] " } else { "" };
    let name = report.path.display();
    let (changed, unchanged): (Vec<&FileChange>, Vec<&FileChange>) =
        report.files.iter().partition(|f| f.result.changed());
    if changed.is_empty() {
        println!("{prefix}✓ {name} — nothing to do");
        return;
    }

    println!(
        "{prefix}✓ {name} {verb} ({} written, {} unchanged)",
        changed.len(),
        unchanged.len()
    );
    for file in &report.files {
        match &file.result {
            WriteResult::Written { path } => println!("  ✎  {}", path.display()),
            WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
            WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
        }
    }
}

/// `path` relative to `base` when it lies below it.
pub fn display_path(path: &Path, base: Option<&Path>) -> PathBuf {
    base.and_then(|base| path.strip_prefix(base).ok())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

//! nbpair: keep Jupyter notebooks and their text versions in sync.
//!
//! # Usage
//!
//! ```text
//! nbpair --to py:percent notebook.ipynb          convert
//! nbpair --set-formats ipynb,md notebook.ipynb   pair and write the paired files
//! nbpair --sync notebook.md                      update the pairing from the newest file
//! nbpair --sync --pre-commit                     act on staged files, stage what changed
//! nbpair --pipe black --check flake8 nb.ipynb    reformat and lint through a text format
//! nbpair -p notebook.ipynb                       list paired files
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use nbpair_formats::FormatSpec;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "nbpair",
    version,
    about = "Pair Jupyter notebooks with text files and keep them in sync",
    long_about = None,
)]
pub struct Cli {
    /// Notebooks or text files to process. `-` reads from stdin.
    pub notebooks: Vec<PathBuf>,

    /// Destination format: `py:light`, `py:percent`, `md`, `ipynb`,
    /// `python//py:light`, `auto:percent`, ...
    #[arg(long, value_name = "FMT")]
    pub to: Option<FormatSpec>,

    /// Format of the inputs. Files that do not match are an error unless
    /// `--ignore-unmatched` is given.
    #[arg(long, value_name = "FMT")]
    pub from: Option<FormatSpec>,

    /// Destination path; `-` writes to stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Synchronize every file of the notebook's pairing.
    #[arg(short, long, conflicts_with = "to")]
    pub sync: bool,

    /// Set the pairing (`ipynb,py:percent`) and write the paired files.
    /// An empty string removes the pairing.
    #[arg(long, value_name = "FMTS")]
    pub set_formats: Option<String>,

    /// List the paired files of each notebook.
    #[arg(short = 'p', long, conflicts_with_all = ["to", "sync", "test"])]
    pub paired_paths: bool,

    /// Keep the outputs of an existing destination `.ipynb` file.
    #[arg(long)]
    pub update: bool,

    /// Pipe the notebook through a command (repeatable). `{}` stands for a
    /// temporary file; otherwise the text goes through stdin and stdout.
    #[arg(long, value_name = "CMD")]
    pub pipe: Vec<String>,

    /// Run a check command on the notebook (repeatable).
    #[arg(long, value_name = "CMD")]
    pub check: Vec<String>,

    /// Text format used with `--pipe` and `--check`.
    #[arg(long, value_name = "FMT", default_value = "auto:percent")]
    pub pipe_fmt: FormatSpec,

    /// Act on staged files and stage the files written.
    #[arg(long)]
    pub pre_commit: bool,

    /// Run as a pre-commit framework hook: never stage, fail when a file was
    /// modified or differs from the index.
    #[arg(long)]
    pub pre_commit_mode: bool,

    /// Silently skip inputs that do not match `--from`.
    #[arg(long)]
    pub ignore_unmatched: bool,

    /// Fail when a written file is not tracked by git.
    #[arg(long)]
    pub alert_untracked: bool,

    /// Print a unified diff instead of writing.
    #[arg(long)]
    pub diff: bool,

    /// Check that converting to `--to` and back preserves the notebook.
    #[arg(long, requires = "to")]
    pub test: bool,

    /// Show what would be written without writing any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Report `--pipe` and `--check` failures as warnings.
    #[arg(long)]
    pub warn_only: bool,

    /// No progress messages.
    #[arg(short, long)]
    pub quiet: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    match commands::run(cli) {
        Ok(status) => status.exit_code(),
        Err(err) => {
            eprintln!("nbpair: error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

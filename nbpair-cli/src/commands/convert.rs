//! `--to`, and in-place `--pipe` / `--check`: one destination per notebook.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use nbpair_formats::FormatSpec;
use nbpair_sync::{
    convert_notebook, convert_text, convert_to_text, test_round_trip, ConvertOutcome, Report,
};

use super::{print_report, RunStatus, Session};

fn writes_to_stdout(session: &Session) -> bool {
    session
        .convert
        .output
        .as_deref()
        .is_some_and(|o| o == Path::new("-"))
}

pub fn run(notebook: &Path, session: &Session) -> Result<Option<Report>> {
    let opts = &session.convert;

    if writes_to_stdout(session) {
        let text = convert_to_text(notebook, opts)
            .with_context(|| format!("failed to convert {}", notebook.display()))?;
        if let Some(text) = text {
            std::io::stdout()
                .write_all(text.as_bytes())
                .context("failed to write to stdout")?;
        }
        return Ok(None);
    }

    let outcome = convert_notebook(notebook, opts)
        .with_context(|| format!("failed to convert {}", notebook.display()))?;
    match outcome {
        ConvertOutcome::Skipped { path, reason } => {
            tracing::debug!("skipped {}: {reason}", path.display());
            Ok(None)
        }
        ConvertOutcome::Converted(report) => {
            print_report("converted", &report, session);
            Ok(Some(report))
        }
    }
}

/// `nbpair -`: convert stdin, write to `--output` or stdout.
pub fn run_stdin(session: &Session) -> Result<()> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    let converted = convert_text(&text, &session.convert).context("failed to convert stdin")?;

    match session.convert.output.as_deref() {
        Some(output) if output != Path::new("-") => {
            let result = nbpair_sync::write_if_changed(output, &converted, session.convert.sync.dry_run)
                .with_context(|| format!("failed to write {}", output.display()))?;
            if !session.quiet {
                println!("✓ {}", result.path().display());
            }
        }
        _ => std::io::stdout()
            .write_all(converted.as_bytes())
            .context("failed to write to stdout")?,
    }
    Ok(())
}

/// `--test`: round-trip through `to` and report differences.
pub fn run_test(notebook: &Path, to: &FormatSpec, session: &Session) -> Result<RunStatus> {
    let diff = test_round_trip(notebook, to, &session.convert)
        .with_context(|| format!("failed to test {}", notebook.display()))?;
    match diff {
        None => {
            if !session.quiet {
                println!("✓ {} round-trips through {to}", notebook.display());
            }
            Ok(RunStatus::Success)
        }
        Some(diff) => {
            eprintln!(
                "{} {} does not round-trip through {to}",
                "error:".red().bold(),
                notebook.display()
            );
            print!("{diff}");
            Ok(RunStatus::Failed)
        }
    }
}

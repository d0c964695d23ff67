//! `--pipe` and `--check`: run a notebook through an external command.
//!
//! The notebook is serialized in a text format and handed to the command
//! either on stdin or, when the command contains `{}`, as a temporary file
//! whose path replaces the placeholder.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use nbpair_core::Notebook;
use nbpair_formats::{Converter, FormatSpec};

use crate::combine::combine_inputs_with_outputs;
use crate::error::{io_err, SyncError};

const FILE_PLACEHOLDER: &str = "{}";

/// Formatters that only read stdin when given `-`.
const STDIN_DASH_TOOLS: &[&str] = &["black", "isort", "flake8", "autopep8"];

/// Run `command` on the text form of `nb` and read the notebook back from
/// its output. Outputs and notebook metadata of `nb` are kept.
pub fn pipe_notebook(
    nb: &Notebook,
    command: &str,
    fmt: &FormatSpec,
    dir: &Path,
    converter: &Converter,
) -> Result<Notebook, SyncError> {
    let fmt = text_format(nb, fmt);
    let text = converter.writes(nb, &fmt)?;
    let piped = run_on_text(command, &text, &fmt, dir, true)?;

    let piped = converter.reads(&piped, &fmt)?;
    let mut combined = combine_inputs_with_outputs(&piped, nb);
    combined.metadata = nb.metadata.clone();
    Ok(combined)
}

/// Run `command` on the text form of `nb`; a non-zero exit status is an
/// error.
pub fn check_notebook(
    nb: &Notebook,
    command: &str,
    fmt: &FormatSpec,
    dir: &Path,
    converter: &Converter,
) -> Result<(), SyncError> {
    let fmt = text_format(nb, fmt);
    let text = converter.writes(nb, &fmt)?;
    run_on_text(command, &text, &fmt, dir, false)?;
    Ok(())
}

/// The format handed to commands: `auto` resolved, no folder prefix.
fn text_format(nb: &Notebook, fmt: &FormatSpec) -> FormatSpec {
    let mut fmt = fmt.resolve_auto(nb);
    fmt.prefix.clear();
    fmt.tree = false;
    fmt
}

fn run_on_text(
    command: &str,
    text: &str,
    fmt: &FormatSpec,
    dir: &Path,
    read_back: bool,
) -> Result<String, SyncError> {
    if command.contains(FILE_PLACEHOLDER) {
        let tmp = tempfile::Builder::new()
            .prefix("nbpair-")
            .suffix(&fmt.file_ending())
            .tempfile()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        std::fs::write(tmp.path(), text).map_err(|e| io_err(tmp.path(), e))?;

        let expanded = command.replace(FILE_PLACEHOLDER, &tmp.path().to_string_lossy());
        let output = shell(&expanded, dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| io_err(dir, e))?;
        ensure_success(command, &output)?;

        if !read_back {
            return Ok(String::new());
        }
        return std::fs::read_to_string(tmp.path()).map_err(|e| io_err(tmp.path(), e));
    }

    let command = with_stdin_dash(command);
    let mut child = shell(&command, dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| io_err(dir, e))?;

    // Written from a thread while stdout is drained.
    let writer = child.stdin.take().map(|mut stdin| {
        let text = text.to_string();
        std::thread::spawn(move || stdin.write_all(text.as_bytes()))
    });
    let output = child.wait_with_output().map_err(|e| io_err(dir, e))?;
    if let Some(writer) = writer {
        if let Ok(Err(e)) = writer.join() {
            // A command may exit without reading its input.
            tracing::debug!("writing to '{command}' failed: {e}");
        }
    }
    ensure_success(&command, &output)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn with_stdin_dash(command: &str) -> String {
    if STDIN_DASH_TOOLS.contains(&command.trim()) {
        format!("{} -", command.trim())
    } else {
        command.to_string()
    }
}

fn ensure_success(command: &str, output: &Output) -> Result<(), SyncError> {
    if output.status.success() {
        tracing::debug!("'{command}' succeeded");
        return Ok(());
    }
    Err(SyncError::CommandFailed {
        command: command.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[cfg(unix)]
fn shell(command: &str, dir: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(dir);
    cmd
}

#[cfg(windows)]
fn shell(command: &str, dir: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command).current_dir(dir);
    cmd
}

//! Sync and convert pipelines shared by every CLI mode.
//!
//! ```text
//! sync_notebook     formats ─▶ pairing ─▶ freshness ─▶ read + combine ─▶ pipe/check ─▶ write all
//! convert_notebook  --from ─▶ read ─▶ set formats ─▶ pipe/check ─▶ write destination
//! ```

use std::path::{Path, PathBuf};

use nbpair_core::{config, Notebook, NotebookError};
use nbpair_formats::cells::text_metadata;
use nbpair_formats::format::AUTO_EXTENSION;
use nbpair_formats::{
    base_path, formats_to_string, full_path, parse_formats, resolve_pairing, Converter,
    FormatName, FormatSpec, PairedFile,
};

use crate::combine::combine_inputs_with_outputs;
use crate::diff::{diff_file, diff_text};
use crate::error::{io_err, SyncError};
use crate::freshness::{self, latest_inputs_and_outputs, FreshnessSignal};
use crate::pipe::{check_notebook, pipe_notebook};
use crate::writer::{write_if_changed, WriteResult};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Settings shared by sync and convert runs, built by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Report what would be written without touching the filesystem.
    pub dry_run: bool,
    /// Compute unified diffs instead of writing.
    pub diff: bool,
    /// Keep the outputs of an existing destination notebook.
    pub update: bool,
    /// New pairing; `Some("")` removes it.
    pub set_formats: Option<String>,
    pub pipe: Vec<String>,
    pub check: Vec<String>,
    /// Text format handed to `pipe` and `check` commands.
    pub pipe_fmt: FormatSpec,
    /// Pipe and check failures become warnings.
    pub warn_only: bool,
    /// Searched when no project configuration file is found.
    pub user_config_dir: Option<PathBuf>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            diff: false,
            update: false,
            set_formats: None,
            pipe: Vec::new(),
            check: Vec::new(),
            pipe_fmt: default_pipe_format(),
            warn_only: false,
            user_config_dir: None,
        }
    }
}

impl SyncOptions {
    fn writes_files(&self) -> bool {
        !(self.dry_run || self.diff)
    }
}

/// `auto:percent`.
pub fn default_pipe_format() -> FormatSpec {
    FormatSpec {
        prefix: Vec::new(),
        tree: false,
        suffix: String::new(),
        extension: AUTO_EXTENSION.to_string(),
        format_name: Some(FormatName::Percent),
    }
}

/// Options of a single-destination conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Format of the inputs; files not matching it are rejected.
    pub from: Option<FormatSpec>,
    /// Destination format; `None` rewrites the file in place.
    pub to: Option<FormatSpec>,
    /// Explicit destination path.
    pub output: Option<PathBuf>,
    /// Skip inputs not matching `from` instead of failing.
    pub ignore_unmatched: bool,
    pub sync: SyncOptions,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One file considered for writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub result: WriteResult,
    /// Unified diff, when diffs were requested and the file would change.
    pub diff: Option<String>,
}

impl FileChange {
    pub fn path(&self) -> &Path {
        self.result.path()
    }
}

/// What a sync or conversion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The notebook the run was invoked on.
    pub path: PathBuf,
    /// The file the cells were read from.
    pub inputs: PathBuf,
    pub files: Vec<FileChange>,
    /// Pipe and check failures under `warn_only`.
    pub warnings: Vec<String>,
}

impl Report {
    fn new(path: &Path, inputs: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            inputs: inputs.to_path_buf(),
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Files actually written to disk.
    pub fn written(&self) -> impl Iterator<Item = &Path> + '_ {
        self.files
            .iter()
            .filter(|f| matches!(f.result, WriteResult::Written { .. }))
            .map(FileChange::path)
    }

    /// Number of files that were (or would be) modified.
    pub fn changed_count(&self) -> usize {
        self.files.iter().filter(|f| f.result.changed()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The notebook has no pairing, in its metadata or in configuration.
    NotPaired { path: PathBuf },
    Synced(Report),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// Input did not match `--from` and `ignore_unmatched` was set.
    Skipped { path: PathBuf, reason: String },
    Converted(Report),
}

// ---------------------------------------------------------------------------
// Settings from configuration
// ---------------------------------------------------------------------------

struct Settings {
    converter: Converter,
    /// Default pairing from the configuration file.
    formats: Option<String>,
}

fn load_settings(path: &Path, opts: &SyncOptions) -> Result<Settings, SyncError> {
    let dir = absolute_dir(path)?;
    let Some(loaded) = config::find_config_at(&dir, opts.user_config_dir.as_deref())? else {
        return Ok(Settings {
            converter: Converter::new(),
            formats: None,
        });
    };

    let default_name = loaded
        .config
        .default_format_name
        .as_deref()
        .map(|name| {
            name.parse::<FormatName>()
                .map_err(|message| NotebookError::Config {
                    path: loaded.path.clone(),
                    message,
                })
        })
        .transpose()?;

    Ok(Settings {
        converter: Converter::with_default_format_name(default_name),
        formats: loaded.config.formats.filter(|f| !f.trim().is_empty()),
    })
}

fn absolute_dir(path: &Path) -> Result<PathBuf, SyncError> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| io_err(".", e))?;
    Ok(cwd.join(dir))
}

/// Directory external commands run in.
fn command_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn format_of(path: &Path) -> Result<FormatSpec, SyncError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    Ok(FormatSpec::for_extension(extension)?)
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

/// Run the `--pipe` commands, then the `--check` commands.
fn apply_commands(
    mut nb: Notebook,
    path: &Path,
    opts: &SyncOptions,
    converter: &Converter,
    warnings: &mut Vec<String>,
) -> Result<Notebook, SyncError> {
    let dir = command_dir(path);
    for command in &opts.pipe {
        match pipe_notebook(&nb, command, &opts.pipe_fmt, &dir, converter) {
            Ok(piped) => nb = piped,
            Err(err) if opts.warn_only => {
                tracing::warn!("{}: {err}", path.display());
                warnings.push(err.to_string());
            }
            Err(err) => return Err(err),
        }
    }
    for command in &opts.check {
        match check_notebook(&nb, command, &opts.pipe_fmt, &dir, converter) {
            Ok(()) => {}
            Err(err) if opts.warn_only => {
                tracing::warn!("{}: {err}", path.display());
                warnings.push(err.to_string());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(nb)
}

fn write_file(path: &Path, content: &str, opts: &SyncOptions) -> Result<FileChange, SyncError> {
    if opts.diff {
        let diff = diff_file(path, content)?;
        let result = match diff {
            Some(_) => WriteResult::WouldWrite {
                path: path.to_path_buf(),
            },
            None => WriteResult::Unchanged {
                path: path.to_path_buf(),
            },
        };
        return Ok(FileChange {
            result,
            diff: diff.map(|d| d.unified_diff),
        });
    }
    Ok(FileChange {
        result: write_if_changed(path, content, opts.dry_run)?,
        diff: None,
    })
}

// ---------------------------------------------------------------------------
// sync_notebook
// ---------------------------------------------------------------------------

enum PairingSource {
    Options,
    Metadata,
    Config,
}

/// Bring every paired file of the notebook at `path` up to date with the
/// most recently modified one.
pub fn sync_notebook(path: &Path, opts: &SyncOptions) -> Result<SyncOutcome, SyncError> {
    let settings = load_settings(path, opts)?;
    let converter = &settings.converter;
    let own_format = format_of(path)?;
    let nb = converter.read_path(path, Some(&own_format))?;

    let (formats, source) = if let Some(formats) = &opts.set_formats {
        (formats.trim().to_string(), PairingSource::Options)
    } else if let Some(formats) = nb.formats() {
        (formats.to_string(), PairingSource::Metadata)
    } else if let Some(formats) = &settings.formats {
        (formats.clone(), PairingSource::Config)
    } else {
        tracing::debug!("not paired: {}", path.display());
        return Ok(SyncOutcome::NotPaired {
            path: path.to_path_buf(),
        });
    };

    let specs = parse_formats(&formats)?;
    if specs.is_empty() {
        return unpair(nb, path, &own_format, opts, converter).map(SyncOutcome::Synced);
    }

    let Some((fmt, paired)) = resolve_pairing(path, &specs)? else {
        if let PairingSource::Config = source {
            tracing::debug!("{} does not match the configured pairing", path.display());
            return Ok(SyncOutcome::NotPaired {
                path: path.to_path_buf(),
            });
        }
        return Err(SyncError::NotInFormats {
            path: path.to_path_buf(),
            formats: formats_to_string(&specs),
        });
    };
    tracing::debug!("{} is paired as {fmt}", path.display());

    let Some(sources) = latest_inputs_and_outputs(&paired)? else {
        return Err(io_err(path, std::io::ErrorKind::NotFound.into()));
    };
    let inputs = &sources.inputs;

    let inputs_nb = if inputs.path == path {
        nb
    } else {
        converter.read_path(&inputs.path, Some(&inputs.format))?
    };
    let mut nb = match &sources.outputs {
        Some(outputs) if outputs.path != inputs.path => {
            let outputs_nb = converter.read_path(&outputs.path, Some(&outputs.format))?;
            combine_inputs_with_outputs(&inputs_nb, &outputs_nb)
        }
        _ => inputs_nb,
    };
    if !matches!(source, PairingSource::Config) {
        nb.set_formats(Some(formats.as_str()));
    }

    let mut report = Report::new(path, &inputs.path);
    let nb = apply_commands(nb, path, opts, converter, &mut report.warnings)?;

    let rendered = paired
        .iter()
        .map(|file: &PairedFile| Ok((file.path.clone(), converter.writes(&nb, &file.format)?)))
        .collect::<Result<Vec<_>, SyncError>>()?;
    match freshness::check(&rendered)? {
        FreshnessSignal::Current => tracing::debug!("{} is in sync", path.display()),
        FreshnessSignal::Stale { files } => {
            tracing::debug!("{} paired file(s) to update", files.len())
        }
        FreshnessSignal::Missing => {}
    }

    for (file, content) in &rendered {
        report.files.push(write_file(file, content, opts)?);
    }
    Ok(SyncOutcome::Synced(report))
}

/// `--set-formats ""`: drop the pairing and rewrite the file alone.
fn unpair(
    mut nb: Notebook,
    path: &Path,
    fmt: &FormatSpec,
    opts: &SyncOptions,
    converter: &Converter,
) -> Result<Report, SyncError> {
    nb.set_formats(None);
    let mut report = Report::new(path, path);
    let nb = apply_commands(nb, path, opts, converter, &mut report.warnings)?;
    let content = converter.writes(&nb, fmt)?;
    report.files.push(write_file(path, &content, opts)?);
    Ok(report)
}

// ---------------------------------------------------------------------------
// convert_notebook
// ---------------------------------------------------------------------------

/// A notebook read for conversion, with where it goes.
struct Prepared {
    nb: Notebook,
    source: FormatSpec,
    target: FormatSpec,
    converter: Converter,
    warnings: Vec<String>,
}

fn prepare(path: &Path, opts: &ConvertOptions) -> Result<Result<Prepared, ConvertOutcome>, SyncError> {
    if let Some(from) = &opts.from {
        if let Err(err) = base_path(path, from) {
            if opts.ignore_unmatched {
                tracing::debug!("skipping {}: {err}", path.display());
                return Ok(Err(ConvertOutcome::Skipped {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                }));
            }
            return Err(err.into());
        }
    }

    let settings = load_settings(path, &opts.sync)?;
    let converter = settings.converter;
    let source = match &opts.from {
        Some(from) => from.clone(),
        None => format_of(path)?,
    };
    let mut nb = converter.read_path(path, Some(&source))?;
    if let Some(formats) = &opts.sync.set_formats {
        parse_formats(formats)?;
        nb.set_formats(Some(formats.trim()));
    }

    let mut warnings = Vec::new();
    let nb = apply_commands(nb, path, &opts.sync, &converter, &mut warnings)?;
    let target = opts.to.as_ref().unwrap_or(&source).resolve_auto(&nb);

    Ok(Ok(Prepared {
        nb,
        source,
        target,
        converter,
        warnings,
    }))
}

/// The file `path` converts to.
fn destination(path: &Path, opts: &ConvertOptions, prepared: &Prepared) -> Result<PathBuf, SyncError> {
    if let Some(output) = &opts.output {
        return Ok(output.clone());
    }
    if opts.to.is_none() {
        return Ok(path.to_path_buf());
    }
    let base = base_path(path, &prepared.source)?;
    Ok(full_path(&base, &prepared.target))
}

/// Convert the notebook at `path` to `opts.to` (or rewrite it in place).
pub fn convert_notebook(path: &Path, opts: &ConvertOptions) -> Result<ConvertOutcome, SyncError> {
    let mut prepared = match prepare(path, opts)? {
        Ok(prepared) => prepared,
        Err(skipped) => return Ok(skipped),
    };
    let dest = destination(path, opts, &prepared)?;

    if opts.sync.update && prepared.target.is_ipynb() && dest.is_file() {
        let existing = nbpair_core::ipynb::read(&dest)?;
        prepared.nb = combine_inputs_with_outputs(&prepared.nb, &existing);
        tracing::debug!("kept outputs of {}", dest.display());
    }

    let content = prepared.converter.writes(&prepared.nb, &prepared.target)?;
    let mut report = Report::new(path, path);
    report.warnings = prepared.warnings;
    report.files.push(write_file(&dest, &content, &opts.sync)?);
    if opts.sync.writes_files() {
        tracing::info!("converted {} to {}", path.display(), dest.display());
    }
    Ok(ConvertOutcome::Converted(report))
}

/// Convert the notebook at `path` and return the text instead of writing it
/// (`--output -`). `None` when the input was skipped.
pub fn convert_to_text(path: &Path, opts: &ConvertOptions) -> Result<Option<String>, SyncError> {
    match prepare(path, opts)? {
        Ok(prepared) => Ok(Some(prepared.converter.writes(&prepared.nb, &prepared.target)?)),
        Err(_) => Ok(None),
    }
}

/// Convert notebook text read from stdin. The input format is `opts.from`
/// or `ipynb`; the output format is `opts.to` or the input format.
pub fn convert_text(text: &str, opts: &ConvertOptions) -> Result<String, SyncError> {
    let converter = Converter::new();
    let source = opts.from.clone().unwrap_or_else(FormatSpec::ipynb);
    let mut nb = converter.reads(text, &source)?;
    if let Some(formats) = &opts.sync.set_formats {
        parse_formats(formats)?;
        nb.set_formats(Some(formats.trim()));
    }
    let mut warnings = Vec::new();
    let nb = apply_commands(nb, Path::new("-"), &opts.sync, &converter, &mut warnings)?;
    let target = opts.to.as_ref().unwrap_or(&source).resolve_auto(&nb);
    Ok(converter.writes(&nb, &target)?)
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// The other members of the pairing of the notebook at `path`.
pub fn paired_paths_of(path: &Path, opts: &SyncOptions) -> Result<Vec<PairedFile>, SyncError> {
    let settings = load_settings(path, opts)?;
    let nb = settings.converter.read_path(path, Some(&format_of(path)?))?;
    let Some(formats) = nb.formats().map(str::to_string).or(settings.formats) else {
        return Ok(Vec::new());
    };
    let specs = parse_formats(&formats)?;
    Ok(resolve_pairing(path, &specs)?
        .map(|(_, paired)| paired.into_iter().filter(|f| f.path != path).collect())
        .unwrap_or_default())
}

/// Convert the notebook at `path` to `to` and back, and compare cells and
/// their metadata with the original. Returns a diff when they differ.
pub fn test_round_trip(path: &Path, to: &FormatSpec, opts: &ConvertOptions) -> Result<Option<String>, SyncError> {
    let settings = load_settings(path, &opts.sync)?;
    let converter = settings.converter;
    let source = match &opts.from {
        Some(from) => from.clone(),
        None => format_of(path)?,
    };
    let nb = converter.read_path(path, Some(&source))?;
    let to = to.resolve_auto(&nb);
    let text = converter.writes(&nb, &to)?;
    let back = converter.reads(&text, &to)?;
    Ok(diff_text(path, &cell_listing(&nb), &cell_listing(&back)))
}

/// A line-oriented listing of cells, used to diff notebooks.
fn cell_listing(nb: &Notebook) -> String {
    let mut out = String::new();
    for (index, cell) in nb.cells.iter().enumerate() {
        out.push_str(&format!("## cell {index} [{}]", cell.cell_type));
        let metadata = text_metadata(cell);
        if !metadata.is_empty() {
            out.push(' ');
            out.push_str(&serde_json::Value::Object(metadata).to_string());
        }
        out.push('\n');
        out.push_str(&cell.source);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

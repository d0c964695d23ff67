//! Shared helpers for the text cell codecs.

use serde_json::Value;

use nbpair_core::{Cell, CellType, Metadata};

use crate::error::FormatError;

/// Cell metadata keys that change on every execution and stay in the `.ipynb`.
pub const VOLATILE_CELL_METADATA: &[&str] = &[
    "ExecuteTime",
    "execution",
    "collapsed",
    "scrolled",
    "trusted",
    "autoscroll",
];

/// Converts between notebook cells and lines of a text file (header excluded).
pub trait CellCodec {
    /// Lines representing `cells`; `language` tags fenced code where relevant.
    fn write_cells(&self, cells: &[Cell], language: &str) -> Vec<String>;

    /// Parse cells. `line_offset` is the 0-based position of `lines[0]` in the
    /// file, for error messages.
    fn read_cells(&self, lines: &[&str], line_offset: usize) -> Result<Vec<Cell>, FormatError>;
}

/// The metadata of `cell` that is written to text.
pub fn text_metadata(cell: &Cell) -> Metadata {
    cell.metadata
        .iter()
        .filter(|(key, _)| !VOLATILE_CELL_METADATA.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub(crate) fn comment(token: &str, line: &str) -> String {
    if line.is_empty() {
        token.to_string()
    } else {
        format!("{token} {line}")
    }
}

/// `# text` → `text`, `#` → ``; `None` when the line is not a comment.
pub(crate) fn uncomment<'a>(token: &str, line: &'a str) -> Option<&'a str> {
    let rest = line.strip_prefix(token)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub(crate) fn metadata_json(metadata: &Metadata) -> String {
    Value::Object(metadata.clone()).to_string()
}

pub(crate) fn parse_metadata_json(text: &str, line: usize) -> Result<Metadata, FormatError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(FormatError::CellMetadata {
            line: line + 1,
            reason: format!("expected a JSON object, found {other}"),
        }),
        Err(e) => Err(FormatError::CellMetadata {
            line: line + 1,
            reason: e.to_string(),
        }),
    }
}

pub(crate) fn make_cell(cell_type: CellType, lines: &[&str], metadata: Metadata) -> Cell {
    Cell {
        metadata,
        ..Cell::new(cell_type, lines.join("\n"))
    }
}

/// Drop trailing blank lines.
pub(crate) fn trim_trailing_blank<'a, 'b>(lines: &'b [&'a str]) -> &'b [&'a str] {
    let end = lines
        .iter()
        .rposition(|line| !is_blank(line))
        .map_or(0, |i| i + 1);
    &lines[..end]
}

//! The Markdown format.
//!
//! Code cells are fenced blocks tagged with the notebook language. Markdown
//! cells are plain text, wrapped in a region when their boundaries would
//! otherwise be lost:
//!
//! ````text
//! A paragraph
//!
//! ```python
//! x = 1
//! ```
//!
//! <!-- #region {"tags": ["note"]} -->
//! Second Markdown cell
//! <!-- #endregion -->
//!
//! <!-- #raw -->
//! raw text
//! <!-- #endraw -->
//! ````
//!
//! A code fence is one backtick longer than the longest backtick run that
//! starts a line of the cell, and at least three long.

use nbpair_core::{Cell, CellType, Metadata};

use crate::cells::{is_blank, make_cell, metadata_json, parse_metadata_json, text_metadata, CellCodec};
use crate::error::FormatError;

const FENCE: &str = "```";
const REGION: (&str, &str) = ("<!-- #region", "<!-- #endregion -->");
const RAW: (&str, &str) = ("<!-- #raw", "<!-- #endraw -->");

#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

fn html_open(tag: &str, metadata: &Metadata) -> String {
    if metadata.is_empty() {
        format!("{tag} -->")
    } else {
        format!("{tag} {} -->", metadata_json(metadata))
    }
}

/// Metadata inside `<!-- #region {...} -->`; `None` when `line` is not `tag`.
fn parse_html_open(
    line: &str,
    tag: &str,
    line_no: usize,
) -> Option<Result<Metadata, FormatError>> {
    let inner = line.trim().strip_prefix(tag)?.strip_suffix("-->")?;
    if !(inner.is_empty() || inner.starts_with(' ')) {
        return None;
    }
    let inner = inner.trim();
    Some(if inner.is_empty() {
        Ok(Metadata::new())
    } else {
        parse_metadata_json(inner, line_no)
    })
}

/// How a fenced or tagged block ends.
#[derive(Debug, Clone, Copy)]
enum Close {
    /// A line of at least this many backticks.
    Fence(usize),
    Tag(&'static str),
}

impl Close {
    fn matches(self, line: &str) -> bool {
        let line = line.trim_end();
        match self {
            Close::Fence(len) => line.len() >= len && backticks(line) == line.len(),
            Close::Tag(tag) => line == tag,
        }
    }
}

fn backticks(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b'`').count()
}

fn code_fence(lines: &[&str]) -> String {
    let longest = lines
        .iter()
        .map(|l| backticks(l.trim_start()))
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(FENCE.len() - 1) + 1)
}

/// Fence length and metadata of a fence opening a code cell.
fn parse_code_fence(line: &str, line_no: usize) -> Option<(usize, Result<Metadata, FormatError>)> {
    let len = backticks(line);
    if len < FENCE.len() {
        return None;
    }
    let info = line[len..].trim();
    if info.is_empty() {
        return None;
    }
    let metadata = match info.split_once(' ') {
        Some((_, meta)) if !meta.trim().is_empty() => parse_metadata_json(meta.trim(), line_no),
        _ => Ok(Metadata::new()),
    };
    Some((len, metadata))
}

fn needs_region(lines: &[&str], metadata: &Metadata, after_markdown: bool) -> bool {
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return true;
    };
    after_markdown
        || !metadata.is_empty()
        || is_blank(first)
        || is_blank(last)
        || lines.iter().any(|l| {
            let l = l.trim_start();
            l.starts_with(FENCE) || l.starts_with("<!-- #")
        })
}

impl CellCodec for Markdown {
    fn write_cells(&self, cells: &[Cell], language: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut previous = None;
        for (index, cell) in cells.iter().enumerate() {
            if index > 0 {
                out.push(String::new());
            }
            let metadata = text_metadata(cell);
            let lines = cell.lines();
            let body = lines.iter().map(|l| l.to_string());
            match cell.cell_type {
                CellType::Code => {
                    let fence = code_fence(&lines);
                    let mut open = format!("{fence}{language}");
                    if !metadata.is_empty() {
                        open.push(' ');
                        open.push_str(&metadata_json(&metadata));
                    }
                    out.push(open);
                    out.extend(body);
                    out.push(fence);
                }
                CellType::Raw => {
                    out.push(html_open(RAW.0, &metadata));
                    out.extend(body);
                    out.push(RAW.1.to_string());
                }
                CellType::Markdown => {
                    let after_markdown = previous == Some(CellType::Markdown);
                    if needs_region(&lines, &metadata, after_markdown) {
                        out.push(html_open(REGION.0, &metadata));
                        out.extend(body);
                        out.push(REGION.1.to_string());
                    } else {
                        out.extend(body);
                    }
                }
            }
            previous = Some(cell.cell_type);
        }
        out
    }

    fn read_cells(&self, lines: &[&str], line_offset: usize) -> Result<Vec<Cell>, FormatError> {
        let mut cells = Vec::new();
        let mut text: Vec<&str> = Vec::new();

        let flush = |text: &mut Vec<&str>, cells: &mut Vec<Cell>| {
            let start = text.iter().position(|l| !is_blank(l));
            let end = text.iter().rposition(|l| !is_blank(l));
            if let (Some(start), Some(end)) = (start, end) {
                cells.push(make_cell(CellType::Markdown, &text[start..=end], Metadata::new()));
            }
            text.clear();
        };

        let closing = |from: usize, close: Close| {
            lines[from..]
                .iter()
                .position(|l| close.matches(l))
                .map_or(lines.len(), |p| from + p)
        };

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let line_no = line_offset + i;

            let block = if let Some((len, metadata)) = parse_code_fence(line, line_no) {
                Some((CellType::Code, metadata?, Close::Fence(len)))
            } else if let Some(metadata) = parse_html_open(line, REGION.0, line_no) {
                Some((CellType::Markdown, metadata?, Close::Tag(REGION.1)))
            } else if let Some(metadata) = parse_html_open(line, RAW.0, line_no) {
                Some((CellType::Raw, metadata?, Close::Tag(RAW.1)))
            } else {
                None
            };

            match block {
                Some((cell_type, metadata, close)) => {
                    flush(&mut text, &mut cells);
                    let end = closing(i + 1, close);
                    cells.push(make_cell(cell_type, &lines[i + 1..end], metadata));
                    i = end + 1;
                }
                None => {
                    text.push(line);
                    i += 1;
                }
            }
        }
        flush(&mut text, &mut cells);
        Ok(cells)
    }
}

//! The `percent` script format: one `# %%` marker per cell.
//!
//! ```text
//! # %% [markdown]
//! # # Title
//!
//! # %% Load data {"tags": ["parameters"]}
//! path = "data.csv"
//! ```
//!
//! A marker may carry a title, a `[markdown]`/`[raw]` cell type, and inline
//! JSON metadata, in that order. Titles are kept in the `title` metadata key.
//!
//! Cell lines that would read as a marker once commented get one more comment
//! prefix (`%% x` in markdown is written `# # %% x`) and lose it on reading.

use serde_json::Value;

use nbpair_core::{Cell, CellType, Metadata};

use crate::cells::{
    comment, is_blank, make_cell, metadata_json, parse_metadata_json, text_metadata,
    trim_trailing_blank, uncomment, CellCodec,
};
use crate::error::FormatError;

const TITLE_KEY: &str = "title";

#[derive(Debug, Clone, Copy)]
pub struct Percent {
    pub comment: &'static str,
}

impl Percent {
    pub fn new(comment: &'static str) -> Self {
        Self { comment }
    }

    fn marker_prefix(&self) -> String {
        format!("{} %%", self.comment)
    }

    /// `# %%` and `# %% ...`, but not `# %%time`.
    pub fn is_marker(&self, line: &str) -> bool {
        line.trim_end()
            .strip_prefix(self.marker_prefix().as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    }

    /// A marker behind zero or more `# ` prefixes.
    fn is_marker_like(&self, line: &str) -> bool {
        let mut rest = line;
        loop {
            if self.is_marker(rest) {
                return true;
            }
            match rest
                .strip_prefix(self.comment)
                .and_then(|rest| rest.strip_prefix(' '))
            {
                Some(inner) => rest = inner,
                None => return false,
            }
        }
    }

    fn escape(&self, line: String) -> String {
        if self.is_marker_like(&line) {
            format!("{} {line}", self.comment)
        } else {
            line
        }
    }

    fn unescape<'a>(&self, line: &'a str) -> &'a str {
        if self.is_marker(line) || !self.is_marker_like(line) {
            return line;
        }
        line.strip_prefix(self.comment)
            .and_then(|rest| rest.strip_prefix(' '))
            .unwrap_or(line)
    }

    fn marker(&self, cell: &Cell) -> String {
        let mut metadata = text_metadata(cell);
        let mut marker = self.marker_prefix();
        let title = metadata
            .get(TITLE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(title) = title {
            metadata.remove(TITLE_KEY);
            marker.push(' ');
            marker.push_str(&title);
        }
        match cell.cell_type {
            CellType::Code => {}
            CellType::Markdown | CellType::Raw => marker.push_str(&format!(" [{}]", cell.cell_type)),
        }
        if !metadata.is_empty() {
            marker.push(' ');
            marker.push_str(&metadata_json(&metadata));
        }
        marker
    }

    fn parse_marker(&self, line: &str, line_no: usize) -> Result<(CellType, Metadata), FormatError> {
        let prefix = self.marker_prefix();
        let rest = line
            .trim_end()
            .strip_prefix(prefix.as_str())
            .unwrap_or_default()
            .trim();

        let (title, rest) = match rest.find('{') {
            Some(brace) => (&rest[..brace], &rest[brace..]),
            None => (rest, ""),
        };
        let mut cell_type = CellType::Code;
        let mut title = title.trim().to_string();
        for (tag, kind) in [
            ("[markdown]", CellType::Markdown),
            ("[md]", CellType::Markdown),
            ("[raw]", CellType::Raw),
        ] {
            if let Some(stripped) = title.strip_suffix(tag) {
                cell_type = kind;
                title = stripped.trim_end().to_string();
                break;
            }
        }

        let mut metadata = if rest.is_empty() {
            Metadata::new()
        } else {
            parse_metadata_json(rest, line_no)?
        };
        if !title.is_empty() {
            metadata.insert(TITLE_KEY.to_string(), Value::String(title));
        }
        Ok((cell_type, metadata))
    }
}

impl CellCodec for Percent {
    fn write_cells(&self, cells: &[Cell], _language: &str) -> Vec<String> {
        let mut out = Vec::new();
        for (index, cell) in cells.iter().enumerate() {
            if index > 0 {
                out.push(String::new());
            }
            out.push(self.marker(cell));
            let lines = cell.lines();
            match cell.cell_type {
                CellType::Code => out.extend(lines.iter().map(|l| self.escape(l.to_string()))),
                CellType::Markdown | CellType::Raw => {
                    out.extend(lines.iter().map(|l| self.escape(comment(self.comment, l))))
                }
            }
        }
        out
    }

    fn read_cells(&self, lines: &[&str], line_offset: usize) -> Result<Vec<Cell>, FormatError> {
        let markers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| self.is_marker(l))
            .map(|(i, _)| i)
            .collect();

        let mut cells = Vec::new();

        let preamble_end = markers.first().copied().unwrap_or(lines.len());
        let preamble = trim_trailing_blank(&lines[..preamble_end]);
        let first_code = preamble.iter().position(|l| !is_blank(l));
        if let Some(start) = first_code {
            cells.push(make_cell(CellType::Code, &preamble[start..], Metadata::new()));
        }

        for (n, &start) in markers.iter().enumerate() {
            let end = markers.get(n + 1).copied().unwrap_or(lines.len());
            let (cell_type, metadata) = self.parse_marker(lines[start], line_offset + start)?;
            let body: Vec<&str> = trim_trailing_blank(&lines[start + 1..end])
                .iter()
                .map(|&l| self.unescape(l))
                .collect();
            let cell = match cell_type {
                CellType::Code => make_cell(cell_type, &body, metadata),
                CellType::Markdown | CellType::Raw => {
                    let text: Vec<&str> = body
                        .iter()
                        .map(|&l| uncomment(self.comment, l).unwrap_or(l))
                        .collect();
                    make_cell(cell_type, &text, metadata)
                }
            };
            cells.push(cell);
        }
        Ok(cells)
    }
}

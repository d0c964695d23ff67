//! The `light` script format.
//!
//! Code is written as-is and Markdown as comments; cells are separated by a
//! blank line. Cells that would not read back unambiguously are wrapped in
//! explicit markers:
//!
//! ```text
//! # This is a Markdown cell        # + {"tags": ["parameters"]}
//!                                  alpha = 0.1
//! x = 1                            # -
//! y = 2
//!                                  # + [markdown] {"slideshow": {}}
//! # + [raw]                        # A Markdown cell with metadata
//! # raw text                       # -
//! # -
//! ```
//!
//! `# +` is only a marker alone, before `[markdown]`, `[md]` or `[raw]`, or
//! before inline JSON metadata, so `# + note` stays a plain comment. Inside
//! a wrapped cell, body lines that look like a marker get one more comment
//! prefix (`# -` is written `# # -`) and lose it again on reading.

use nbpair_core::{Cell, CellType, Metadata};

use crate::cells::{
    comment, is_blank, make_cell, metadata_json, parse_metadata_json, text_metadata, uncomment,
    CellCodec,
};
use crate::error::FormatError;

#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub comment: &'static str,
}

impl Light {
    pub fn new(comment: &'static str) -> Self {
        Self { comment }
    }

    fn start_marker(&self, kind: Option<CellType>, metadata: &Metadata) -> String {
        let mut marker = format!("{} +", self.comment);
        if let Some(kind) = kind {
            marker.push_str(&format!(" [{kind}]"));
        }
        if !metadata.is_empty() {
            marker.push(' ');
            marker.push_str(&metadata_json(metadata));
        }
        marker
    }

    fn end_marker(&self) -> String {
        format!("{} -", self.comment)
    }

    fn is_start_marker(&self, line: &str) -> bool {
        let Some(rest) = line
            .trim_end()
            .strip_prefix(self.comment)
            .and_then(|rest| rest.strip_prefix(" +"))
        else {
            return false;
        };
        if rest.is_empty() {
            return true;
        }
        let options = rest.trim_start();
        rest.starts_with(' ')
            && ["[markdown]", "[md]", "[raw]", "{"]
                .iter()
                .any(|prefix| options.starts_with(prefix))
    }

    fn is_end_marker(&self, line: &str) -> bool {
        line.trim_end() == self.end_marker()
    }

    fn is_marker(&self, line: &str) -> bool {
        self.is_start_marker(line) || self.is_end_marker(line)
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
                .and_then(|r| r.strip_prefix(' '))
            {
                Some(inner) => rest = inner,
                None => return false,
            }
        }
    }

    fn escape(&self, line: &str) -> String {
        if self.is_marker_like(line) {
            format!("{} {line}", self.comment)
        } else {
            line.to_string()
        }
    }

    fn unescape<'a>(&self, line: &'a str) -> &'a str {
        if self.is_marker(line) || !self.is_marker_like(line) {
            return line;
        }
        line.strip_prefix(self.comment)
            .and_then(|r| r.strip_prefix(' '))
            .unwrap_or(line)
    }

    fn is_comment(&self, line: &str) -> bool {
        line.starts_with(self.comment)
    }

    fn code_needs_markers(&self, lines: &[&str]) -> bool {
        match lines.first() {
            None => true,
            Some(_) => {
                lines.iter().any(|l| is_blank(l) || self.is_start_marker(l))
                    || lines.iter().all(|l| self.is_comment(l))
            }
        }
    }

    fn markdown_needs_markers(&self, lines: &[&str]) -> bool {
        lines.is_empty()
            || lines
                .iter()
                .any(|l| self.is_start_marker(&comment(self.comment, l)))
    }

    fn write_cell(&self, cell: &Cell, out: &mut Vec<String>) {
        let metadata = text_metadata(cell);
        let lines = cell.lines();
        match cell.cell_type {
            CellType::Code => {
                if metadata.is_empty() && !self.code_needs_markers(&lines) {
                    out.extend(lines.iter().map(|l| l.to_string()));
                } else {
                    out.push(self.start_marker(None, &metadata));
                    out.extend(lines.iter().map(|l| self.escape(l)));
                    out.push(self.end_marker());
                }
            }
            CellType::Markdown if metadata.is_empty() && !self.markdown_needs_markers(&lines) => {
                out.extend(lines.iter().map(|l| comment(self.comment, l)));
            }
            CellType::Markdown | CellType::Raw => {
                out.push(self.start_marker(Some(cell.cell_type), &metadata));
                out.extend(
                    lines
                        .iter()
                        .map(|l| self.escape(&comment(self.comment, l))),
                );
                out.push(self.end_marker());
            }
        }
    }

    /// Cell type and metadata from the text after `# +`.
    fn parse_start_marker(
        &self,
        line: &str,
        line_no: usize,
    ) -> Result<(CellType, Metadata), FormatError> {
        let rest = line
            .trim_end()
            .strip_prefix(self.comment)
            .and_then(|r| r.strip_prefix(" +"))
            .unwrap_or_default()
            .trim_start();
        let (cell_type, rest) = if let Some(r) = rest.strip_prefix("[markdown]") {
            (CellType::Markdown, r)
        } else if let Some(r) = rest.strip_prefix("[md]") {
            (CellType::Markdown, r)
        } else if let Some(r) = rest.strip_prefix("[raw]") {
            (CellType::Raw, r)
        } else {
            (CellType::Code, rest)
        };
        let rest = rest.trim();
        let metadata = if rest.is_empty() {
            Metadata::new()
        } else {
            parse_metadata_json(rest, line_no)?
        };
        Ok((cell_type, metadata))
    }
}

impl CellCodec for Light {
    fn write_cells(&self, cells: &[Cell], _language: &str) -> Vec<String> {
        let mut out = Vec::new();
        for (index, cell) in cells.iter().enumerate() {
            if index > 0 {
                out.push(String::new());
            }
            self.write_cell(cell, &mut out);
        }
        out
    }

    fn read_cells(&self, lines: &[&str], line_offset: usize) -> Result<Vec<Cell>, FormatError> {
        let mut cells = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                i += 1;
                continue;
            }

            if self.is_start_marker(line) {
                let (cell_type, metadata) = self.parse_start_marker(line, line_offset + i)?;
                let body_start = i + 1;
                let body_end = lines[body_start..]
                    .iter()
                    .position(|l| self.is_end_marker(l))
                    .map_or(lines.len(), |p| body_start + p);
                let body: Vec<&str> = lines[body_start..body_end]
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
                i = body_end + 1;
                continue;
            }

            let block_end = |from: usize, keep: &dyn Fn(&str) -> bool| {
                lines[from..]
                    .iter()
                    .position(|l| !keep(l) || self.is_start_marker(l))
                    .map_or(lines.len(), |p| from + p)
            };

            if self.is_comment(line) {
                let comments_end = block_end(i + 1, &|l| self.is_comment(l));
                let followed_by_code = lines
                    .get(comments_end)
                    .is_some_and(|l| !is_blank(l) && !self.is_start_marker(l));
                if !followed_by_code {
                    let text: Vec<&str> = lines[i..comments_end]
                        .iter()
                        .map(|&l| uncomment(self.comment, l).unwrap_or(l))
                        .collect();
                    cells.push(make_cell(CellType::Markdown, &text, Metadata::new()));
                    i = comments_end;
                    continue;
                }
            }

            let code_end = block_end(i + 1, &|l| !is_blank(l));
            cells.push(make_cell(CellType::Code, &lines[i..code_end], Metadata::new()));
            i = code_end;
        }
        Ok(cells)
    }
}

//! nbformat v4 JSON codec.
//!
//! Output mirrors what Jupyter itself writes: one-space indentation, sorted
//! keys, and `source` fields split into lists of lines. Keeping that layout
//! means a notebook rewritten by nbpair produces no spurious git diff.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::{io_err, NotebookError};
use crate::types::{Cell, CellType, Metadata, Notebook};

/// `source` and stream `text` may be a string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MultilineString {
    Single(String),
    Lines(Vec<String>),
}

impl Default for MultilineString {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl From<MultilineString> for String {
    fn from(value: MultilineString) -> Self {
        match value {
            MultilineString::Single(s) => s,
            MultilineString::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    #[serde(default)]
    cells: Vec<RawCell>,
    #[serde(default)]
    metadata: Metadata,
    nbformat: u64,
    #[serde(default)]
    nbformat_minor: u64,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: CellType,
    #[serde(default)]
    source: MultilineString,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    outputs: Vec<Value>,
    #[serde(default)]
    execution_count: Option<i64>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attachments: Option<Value>,
}

impl From<RawCell> for Cell {
    fn from(raw: RawCell) -> Self {
        let is_code = raw.cell_type == CellType::Code;
        Cell {
            cell_type: raw.cell_type,
            source: raw.source.into(),
            metadata: raw.metadata,
            outputs: if is_code { raw.outputs } else { Vec::new() },
            execution_count: if is_code { raw.execution_count } else { None },
            id: raw.id,
            attachments: raw.attachments,
        }
    }
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// Parse a notebook from its JSON text.
pub fn reads(text: &str) -> Result<Notebook, NotebookError> {
    let raw: RawNotebook = serde_json::from_str(text)?;
    if raw.nbformat != 4 {
        return Err(NotebookError::UnsupportedVersion {
            major: raw.nbformat,
            minor: raw.nbformat_minor,
        });
    }
    Ok(Notebook {
        nbformat: 4,
        nbformat_minor: raw.nbformat_minor as u32,
        metadata: raw.metadata,
        cells: raw.cells.into_iter().map(Cell::from).collect(),
    })
}

/// Read a notebook from an `.ipynb` file.
pub fn read(path: &Path) -> Result<Notebook, NotebookError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    reads(&text)
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Serialize a notebook to JSON text, with a trailing newline.
///
/// Notebooks at nbformat 4.5 or later require cell ids; cells without one get
/// a positional id that does not collide with the existing ones.
pub fn writes(nb: &Notebook) -> Result<String, NotebookError> {
    let needs_ids = nb.nbformat_minor >= 5;
    let taken: Vec<&str> = nb.cells.iter().filter_map(|c| c.id.as_deref()).collect();
    let mut generated = Vec::new();
    let mut cells = Vec::with_capacity(nb.cells.len());
    for (index, cell) in nb.cells.iter().enumerate() {
        let id = match (&cell.id, needs_ids) {
            (Some(id), _) => Some(id.clone()),
            (None, true) => {
                let id = fresh_id(index, &taken, &generated);
                generated.push(id.clone());
                Some(id)
            }
            (None, false) => None,
        };
        cells.push(cell_to_json(cell, id));
    }

    let mut root = Map::new();
    root.insert("cells".into(), Value::Array(cells));
    root.insert("metadata".into(), Value::Object(nb.metadata.clone()));
    root.insert("nbformat".into(), Value::from(nb.nbformat));
    root.insert("nbformat_minor".into(), Value::from(nb.nbformat_minor));

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
    Value::Object(root).serialize(&mut ser)?;
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    text.push('\n');
    Ok(text)
}

fn fresh_id(index: usize, taken: &[&str], generated: &[String]) -> String {
    let mut candidate = format!("cell-{index}");
    let mut n = 0;
    while taken.contains(&candidate.as_str()) || generated.contains(&candidate) {
        n += 1;
        candidate = format!("cell-{index}-{n}");
    }
    candidate
}

fn cell_to_json(cell: &Cell, id: Option<String>) -> Value {
    let mut map = Map::new();
    map.insert("cell_type".into(), Value::String(cell.cell_type.to_string()));
    if let Some(id) = id {
        map.insert("id".into(), Value::String(id));
    }
    map.insert("metadata".into(), Value::Object(cell.metadata.clone()));
    map.insert("source".into(), split_source(&cell.source));
    match cell.cell_type {
        CellType::Code => {
            map.insert(
                "execution_count".into(),
                cell.execution_count.map(Value::from).unwrap_or(Value::Null),
            );
            map.insert("outputs".into(), Value::Array(cell.outputs.clone()));
        }
        CellType::Markdown | CellType::Raw => {
            if let Some(attachments) = &cell.attachments {
                map.insert("attachments".into(), attachments.clone());
            }
        }
    }
    Value::Object(map)
}

/// `"a\nb"` → `["a\n", "b"]`; the empty string → `[]`.
fn split_source(source: &str) -> Value {
    Value::Array(
        source
            .split_inclusive('\n')
            .map(|line| Value::String(line.to_string()))
            .collect(),
    )
}

/// Write a notebook to an `.ipynb` file.
pub fn write(nb: &Notebook, path: &Path) -> Result<(), NotebookError> {
    let text = writes(nb)?;
    std::fs::write(path, text).map_err(|e| io_err(path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r##"{
 "cells": [
  {
   "cell_type": "markdown",
   "metadata": {},
   "source": ["# Title\n", "Some text"]
  },
  {
   "cell_type": "code",
   "execution_count": 3,
   "metadata": {"tags": ["parameters"]},
   "outputs": [{"name": "stdout", "output_type": "stream", "text": ["2\n"]}],
   "source": "1 + 1"
  }
 ],
 "metadata": {"kernelspec": {"display_name": "Python 3", "language": "python", "name": "python3"}},
 "nbformat": 4,
 "nbformat_minor": 4
}"##;

    #[test]
    fn reads_list_and_string_sources() {
        let nb = reads(SAMPLE).expect("parse");
        assert_eq!(nb.cells.len(), 2);
        assert_eq!(nb.cells[0].source, "# Title\nSome text");
        assert_eq!(nb.cells[1].source, "1 + 1");
        assert_eq!(nb.cells[1].execution_count, Some(3));
        assert_eq!(nb.cells[1].outputs.len(), 1);
        assert_eq!(nb.cells[1].metadata["tags"], json!(["parameters"]));
    }

    #[test]
    fn writes_jupyter_layout() {
        let nb = Notebook::new(vec![Cell::markdown("A\nB"), Cell::code("")]);
        let text = writes(&nb).expect("write");
        let expected = r#"{
 "cells": [
  {
   "cell_type": "markdown",
   "metadata": {},
   "source": [
    "A\n",
    "B"
   ]
  },
  {
   "cell_type": "code",
   "execution_count": null,
   "metadata": {},
   "outputs": [],
   "source": []
  }
 ],
 "metadata": {},
 "nbformat": 4,
 "nbformat_minor": 4
}
"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn write_then_read_preserves_outputs_and_metadata() {
        let nb = reads(SAMPLE).expect("parse");
        let again = reads(&writes(&nb).expect("write")).expect("reparse");
        assert_eq!(nb, again);
    }

    #[test]
    fn ids_are_generated_for_nbformat_4_5() {
        let mut nb = Notebook::new(vec![Cell::code("a"), Cell::code("b")]);
        nb.nbformat_minor = 5;
        nb.cells[1].id = Some("cell-0".into());

        let parsed = reads(&writes(&nb).expect("write")).expect("reparse");
        let ids: Vec<_> = parsed.cells.iter().map(|c| c.id.clone().unwrap()).collect();
        assert_eq!(ids[1], "cell-0");
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn rejects_nbformat_3() {
        let err = reads(r#"{"nbformat": 3, "nbformat_minor": 0, "worksheets": []}"#).unwrap_err();
        assert!(matches!(err, NotebookError::UnsupportedVersion { major: 3, .. }));
    }

    #[test]
    fn markdown_cells_drop_outputs() {
        let text = r#"{"cells": [{"cell_type": "markdown", "metadata": {}, "source": "x", "outputs": []}],
                      "metadata": {}, "nbformat": 4, "nbformat_minor": 4}"#;
        let nb = reads(text).expect("parse");
        let out = writes(&nb).expect("write");
        assert!(!out.contains("outputs"));
    }
}

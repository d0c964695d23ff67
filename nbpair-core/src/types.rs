//! Domain types for notebooks.
//!
//! Cell sources are stored as a single `String` without a trailing newline,
//! whatever representation they were read from. Metadata stays as raw JSON
//! objects so that keys we do not know about survive a round trip.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding pairing information (`{"jupytext": {"formats": ...}}`).
pub const PAIRING_KEY: &str = "jupytext";

/// Key under [`PAIRING_KEY`] holding the comma-separated formats string.
pub const FORMATS_KEY: &str = "formats";

/// A JSON object, as used for notebook and cell metadata.
pub type Metadata = Map<String, Value>;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The kind of a notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    #[default]
    Code,
    Markdown,
    Raw,
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellType::Code => write!(f, "code"),
            CellType::Markdown => write!(f, "markdown"),
            CellType::Raw => write!(f, "raw"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A single notebook cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub cell_type: CellType,
    pub source: String,
    pub metadata: Metadata,
    /// Code cells only.
    pub outputs: Vec<Value>,
    /// Code cells only.
    pub execution_count: Option<i64>,
    pub id: Option<String>,
    /// Markdown/raw attachments, kept verbatim.
    pub attachments: Option<Value>,
}

impl Cell {
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Self {
            cell_type,
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn code(source: impl Into<String>) -> Self {
        Self::new(CellType::Code, source)
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        Self::new(CellType::Markdown, source)
    }

    pub fn raw(source: impl Into<String>) -> Self {
        Self::new(CellType::Raw, source)
    }

    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    /// Source split into lines. An empty source has no lines.
    pub fn lines(&self) -> Vec<&str> {
        if self.source.is_empty() {
            Vec::new()
        } else {
            self.source.split('\n').collect()
        }
    }
}

/// An nbformat v4 notebook.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    pub nbformat: u32,
    pub nbformat_minor: u32,
    pub metadata: Metadata,
    pub cells: Vec<Cell>,
}

impl Default for Notebook {
    fn default() -> Self {
        Self {
            nbformat: 4,
            nbformat_minor: 4,
            metadata: Metadata::new(),
            cells: Vec::new(),
        }
    }
}

impl Notebook {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    /// The pairing string stored in `metadata.jupytext.formats`, if any.
    pub fn formats(&self) -> Option<&str> {
        self.metadata
            .get(PAIRING_KEY)?
            .get(FORMATS_KEY)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Set or remove the pairing string.
    ///
    /// Removing the last key also removes the `jupytext` object itself.
    pub fn set_formats(&mut self, formats: Option<&str>) {
        match formats.filter(|f| !f.is_empty()) {
            Some(formats) => {
                let entry = self
                    .metadata
                    .entry(PAIRING_KEY)
                    .or_insert_with(|| Value::Object(Metadata::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Metadata::new());
                }
                if let Value::Object(map) = entry {
                    map.insert(FORMATS_KEY.to_string(), Value::String(formats.to_string()));
                }
            }
            None => {
                let now_empty = match self.metadata.get_mut(PAIRING_KEY) {
                    Some(Value::Object(map)) => {
                        map.remove(FORMATS_KEY);
                        map.is_empty()
                    }
                    Some(_) => true,
                    None => false,
                };
                if now_empty {
                    self.metadata.remove(PAIRING_KEY);
                }
            }
        }
    }

    /// Programming language of the notebook's code cells.
    ///
    /// Looks at `kernelspec.language`, then `language_info.name`, and falls
    /// back to `python`.
    pub fn language(&self) -> String {
        let lookup = |outer: &str, inner: &str| {
            self.metadata
                .get(outer)
                .and_then(|v| v.get(inner))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        lookup("kernelspec", "language")
            .or_else(|| lookup("language_info", "name"))
            .unwrap_or_else(|| "python".to_string())
    }

    /// `language_info.file_extension` without its leading dot.
    pub fn file_extension(&self) -> Option<String> {
        self.metadata
            .get("language_info")?
            .get("file_extension")?
            .as_str()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
    }

    /// Same cells (type and source) in the same order.
    ///
    /// Outputs and metadata are ignored: this is the equivalence that holds
    /// between a notebook and its text representation.
    pub fn same_content(&self, other: &Notebook) -> bool {
        self.cells.len() == other.cells.len()
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| a.cell_type == b.cell_type && a.source == b.source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_type_display() {
        assert_eq!(CellType::Code.to_string(), "code");
        assert_eq!(CellType::Markdown.to_string(), "markdown");
        assert_eq!(CellType::Raw.to_string(), "raw");
    }

    #[test]
    fn set_and_read_formats() {
        let mut nb = Notebook::default();
        assert_eq!(nb.formats(), None);

        nb.set_formats(Some("ipynb,py:percent"));
        assert_eq!(nb.formats(), Some("ipynb,py:percent"));
        assert_eq!(nb.metadata["jupytext"]["formats"], json!("ipynb,py:percent"));
    }

    #[test]
    fn removing_formats_drops_empty_pairing_object() {
        let mut nb = Notebook::default();
        nb.set_formats(Some("ipynb,md"));
        nb.set_formats(None);
        assert!(!nb.metadata.contains_key(PAIRING_KEY));
    }

    #[test]
    fn removing_formats_keeps_other_pairing_keys() {
        let mut nb = Notebook::default();
        nb.metadata.insert(
            PAIRING_KEY.to_string(),
            json!({"formats": "ipynb,md", "notebook_metadata_filter": "-all"}),
        );
        nb.set_formats(Some(""));
        assert_eq!(
            nb.metadata[PAIRING_KEY],
            json!({"notebook_metadata_filter": "-all"})
        );
    }

    #[test]
    fn language_prefers_kernelspec() {
        let mut nb = Notebook::default();
        assert_eq!(nb.language(), "python");

        nb.metadata
            .insert("language_info".into(), json!({"name": "julia", "file_extension": ".jl"}));
        assert_eq!(nb.language(), "julia");
        assert_eq!(nb.file_extension().as_deref(), Some("jl"));

        nb.metadata
            .insert("kernelspec".into(), json!({"language": "R", "name": "ir"}));
        assert_eq!(nb.language(), "R");
    }

    #[test]
    fn same_content_ignores_outputs() {
        let mut executed = Cell::code("1 + 1");
        executed.outputs.push(json!({"output_type": "stream", "text": "2"}));
        executed.execution_count = Some(1);

        let a = Notebook::new(vec![Cell::markdown("# Title"), executed]);
        let b = Notebook::new(vec![Cell::markdown("# Title"), Cell::code("1 + 1")]);
        assert!(a.same_content(&b));

        let c = Notebook::new(vec![Cell::markdown("# Title"), Cell::code("1 + 2")]);
        assert!(!a.same_content(&c));
    }

    #[test]
    fn lines_of_empty_cell() {
        assert!(Cell::code("").lines().is_empty());
        assert_eq!(Cell::code("a\n\nb").lines(), vec!["a", "", "b"]);
    }
}

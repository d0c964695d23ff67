//! Conversion engine. [`Converter`] dispatches a [`FormatSpec`] to its codec.
//!
//! | Extension           | Codec                          | Header       |
//! |---------------------|--------------------------------|--------------|
//! | `ipynb`             | `nbpair_core::ipynb`           | n/a          |
//! | `md`, `markdown`    | [`Markdown`]                   | `---`        |
//! | scripts, `:light`   | [`Light`]                      | `# ---`      |
//! | scripts, `:percent` | [`Percent`]                    | `# ---`      |

use std::path::Path;

use serde_json::json;

use nbpair_core::error::io_err;
use nbpair_core::{ipynb, Notebook};

use crate::cells::CellCodec;
use crate::error::{invalid_format, FormatError};
use crate::format::{script_language, FormatName, FormatSpec, Representation};
use crate::header::{header_metadata, parse_header, render_header};
use crate::light::Light;
use crate::markdown::Markdown;
use crate::percent::Percent;

/// Reads and writes notebooks in any supported format.
///
/// The only state is the format name used for scripts whose format string
/// does not give one (from the `default_format_name` configuration key).
#[derive(Debug, Clone, Copy, Default)]
pub struct Converter {
    default_script_name: Option<FormatName>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_format_name(default_script_name: Option<FormatName>) -> Self {
        Self {
            default_script_name,
        }
    }

    /// Parse `text` as a notebook in format `fmt`.
    pub fn reads(&self, text: &str, fmt: &FormatSpec) -> Result<Notebook, FormatError> {
        let text = text.replace("\r\n", "\n");
        let comment = match representation(fmt)? {
            Representation::Ipynb => return Ok(ipynb::reads(&text)?),
            Representation::Markdown => None,
            Representation::Script { comment } => Some(comment),
        };

        let lines: Vec<&str> = text.lines().collect();
        let (metadata, consumed) = parse_header(&lines, comment)?;
        let body = &lines[consumed..];

        let cells = match comment {
            None => Markdown.read_cells(body, consumed)?,
            Some(comment) => {
                let name = fmt.format_name.unwrap_or_else(|| {
                    let percent = Percent::new(comment);
                    if body.iter().any(|l| percent.is_marker(l)) {
                        FormatName::Percent
                    } else {
                        self.default_script_name.unwrap_or(FormatName::Light)
                    }
                });
                tracing::debug!(format = %fmt, %name, "reading script");
                script_codec(name, comment).read_cells(body, consumed)?
            }
        };

        let mut nb = Notebook::new(cells);
        nb.metadata = metadata;
        if let Some((language, _)) = script_language(&fmt.extension) {
            fill_language(&mut nb, language);
        }
        Ok(nb)
    }

    /// Serialize `nb` in format `fmt`. `auto` resolves against the notebook.
    pub fn writes(&self, nb: &Notebook, fmt: &FormatSpec) -> Result<String, FormatError> {
        let fmt = fmt.resolve_auto(nb);
        let (comment, codec): (Option<&str>, Box<dyn CellCodec>) = match representation(&fmt)? {
            Representation::Ipynb => return Ok(ipynb::writes(nb)?),
            Representation::Markdown => (None, Box::new(Markdown) as Box<dyn CellCodec>),
            Representation::Script { comment } => {
                let name = fmt
                    .effective_name(self.default_script_name)
                    .unwrap_or(FormatName::Light);
                (Some(comment), script_codec(name, comment))
            }
        };

        let mut lines = render_header(&header_metadata(nb), comment)?;
        let body = codec.write_cells(&nb.cells, &nb.language());
        if !lines.is_empty() && !body.is_empty() {
            lines.push(String::new());
        }
        lines.extend(body);

        if lines.is_empty() {
            return Ok(String::new());
        }
        let mut text = lines.join("\n");
        text.push('\n');
        Ok(text)
    }

    /// Read the notebook at `path`, in `fmt` or the format implied by its
    /// extension.
    pub fn read_path(&self, path: &Path, fmt: Option<&FormatSpec>) -> Result<Notebook, FormatError> {
        let fmt = match fmt {
            Some(fmt) => fmt.clone(),
            None => format_of(path)?,
        };
        let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        self.reads(&text, &fmt)
    }

    /// Write `nb` to `path`, in `fmt` or the format implied by its extension.
    pub fn write_path(
        &self,
        nb: &Notebook,
        path: &Path,
        fmt: Option<&FormatSpec>,
    ) -> Result<(), FormatError> {
        let fmt = match fmt {
            Some(fmt) => fmt.clone(),
            None => format_of(path)?,
        };
        let text = self.writes(nb, &fmt)?;
        std::fs::write(path, text).map_err(|e| io_err(path, e))?;
        Ok(())
    }
}

/// [`Converter::reads`] with default settings.
pub fn reads(text: &str, fmt: &FormatSpec) -> Result<Notebook, FormatError> {
    Converter::new().reads(text, fmt)
}

/// [`Converter::writes`] with default settings.
pub fn writes(nb: &Notebook, fmt: &FormatSpec) -> Result<String, FormatError> {
    Converter::new().writes(nb, fmt)
}

fn format_of(path: &Path) -> Result<FormatSpec, FormatError> {
    FormatSpec::from_path(path).ok_or_else(|| {
        invalid_format(
            &path.display().to_string(),
            "cannot infer the format from the file extension",
        )
    })
}

fn representation(fmt: &FormatSpec) -> Result<Representation, FormatError> {
    fmt.representation().ok_or_else(|| {
        invalid_format(
            &fmt.to_string(),
            "the 'auto' extension needs a notebook to resolve against",
        )
    })
}

fn script_codec(name: FormatName, comment: &'static str) -> Box<dyn CellCodec> {
    match name {
        FormatName::Percent => Box::new(Percent::new(comment)),
        FormatName::Light | FormatName::Markdown => Box::new(Light::new(comment)),
    }
}

/// Record the script language on notebooks read from non-Python scripts that
/// carry no kernel information.
fn fill_language(nb: &mut Notebook, language: &str) {
    let known = nb.metadata.contains_key("kernelspec") || nb.metadata.contains_key("language_info");
    if known || language == "python" {
        return;
    }
    nb.metadata
        .insert("language_info".to_string(), json!({ "name": language }));
}

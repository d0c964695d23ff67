//! Format specifications: `[prefix//][suffix.]ext[:name]`.
//!
//! | Spec                  | prefix        | tree | suffix  | ext     | name    |
//! |-----------------------|---------------|------|---------|---------|---------|
//! | `ipynb`               |               | no   |         | ipynb   |         |
//! | `py:percent`          |               | no   |         | py      | percent |
//! | `.pct.py:percent`     |               | no   | `.pct`  | py      | percent |
//! | `python//py:light`    | `python`      | no   |         | py      | light   |
//! | `notebooks///ipynb`   | `notebooks`   | yes  |         | ipynb   |         |
//! | `auto:percent`        |               | no   |         | auto    | percent |

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use nbpair_core::Notebook;

use crate::error::{invalid_format, FormatError};

/// Extension that resolves to the notebook's own script extension.
pub const AUTO_EXTENSION: &str = "auto";

/// Script extensions with their language and line-comment token.
const SCRIPT_LANGUAGES: &[(&str, &str, &str)] = &[
    ("py", "python", "#"),
    ("R", "R", "#"),
    ("r", "R", "#"),
    ("jl", "julia", "#"),
    ("sh", "bash", "#"),
    ("ps1", "powershell", "#"),
    ("js", "javascript", "//"),
    ("ts", "typescript", "//"),
    ("rs", "rust", "//"),
    ("scala", "scala", "//"),
    ("java", "java", "//"),
    ("cpp", "c++", "//"),
    ("c", "c", "//"),
    ("go", "go", "//"),
    ("m", "matlab", "%"),
];

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

// ---------------------------------------------------------------------------
// FormatName
// ---------------------------------------------------------------------------

/// How cells are laid out in a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatName {
    /// Plain code, Markdown as comments, explicit `# +` markers only when needed.
    Light,
    /// Every cell introduced by a `# %%` marker.
    Percent,
    /// Markdown document with fenced code cells.
    Markdown,
}

impl FormatName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatName::Light => "light",
            FormatName::Percent => "percent",
            FormatName::Markdown => "markdown",
        }
    }
}

impl fmt::Display for FormatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(FormatName::Light),
            "percent" => Ok(FormatName::Percent),
            "markdown" | "md" => Ok(FormatName::Markdown),
            other => Err(format!(
                "unknown format name '{other}'; expected: light, percent, markdown"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Representation
// ---------------------------------------------------------------------------

/// The family of file a format extension belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Ipynb,
    Markdown,
    Script { comment: &'static str },
}

// ---------------------------------------------------------------------------
// FormatSpec
// ---------------------------------------------------------------------------

/// One member of a pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatSpec {
    /// Directory segments the file lives under, relative to the base.
    pub prefix: Vec<String>,
    /// Mirror the sub-folder tree found below the prefix root.
    pub tree: bool,
    /// Text between the file stem and the extension.
    pub suffix: String,
    /// Extension without the leading dot.
    pub extension: String,
    pub format_name: Option<FormatName>,
}

impl FormatSpec {
    /// Plain format for an extension, without prefix or suffix.
    pub fn for_extension(extension: &str) -> Result<Self, FormatError> {
        extension.trim_start_matches('.').parse()
    }

    /// `ipynb`.
    pub fn ipynb() -> Self {
        Self {
            prefix: Vec::new(),
            tree: false,
            suffix: String::new(),
            extension: "ipynb".to_string(),
            format_name: None,
        }
    }

    /// The format implied by a file's extension.
    ///
    /// Returns `None` for files that are neither notebooks nor known text
    /// representations.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if representation_of(ext).is_none() {
            return None;
        }
        Some(Self {
            prefix: Vec::new(),
            tree: false,
            suffix: String::new(),
            extension: ext.to_string(),
            format_name: None,
        })
    }

    pub fn representation(&self) -> Option<Representation> {
        representation_of(&self.extension)
    }

    pub fn is_ipynb(&self) -> bool {
        self.extension == "ipynb"
    }

    pub fn is_auto(&self) -> bool {
        self.extension == AUTO_EXTENSION
    }

    /// `suffix.ext`, the expected ending of a file name in this format.
    pub fn file_ending(&self) -> String {
        format!("{}.{}", self.suffix, self.extension)
    }

    /// The format name, with the extension's default when none was given.
    ///
    /// `default_script_name` applies to script extensions (from configuration);
    /// without it scripts default to [`FormatName::Light`].
    pub fn effective_name(&self, default_script_name: Option<FormatName>) -> Option<FormatName> {
        match self.representation()? {
            Representation::Ipynb => None,
            Representation::Markdown => Some(FormatName::Markdown),
            Representation::Script { .. } => Some(
                self.format_name
                    .or(default_script_name)
                    .unwrap_or(FormatName::Light),
            ),
        }
    }

    /// Replace `auto` with the notebook's script extension.
    pub fn resolve_auto(&self, nb: &Notebook) -> FormatSpec {
        if !self.is_auto() {
            return self.clone();
        }
        let extension = nb
            .file_extension()
            .filter(|ext| script_language(ext).is_some())
            .or_else(|| extension_for_language(&nb.language()).map(str::to_string))
            .unwrap_or_else(|| "py".to_string());
        FormatSpec {
            extension,
            ..self.clone()
        }
    }

    /// Same file layout (prefix, suffix, extension); format names may differ.
    pub fn same_location(&self, other: &FormatSpec) -> bool {
        self.prefix == other.prefix
            && self.tree == other.tree
            && self.suffix == other.suffix
            && self.extension == other.extension
    }
}

impl FromStr for FormatSpec {
    type Err = FormatError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(invalid_format(spec, "empty format"));
        }

        let (location, name) = match trimmed.rsplit_once(':') {
            Some((location, name)) if !name.contains('/') => (location, Some(name)),
            _ => (trimmed, None),
        };

        let (prefix_part, file_part) = match location.rsplit_once('/') {
            Some((prefix, file)) => (Some(prefix), file),
            None => (None, location),
        };

        let (prefix, tree) = match prefix_part {
            None => (Vec::new(), false),
            Some(p) => {
                if p.starts_with('/') {
                    return Err(invalid_format(spec, "prefix must be relative"));
                }
                let tree = p.ends_with("//");
                let segments: Vec<String> = p
                    .split('/')
                    .filter(|s| !s.is_empty() && *s != ".")
                    .map(str::to_string)
                    .collect();
                if segments.iter().any(|s| s == "..") {
                    return Err(invalid_format(spec, "parent directory prefixes are not supported"));
                }
                if tree && segments.is_empty() {
                    return Err(invalid_format(spec, "a tree prefix needs a root folder"));
                }
                (segments, tree)
            }
        };

        let (suffix, extension) = match file_part.rsplit_once('.') {
            Some((suffix, ext)) => (suffix.to_string(), ext.to_string()),
            None => (String::new(), file_part.to_string()),
        };
        if extension != AUTO_EXTENSION && representation_of(&extension).is_none() {
            return Err(invalid_format(
                spec,
                format!("unknown extension '.{extension}'"),
            ));
        }

        let format_name = match name {
            None | Some("") => None,
            Some(name) => Some(name.parse::<FormatName>().map_err(|e| invalid_format(spec, e))?),
        };

        let parsed = FormatSpec {
            prefix,
            tree,
            suffix,
            extension,
            format_name,
        };
        validate_name(spec, &parsed)?;
        Ok(parsed)
    }
}

fn validate_name(spec: &str, fmt: &FormatSpec) -> Result<(), FormatError> {
    let Some(name) = fmt.format_name else {
        return Ok(());
    };
    let ok = match (fmt.representation(), name) {
        (Some(Representation::Ipynb), _) => false,
        (Some(Representation::Markdown), FormatName::Markdown) => true,
        (Some(Representation::Markdown), _) => false,
        (Some(Representation::Script { .. }), FormatName::Markdown) => false,
        (Some(Representation::Script { .. }), _) => true,
        // `auto` resolves to a script extension.
        (None, FormatName::Markdown) => false,
        (None, _) => true,
    };
    if ok {
        Ok(())
    } else {
        Err(invalid_format(
            spec,
            format!("format name '{name}' does not apply to '.{}'", fmt.extension),
        ))
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, "{}", self.prefix.join("/"))?;
            f.write_str(if self.tree { "///" } else { "//" })?;
        }
        if self.suffix.is_empty() {
            f.write_str(&self.extension)?;
        } else {
            write!(f, "{}.{}", self.suffix, self.extension)?;
        }
        if let Some(name) = self.format_name {
            write!(f, ":{name}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a comma-separated formats string, as stored in notebook metadata.
pub fn parse_formats(formats: &str) -> Result<Vec<FormatSpec>, FormatError> {
    formats
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Render a list of formats back to a metadata string.
pub fn formats_to_string(formats: &[FormatSpec]) -> String {
    formats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn representation_of(extension: &str) -> Option<Representation> {
    if extension == "ipynb" {
        return Some(Representation::Ipynb);
    }
    if MARKDOWN_EXTENSIONS.contains(&extension) {
        return Some(Representation::Markdown);
    }
    script_language(extension).map(|(_, comment)| Representation::Script { comment })
}

/// Language and comment token of a script extension.
pub fn script_language(extension: &str) -> Option<(&'static str, &'static str)> {
    SCRIPT_LANGUAGES
        .iter()
        .find(|(ext, _, _)| *ext == extension)
        .map(|(_, language, comment)| (*language, *comment))
}

/// Script extension for a kernel language name (case-insensitive).
pub fn extension_for_language(language: &str) -> Option<&'static str> {
    let language = language.to_ascii_lowercase();
    SCRIPT_LANGUAGES
        .iter()
        .find(|(_, lang, _)| lang.to_ascii_lowercase() == language)
        .map(|(ext, _, _)| *ext)
}

/// Whether files with this extension can be read as notebooks.
pub fn is_notebook_extension(extension: &str) -> bool {
    representation_of(extension).is_some()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

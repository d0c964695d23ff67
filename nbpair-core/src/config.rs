//! Pairing configuration files.
//!
//! # Lookup
//!
//! ```text
//! <notebook dir>/jupytext.toml       nearest file wins; every ancestor is
//! <notebook dir>/../jupytext.toml    searched up to the filesystem root
//! ...
//! <config_dir>/jupytext/jupytext.toml   user-wide fallback
//! ```
//!
//! TOML and YAML files are accepted under the names in [`CONFIG_FILE_NAMES`].
//!
//! # API pattern
//!
//! - `fn_at(…, user_config_dir: Option<&Path>)`: explicit user directory; used
//!   in tests with `TempDir`
//! - `fn(…)`: derives the user directory from `dirs::config_dir()`, delegates
//!   to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, NotebookError};

/// Configuration file names, in lookup order within one directory.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "jupytext.toml",
    ".jupytext.toml",
    "jupytext.yml",
    "jupytext.yaml",
    ".jupytext.yml",
    ".jupytext.yaml",
];

/// Settings read from a configuration file. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct PairingConfig {
    /// Default pairing, e.g. `"notebooks///ipynb,scripts///py:percent"`.
    ///
    /// Read from `formats`, or from the older `default_jupytext_formats`
    /// when `formats` is absent.
    pub formats: Option<String>,

    /// Format name for script extensions given without one (`light` or `percent`).
    pub default_format_name: Option<String>,
}

/// The keys of a configuration file as written.
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    formats: Option<String>,
    #[serde(default)]
    default_jupytext_formats: Option<String>,
    #[serde(default)]
    default_format_name: Option<String>,
}

impl From<ConfigFile> for PairingConfig {
    fn from(file: ConfigFile) -> Self {
        if file.formats.is_some() && file.default_jupytext_formats.is_some() {
            tracing::debug!("both formats and default_jupytext_formats are set; using formats");
        }
        Self {
            formats: file.formats.or(file.default_jupytext_formats),
            default_format_name: file.default_format_name,
        }
    }
}

/// A configuration together with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: PairingConfig,
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Parse a single configuration file; the syntax follows the extension.
pub fn load_config(path: &Path) -> Result<PairingConfig, NotebookError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str::<Option<PairingConfig>>(&contents)
            .map(Option::unwrap_or_default)
            .map_err(|e| e.to_string())
    } else {
        toml::from_str::<PairingConfig>(&contents).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| NotebookError::Config {
        path: path.to_path_buf(),
        message,
    })
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Nearest configuration file for a notebook located in `dir`.
pub fn find_config_file_at(dir: &Path, user_config_dir: Option<&Path>) -> Option<PathBuf> {
    for ancestor in dir.ancestors() {
        for name in CONFIG_FILE_NAMES {
            let candidate = ancestor.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    let user_dir = user_config_dir?;
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| user_dir.join(name.trim_start_matches('.')))
        .find(|candidate| candidate.is_file())
}

/// Load the nearest configuration for a notebook located in `dir`.
///
/// Returns `Ok(None)` when no configuration file exists.
pub fn find_config_at(
    dir: &Path,
    user_config_dir: Option<&Path>,
) -> Result<Option<LoadedConfig>, NotebookError> {
    let Some(path) = find_config_file_at(dir, user_config_dir) else {
        return Ok(None);
    };
    let config = load_config(&path)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(Some(LoadedConfig { path, config }))
}

/// `<config_dir>/jupytext`, the user-wide configuration directory.
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jupytext"))
}

/// `find_config_at` convenience wrapper.
pub fn find_config(dir: &Path) -> Result<Option<LoadedConfig>, NotebookError> {
    find_config_at(dir, user_config_dir().as_deref())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

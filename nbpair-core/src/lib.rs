//! nbpair core library: notebook model, `.ipynb` codec, configuration, errors.
//!
//! - [`types`]: [`Notebook`], [`Cell`], [`CellType`]
//! - [`ipynb`]: nbformat v4 JSON read / write
//! - [`config`]: `jupytext.toml` discovery and parsing
//! - [`error`]: [`NotebookError`]

pub mod config;
pub mod error;
pub mod ipynb;
pub mod types;

pub use config::{LoadedConfig, PairingConfig};
pub use error::NotebookError;
pub use types::{Cell, CellType, Metadata, Notebook};

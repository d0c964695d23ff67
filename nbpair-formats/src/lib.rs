//! # nbpair-formats
//!
//! Text representations of notebooks and the paths that pair them.
//!
//! - [`format`]: `[prefix//][suffix.]ext[:name]` format specifications
//! - [`paired`]: base paths and paired file paths
//! - [`engine`]: [`Converter`] reads and writes a notebook in any format
//! - [`light`], [`percent`], [`markdown`]: cell codecs
//! - [`header`]: YAML front matter
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nbpair_formats::{parse_formats, resolve_pairing, Converter};
//! use std::path::Path;
//!
//! fn mirror(path: &Path) -> Result<(), nbpair_formats::FormatError> {
//!     let formats = parse_formats("ipynb,py:percent")?;
//!     let converter = Converter::new();
//!     if let Some((fmt, paired)) = resolve_pairing(path, &formats)? {
//!         let nb = converter.read_path(path, Some(&fmt))?;
//!         for file in paired {
//!             println!("{}", converter.writes(&nb, &file.format)?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cells;
pub mod engine;
pub mod error;
pub mod format;
pub mod header;
pub mod light;
pub mod markdown;
pub mod paired;
pub mod percent;

pub use engine::{reads, writes, Converter};
pub use error::FormatError;
pub use format::{
    formats_to_string, is_notebook_extension, parse_formats, FormatName, FormatSpec,
    Representation,
};
pub use paired::{base_path, find_format, full_path, paired_paths, resolve_pairing, BasePath, PairedFile};

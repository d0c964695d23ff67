//! # nbpair-sync
//!
//! Keep paired notebook files in step.
//!
//! Call [`sync_notebook`] to update every member of a notebook's pairing from
//! the most recently edited one, or [`convert_notebook`] to write a single
//! destination format. Files are only rewritten when their content changes.

pub mod combine;
pub mod diff;
pub mod error;
pub mod freshness;
pub mod git;
pub mod pipe;
pub mod pipeline;
pub mod writer;

pub use combine::combine_inputs_with_outputs;
pub use diff::{diff_file, diff_text, FileDiff};
pub use error::SyncError;
pub use freshness::{latest_inputs_and_outputs, FreshnessSignal, SourceFile, SyncSources};
pub use pipeline::{
    convert_notebook, convert_text, convert_to_text, paired_paths_of, sync_notebook,
    test_round_trip, ConvertOptions, ConvertOutcome, FileChange, Report, SyncOptions,
    SyncOutcome,
};
pub use writer::{write_if_changed, WriteResult};

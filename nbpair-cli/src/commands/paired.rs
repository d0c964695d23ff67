//! `--paired-paths`: list the other files of a notebook's pairing.

use std::path::Path;

use anyhow::{Context, Result};

use nbpair_sync::paired_paths_of;

use super::Session;

pub fn run(notebook: &Path, session: &Session) -> Result<()> {
    let paired = paired_paths_of(notebook, session.sync_options())
        .with_context(|| format!("failed to read {}", notebook.display()))?;
    for file in paired {
        println!("{}", file.path.display());
    }
    Ok(())
}

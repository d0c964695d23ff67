//! `--sync` and `--set-formats`: update every file of a pairing.

use std::path::Path;

use anyhow::{bail, Context, Result};

use nbpair_sync::{sync_notebook, Report, SyncOutcome};

use super::{print_report, Session};

pub fn run(notebook: &Path, session: &Session) -> Result<Option<Report>> {
    if session.convert.output.is_some() {
        bail!("--output cannot be used with --sync or --set-formats");
    }

    let outcome = sync_notebook(notebook, session.sync_options())
        .with_context(|| format!("failed to sync {}", notebook.display()))?;
    match outcome {
        SyncOutcome::NotPaired { path } => {
            if !session.quiet && !(session.pre_commit || session.pre_commit_mode) {
                println!("· {} is not paired", path.display());
            }
            Ok(None)
        }
        SyncOutcome::Synced(report) => {
            if report.inputs != report.path {
                tracing::info!("{} read from {}", report.path.display(), report.inputs.display());
            }
            print_report("synced", &report, session);
            Ok(Some(report))
        }
    }
}

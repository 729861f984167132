use std::fs;
use std::io;

use tracing::{debug, error};

use super::{ActionExecutor, ItemOutcome, Plan};
use crate::catalog::{AssetRef, Catalog};
use crate::error::Error;
use crate::progress::ProgressReporter;

/// Remove each target in turn. A file that is already gone counts as skipped.
pub(crate) fn delete_all(
    executor: &ActionExecutor<'_>,
    plan: &Plan,
    catalog: &Catalog,
    reporter: &dyn ProgressReporter,
) -> Vec<(AssetRef, ItemOutcome)> {
    let mut outcomes = Vec::with_capacity(plan.targets.len());
    for &asset_ref in &plan.targets {
        let asset = catalog.asset(asset_ref);
        let outcome = if executor.is_cancelled() {
            ItemOutcome::Failed(Error::Cancelled.to_string())
        } else {
            let path = executor.root.asset_path(asset);
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Deleted {}", path.display());
                    reporter.on_transfer_progress(size);
                    ItemOutcome::Succeeded { bytes: size }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("{} was already gone", path.display());
                    ItemOutcome::Skipped
                }
                Err(e) => {
                    error!("Failed to remove '{}': {}", path.display(), e);
                    ItemOutcome::Failed(e.to_string())
                }
            }
        };
        reporter.on_item_complete(&asset.label, &outcome);
        outcomes.push((asset_ref, outcome));
    }
    outcomes
}

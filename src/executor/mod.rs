pub mod delete;
pub mod download;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{AssetRef, Catalog};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::storage::{PresenceMap, SpaceProbe, StorageRoot};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Download,
    Delete,
}

impl Action {
    /// `d` downloads, `x` deletes.
    pub fn from_key(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "d" => Some(Action::Download),
            "x" => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Action::Download => "download",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded { bytes: u64 },
    Skipped,
    Failed(String),
}

/// What an action did, per asset.
#[derive(Debug, Clone)]
pub struct Report {
    pub action: Action,
    pub succeeded: BTreeSet<AssetRef>,
    pub skipped: BTreeSet<AssetRef>,
    pub failed: BTreeMap<AssetRef, String>,
    pub total_bytes_processed: u64,
}

impl Report {
    fn new(action: Action) -> Self {
        Self {
            action,
            succeeded: BTreeSet::new(),
            skipped: BTreeSet::new(),
            failed: BTreeMap::new(),
            total_bytes_processed: 0,
        }
    }

    fn record(&mut self, asset: AssetRef, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded { bytes } => {
                self.succeeded.insert(asset);
                self.total_bytes_processed += bytes;
            }
            ItemOutcome::Skipped => {
                self.skipped.insert(asset);
            }
            ItemOutcome::Failed(reason) => {
                self.failed.insert(asset, reason);
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A checked action waiting for the operator's confirmation.
#[derive(Debug, Clone)]
pub struct Plan {
    pub action: Action,
    /// Assets the action will touch.
    pub targets: Vec<AssetRef>,
    /// Already satisfied: complete for downloads, absent for deletes.
    pub skipped: Vec<AssetRef>,
    /// Bytes to transfer or to free.
    pub total_bytes: u64,
    /// Free space on the target volume, probed for downloads only.
    pub available: Option<u64>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub struct ActionExecutor<'a> {
    root: &'a StorageRoot,
    transport: &'a dyn Transport,
    space: &'a dyn SpaceProbe,
    config: &'a AppConfig,
    cancel: Arc<AtomicBool>,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(
        root: &'a StorageRoot,
        transport: &'a dyn Transport,
        space: &'a dyn SpaceProbe,
        config: &'a AppConfig,
    ) -> Self {
        Self {
            root,
            transport,
            space,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops queued items once set. Completed files stay in place.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Re-probe the selection and work out what the action would do.
    ///
    /// Downloads fail here with `InsufficientSpace` before anything is written.
    pub fn plan(
        &self,
        action: Action,
        selection: &[AssetRef],
        catalog: &Catalog,
        presence: &mut PresenceMap,
    ) -> Result<Plan> {
        presence.refresh(catalog, self.root, selection);

        let mut targets = Vec::new();
        let mut skipped = Vec::new();
        let mut total_bytes = 0u64;
        for &asset in selection {
            let status = presence.get(asset);
            let expected = catalog.asset(asset).size;
            match action {
                Action::Download if status.is_complete() => skipped.push(asset),
                Action::Download => {
                    total_bytes += expected;
                    targets.push(asset);
                }
                Action::Delete if !status.is_present() => skipped.push(asset),
                Action::Delete => {
                    total_bytes += status.on_disk_size(expected);
                    targets.push(asset);
                }
            }
        }

        let available = match action {
            Action::Download if !targets.is_empty() => {
                let available = self.space.available_space(&self.root.video_dir())?;
                if total_bytes > available {
                    return Err(Error::InsufficientSpace {
                        required: total_bytes,
                        available,
                    });
                }
                Some(available)
            }
            _ => None,
        };

        debug!(
            "Planned {}: {} targets, {} skipped, {} bytes",
            action,
            targets.len(),
            skipped.len(),
            total_bytes
        );
        Ok(Plan {
            action,
            targets,
            skipped,
            total_bytes,
            available,
        })
    }

    /// Carry out a plan. Per-asset failures are recorded, never returned.
    /// Every selected asset is re-probed afterwards.
    pub fn execute(
        &self,
        plan: &Plan,
        catalog: &Catalog,
        presence: &mut PresenceMap,
        reporter: &dyn ProgressReporter,
    ) -> Report {
        let mut report = Report::new(plan.action);
        for &asset in &plan.skipped {
            report.record(asset, ItemOutcome::Skipped);
        }

        reporter.on_transfer_start(plan.total_bytes, plan.targets.len());
        let outcomes = match plan.action {
            Action::Download => download::download_all(self, plan, catalog, reporter),
            Action::Delete => delete::delete_all(self, plan, catalog, reporter),
        };
        for (asset, outcome) in outcomes {
            report.record(asset, outcome);
        }

        let touched: Vec<AssetRef> = plan
            .targets
            .iter()
            .chain(plan.skipped.iter())
            .copied()
            .collect();
        presence.refresh(catalog, self.root, &touched);

        info!(
            "{} finished: {} succeeded, {} skipped, {} failed, {} bytes",
            plan.action,
            report.succeeded.len(),
            report.skipped.len(),
            report.failed.len(),
            report.total_bytes_processed
        );
        reporter.on_transfer_complete(&report);
        report
    }

    /// Plan and execute without asking anyone.
    pub fn run(
        &self,
        action: Action,
        selection: &[AssetRef],
        catalog: &Catalog,
        presence: &mut PresenceMap,
        reporter: &dyn ProgressReporter,
    ) -> Result<Report> {
        let plan = self.plan(action, selection, catalog, presence)?;
        Ok(self.execute(&plan, catalog, presence, reporter))
    }
}

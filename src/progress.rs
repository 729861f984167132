use crate::executor::{ItemOutcome, Report};

/// Trait for reporting status probes and transfers.
///
/// The CLI implements it with indicatif bars; tests use `SilentReporter`.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_status_start(&self, _total: usize) {}
    fn on_status_progress(&self, _done: usize, _total: usize) {}
    fn on_status_complete(&self) {}
    fn on_transfer_start(&self, _total_bytes: u64, _items: usize) {}
    fn on_transfer_progress(&self, _bytes: u64) {}
    /// Take back bytes reported by an attempt that was thrown away.
    fn on_transfer_rewind(&self, _bytes: u64) {}
    fn on_item_complete(&self, _label: &str, _outcome: &ItemOutcome) {}
    fn on_transfer_complete(&self, _report: &Report) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

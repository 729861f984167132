use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use aerial_sync::executor::{ItemOutcome, Report};
use aerial_sync::format::format_bytes;
use aerial_sync::session::outcome_label;
use aerial_sync::ProgressReporter;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Size probes: counted bar (number of assets known up front)
/// - Transfers: byte bar over the planned total
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICK_CHARS)
}

impl ProgressReporter for CliReporter {
    fn on_status_start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(style(
            "  {spinner:.cyan} Gathering asset sizes [{bar:30.cyan/dim}] {pos}/{len}",
        ));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_status_progress(&self, done: usize, _total: usize) {
        self.with_bar(|pb| pb.set_position(done as u64));
    }

    fn on_status_complete(&self) {
        self.finish_bar();
        eprintln!("  \x1b[32m✓\x1b[0m Asset sizes gathered");
    }

    fn on_transfer_start(&self, total_bytes: u64, _items: usize) {
        let pb = ProgressBar::new(total_bytes);
        pb.set_style(style(
            "  {spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta} remaining) {msg}",
        ));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_transfer_progress(&self, bytes: u64) {
        self.with_bar(|pb| pb.inc(bytes));
    }

    fn on_transfer_rewind(&self, bytes: u64) {
        self.with_bar(|pb| pb.set_position(pb.position().saturating_sub(bytes)));
    }

    fn on_item_complete(&self, label: &str, outcome: &ItemOutcome) {
        let line = format!("{label}: {}", outcome_label(outcome));
        self.with_bar(|pb| pb.set_message(line));
    }

    fn on_transfer_complete(&self, report: &Report) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} complete: {} processed",
            report.action,
            format_bytes(report.total_bytes_processed)
        );
    }
}

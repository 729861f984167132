use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use rayon::prelude::*;
use tempfile::Builder;
use tracing::{debug, error, warn};

use super::{ActionExecutor, ItemOutcome, Plan};
use crate::catalog::{Asset, AssetRef, Catalog};
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;

pub(crate) fn download_all(
    executor: &ActionExecutor<'_>,
    plan: &Plan,
    catalog: &Catalog,
    reporter: &dyn ProgressReporter,
) -> Vec<(AssetRef, ItemOutcome)> {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(executor.config.workers())
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Cannot start download workers: {}", e);
            return plan
                .targets
                .iter()
                .map(|&asset| (asset, ItemOutcome::Failed(format!("worker pool: {e}"))))
                .collect();
        }
    };

    pool.install(|| {
        plan.targets
            .par_iter()
            .map(|&asset_ref| {
                let asset = catalog.asset(asset_ref);
                let outcome = if executor.is_cancelled() {
                    ItemOutcome::Failed(Error::Cancelled.to_string())
                } else {
                    match download_asset(executor, asset, reporter) {
                        Ok(bytes) => ItemOutcome::Succeeded { bytes },
                        Err(e) => {
                            error!("Failed to download '{}': {}", asset.label, e);
                            ItemOutcome::Failed(e.to_string())
                        }
                    }
                };
                reporter.on_item_complete(&asset.label, &outcome);
                (asset_ref, outcome)
            })
            .collect()
    })
}

/// Download one asset with retries, writing to a temporary file next to the
/// destination and renaming it into place only once the size checks out.
fn download_asset(
    executor: &ActionExecutor<'_>,
    asset: &Asset,
    reporter: &dyn ProgressReporter,
) -> Result<u64> {
    let dir = executor.root.video_dir();
    fs::create_dir_all(&dir)?;
    let destination = dir.join(&asset.file_name);

    let attempts = executor.config.download_retries.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        if executor.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let reported = AtomicU64::new(0);
        let on_chunk = |n: u64| {
            reported.fetch_add(n, Ordering::Relaxed);
            reporter.on_transfer_progress(n);
        };
        let result = attempt_download(executor, asset, &dir, &destination, &on_chunk);
        if result.is_err() {
            reporter.on_transfer_rewind(reported.load(Ordering::Relaxed));
        }
        match result {
            Ok(bytes) => {
                debug!("Downloaded '{}' ({} bytes)", asset.label, bytes);
                return Ok(bytes);
            }
            Err(_) if executor.is_cancelled() => return Err(Error::Cancelled),
            Err(e) => {
                warn!(
                    "Attempt {}/{} for '{}' failed: {}",
                    attempt, attempts, asset.label, e
                );
                last_error = Some(e);
                if attempt < attempts {
                    thread::sleep(executor.config.backoff(attempt));
                }
            }
        }
    }
    Err(last_error.unwrap_or(Error::Cancelled))
}

fn attempt_download(
    executor: &ActionExecutor<'_>,
    asset: &Asset,
    dir: &Path,
    destination: &Path,
    on_chunk: &dyn Fn(u64),
) -> Result<u64> {
    // Dropped (and removed) on every early return.
    let temp = Builder::new()
        .prefix(&format!(".{}.", asset.id))
        .suffix(".download")
        .tempfile_in(dir)?;

    let written = {
        let mut sink = CancellableWriter {
            inner: BufWriter::new(temp.as_file()),
            cancel: &executor.cancel,
        };
        let written = executor.transport.download(&asset.url, &mut sink, on_chunk)?;
        sink.flush()?;
        written
    };

    if written != asset.size {
        return Err(Error::SizeMismatch {
            path: destination.to_path_buf(),
            expected: asset.size,
            actual: written,
        });
    }

    temp.as_file().sync_all()?;
    temp.persist(destination).map_err(|e| Error::Io(e.error))?;
    Ok(written)
}

/// Refuses further writes once the cancel flag is raised.
struct CancellableWriter<'a, W: Write> {
    inner: W,
    cancel: &'a AtomicBool,
}

impl<W: Write> Write for CancellableWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "download cancelled"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

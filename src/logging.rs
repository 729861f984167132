use std::env;
use std::path::Path;
use tracing::debug;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Background file writer. Buffered lines are only guaranteed on disk once
/// the guard is dropped.
fn file_writer(directory: impl AsRef<Path>, file_name: impl AsRef<Path>) -> (NonBlocking, WorkerGuard) {
    let file_appender = tracing_appender::rolling::never(directory, file_name);
    tracing_appender::non_blocking(file_appender)
}

pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path =
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| "./logs/aerial-sync.log".to_string());

    let (non_blocking, guard) = file_writer("./", log_file_path);

    // Console output goes to stderr; stdout belongs to the prompts.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    debug!("Tracing is configured for stderr and file logging.");

    guard
}

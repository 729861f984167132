use std::path::PathBuf;
use thiserror::Error;

use crate::selection::SelectionError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Manifest parse error: {0}")]
    Parse(String),

    #[error("No usable wallpaper storage found: {0}")]
    NoStorageFound(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    #[error("Not enough disk space: {required} bytes required, {available} bytes available")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("size mismatch for {path}: expected {expected} bytes, got {actual} bytes")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Cancelled")]
    Cancelled,
}

impl Error {
    pub fn network(url: &str, reason: impl ToString) -> Self {
        Error::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use std::fs;
use std::io;

use tracing::warn;

use super::StorageRoot;
use crate::catalog::{Asset, AssetRef, Catalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Absent,
    /// A local file exists but its size differs from the manifest.
    Incomplete { actual: u64 },
    Complete,
}

impl PresenceStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, PresenceStatus::Complete)
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, PresenceStatus::Absent)
    }

    /// Bytes currently on disk for an asset of size `expected`.
    pub fn on_disk_size(&self, expected: u64) -> u64 {
        match self {
            PresenceStatus::Absent => 0,
            PresenceStatus::Incomplete { actual } => *actual,
            PresenceStatus::Complete => expected,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PresenceStatus::Absent => "",
            PresenceStatus::Incomplete { .. } => "partial",
            PresenceStatus::Complete => "downloaded",
        }
    }
}

/// Classify the local copy of `asset`. Only reads metadata; a missing
/// directory anywhere on the path means `Absent`.
pub fn check(asset: &Asset, root: &StorageRoot) -> PresenceStatus {
    let path = root.asset_path(asset);
    match fs::metadata(&path) {
        Ok(metadata) if metadata.is_file() => {
            if metadata.len() == asset.size {
                PresenceStatus::Complete
            } else {
                PresenceStatus::Incomplete {
                    actual: metadata.len(),
                }
            }
        }
        Ok(_) => {
            warn!("{} is not a regular file", path.display());
            PresenceStatus::Absent
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => PresenceStatus::Absent,
        Err(err) => {
            warn!("Error reading metadata for {}: {}", path.display(), err);
            PresenceStatus::Absent
        }
    }
}

/// Latest probe result for every asset in a catalog.
#[derive(Debug, Clone)]
pub struct PresenceMap {
    statuses: Vec<PresenceStatus>,
}

impl PresenceMap {
    pub fn probe(catalog: &Catalog, root: &StorageRoot) -> Self {
        let statuses = catalog
            .assets()
            .iter()
            .map(|asset| check(asset, root))
            .collect();
        Self { statuses }
    }

    pub fn get(&self, asset: AssetRef) -> PresenceStatus {
        self.statuses
            .get(asset.0)
            .copied()
            .unwrap_or(PresenceStatus::Absent)
    }

    /// Re-probe the given assets after they were touched.
    pub fn refresh(&mut self, catalog: &Catalog, root: &StorageRoot, assets: &[AssetRef]) {
        for &asset in assets {
            if let Some(slot) = self.statuses.get_mut(asset.0) {
                *slot = check(catalog.asset(asset), root);
            }
        }
    }

    pub fn count_complete(&self, assets: &[AssetRef]) -> usize {
        assets.iter().filter(|&&a| self.get(a).is_complete()).count()
    }
}

use std::path::{Path, PathBuf};

use sysinfo::Disks;

use crate::error::{Error, Result};

/// Free space on the volume holding a path.
pub trait SpaceProbe: Send + Sync {
    fn available_space(&self, path: &Path) -> Result<u64>;
}

pub struct DiskSpace;

impl SpaceProbe for DiskSpace {
    fn available_space(&self, path: &Path) -> Result<u64> {
        let target = nearest_existing_path(path);
        let target = std::fs::canonicalize(&target).unwrap_or(target);
        let disks = Disks::new_with_refreshed_list();

        // Longest mount point that prefixes the target wins.
        let mut best: Option<(usize, u64)> = None;
        for disk in disks.list() {
            let mount = disk.mount_point();
            if target.starts_with(mount) {
                let score = mount.as_os_str().len();
                match best {
                    Some((best_score, _)) if best_score >= score => {}
                    _ => best = Some((score, disk.available_space())),
                }
            }
        }

        best.map(|(_, available)| available).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no mounted volume holds {}", path.display()),
            ))
        })
    }
}

fn nearest_existing_path(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while !candidate.exists() {
        if !candidate.pop() {
            return PathBuf::from("/");
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_existing_path_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("a").join("b").join("c");
        assert_eq!(nearest_existing_path(&missing), tmp.path());
    }
}

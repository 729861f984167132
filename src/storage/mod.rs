pub mod presence;
pub mod space;

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::Asset;
use crate::config::AppConfig;
use crate::error::{Error, Result};

pub use presence::{PresenceMap, PresenceStatus};
pub use space::{DiskSpace, SpaceProbe};

pub const LEGACY_BASE: &str = "/Library/Application Support/com.apple.idleassetsd";
const USER_BASE_SUFFIX: [&str; 4] = ["Library", "Application Support", "com.apple.wallpaper", "aerials"];
const STRINGS_SUFFIX: [&str; 3] = [
    "TVIdleScreenStrings.bundle",
    "en.lproj",
    "Localizable.nocache.strings",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    User,
    Legacy,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::User => write!(f, "user"),
            StorageMode::Legacy => write!(f, "legacy"),
        }
    }
}

/// The storage location active for this run. Decided once by
/// `StorageLocator::resolve` and never re-evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRoot {
    User { base: PathBuf },
    Legacy { base: PathBuf },
}

impl StorageRoot {
    pub fn mode(&self) -> StorageMode {
        match self {
            StorageRoot::User { .. } => StorageMode::User,
            StorageRoot::Legacy { .. } => StorageMode::Legacy,
        }
    }

    pub fn base(&self) -> &Path {
        match self {
            StorageRoot::User { base } | StorageRoot::Legacy { base } => base,
        }
    }

    /// Manifest (`entries.json`) shipped inside the storage root.
    pub fn entries_path(&self) -> PathBuf {
        match self {
            StorageRoot::User { base } => base.join("manifest").join("entries.json"),
            StorageRoot::Legacy { base } => base.join("Customer").join("entries.json"),
        }
    }

    /// Localized names for the manifest's `localizedNameKey`s.
    pub fn strings_path(&self) -> PathBuf {
        let bundle_parent = match self {
            StorageRoot::User { base } => base.join("manifest"),
            StorageRoot::Legacy { base } => base.join("Customer"),
        };
        STRINGS_SUFFIX
            .iter()
            .fold(bundle_parent, |path, part| path.join(part))
    }

    pub fn video_dir(&self) -> PathBuf {
        match self {
            StorageRoot::User { base } => base.join("videos"),
            StorageRoot::Legacy { base } => base.join("Customer").join("4KSDR240FPS"),
        }
    }

    pub fn asset_path(&self, asset: &Asset) -> PathBuf {
        self.video_dir().join(&asset.file_name)
    }
}

/// Picks the active storage root: the per-user location first, then the legacy one.
#[derive(Debug, Clone)]
pub struct StorageLocator {
    pub user_base: Option<PathBuf>,
    pub legacy_base: PathBuf,
    pub elevated: bool,
    /// When false, a root only needs to exist; the manifest comes from elsewhere.
    pub require_manifest: bool,
}

impl StorageLocator {
    pub fn from_config(config: &AppConfig) -> Self {
        let user_base = config
            .user_root
            .as_ref()
            .map(PathBuf::from)
            .or_else(default_user_base);
        let legacy_base = config
            .legacy_root
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(LEGACY_BASE));
        Self {
            user_base,
            legacy_base,
            elevated: is_elevated(),
            require_manifest: config.manifest_url.is_none(),
        }
    }

    pub fn resolve(&self) -> Result<StorageRoot> {
        if let Some(base) = &self.user_base {
            let candidate = StorageRoot::User { base: base.clone() };
            if self.usable(&candidate) {
                info!("Using user storage at {}", base.display());
                return Ok(candidate);
            }
            debug!("User storage not usable at {}", base.display());
        }

        let candidate = StorageRoot::Legacy {
            base: self.legacy_base.clone(),
        };
        if self.usable(&candidate) {
            if !self.elevated {
                return Err(Error::Permission(format!(
                    "legacy storage at {} requires administrator rights; re-run with sudo",
                    self.legacy_base.display()
                )));
            }
            info!("Using legacy storage at {}", self.legacy_base.display());
            return Ok(candidate);
        }

        Err(Error::NoStorageFound(format!(
            "neither {} nor {} contains a wallpaper manifest",
            self.user_base
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<no home directory>".to_string()),
            self.legacy_base.display()
        )))
    }

    fn usable(&self, root: &StorageRoot) -> bool {
        if self.require_manifest {
            root.entries_path().is_file() && root.strings_path().is_file()
        } else {
            root.base().is_dir()
        }
    }
}

/// Home directory of the invoking user, looking through `sudo`.
fn user_home() -> Option<PathBuf> {
    home_for(env::var("SUDO_USER").ok().as_deref())
}

fn home_for(sudo_user: Option<&str>) -> Option<PathBuf> {
    match sudo_user {
        Some(name) if !name.is_empty() && name != "root" => account_home(name)
            .or_else(|| {
                let guess = Path::new("/Users").join(name);
                guess.is_dir().then_some(guess)
            })
            .or_else(dirs::home_dir),
        _ => dirs::home_dir(),
    }
}

/// Home directory from the password database.
#[cfg(unix)]
fn account_home(name: &str) -> Option<PathBuf> {
    use std::ffi::{CStr, CString, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let name = CString::new(name).ok()?;
    // The entry points into static storage; copy the directory out before returning.
    let dir = unsafe {
        let entry = libc::getpwnam(name.as_ptr());
        if entry.is_null() || (*entry).pw_dir.is_null() {
            return None;
        }
        CStr::from_ptr((*entry).pw_dir).to_bytes().to_vec()
    };
    if dir.is_empty() {
        return None;
    }
    Some(PathBuf::from(OsStr::from_bytes(&dir)))
}

#[cfg(not(unix))]
fn account_home(_name: &str) -> Option<PathBuf> {
    None
}

fn default_user_base() -> Option<PathBuf> {
    user_home().map(|home| {
        USER_BASE_SUFFIX
            .iter()
            .fold(home, |path, part| path.join(part))
    })
}

#[cfg(unix)]
pub fn is_elevated() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}

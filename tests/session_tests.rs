use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::tempdir;

use aerial_sync::catalog::{Asset, Category};
use aerial_sync::notifier::DaemonControl;
use aerial_sync::storage::SpaceProbe;
use aerial_sync::transport::Transport;
use aerial_sync::{
    ActionExecutor, AppConfig, AssetRef, Catalog, Error, PresenceStatus, Result, Session,
    SilentReporter, StorageRoot,
};

struct StaticCdn {
    bodies: HashMap<String, Vec<u8>>,
}

impl Transport for StaticCdn {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Err(Error::network(url, "unexpected fetch"))
    }

    fn content_length(&self, url: &str) -> Result<Option<u64>> {
        Ok(self.bodies.get(url).map(|b| b.len() as u64))
    }

    fn download(&self, url: &str, sink: &mut dyn Write, on_chunk: &dyn Fn(u64)) -> Result<u64> {
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| Error::network(url, "404 Not Found"))?;
        sink.write_all(body)?;
        on_chunk(body.len() as u64);
        Ok(body.len() as u64)
    }
}

struct FixedSpace(u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _path: &Path) -> Result<u64> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct Recorder {
    restarts: RefCell<Vec<String>>,
}

impl DaemonControl for Recorder {
    fn restart(&self, name: &str) -> Result<()> {
        self.restarts.borrow_mut().push(name.to_string());
        Ok(())
    }
}

fn asset(id: &str, label: &str, size: u64, category: usize) -> Asset {
    Asset {
        id: id.to_string(),
        label: label.to_string(),
        url: format!("https://cdn.example.com/{id}.mov"),
        file_name: format!("{id}.mov"),
        size,
        category,
    }
}

fn earth_and_water() -> Catalog {
    Catalog::new(
        vec![Category::new("earth", "Earth"), Category::new("water", "Water")],
        vec![
            asset("E1", "Desert Dunes", 100, 0),
            asset("E2", "Glacier", 200, 0),
            asset("E3", "Canyon", 300, 0),
            asset("W1", "Coral Reef", 50, 1),
        ],
    )
    .unwrap()
}

fn cdn_for(catalog: &Catalog) -> StaticCdn {
    StaticCdn {
        bodies: catalog
            .assets()
            .iter()
            .map(|a| (a.url.clone(), vec![7u8; a.size as usize]))
            .collect(),
    }
}

fn quiet_config() -> AppConfig {
    AppConfig {
        retry_backoff_ms: 0,
        download_retries: 1,
        ..AppConfig::default()
    }
}

/// Drives a full session over scripted input and returns what it printed
/// along with the final status of every asset.
fn drive(
    script: &str,
    catalog: &Catalog,
    root: &StorageRoot,
    space: u64,
    daemon: &Recorder,
) -> (String, Vec<PresenceStatus>) {
    let cdn = cdn_for(catalog);
    let config = quiet_config();
    let space = FixedSpace(space);
    let executor = ActionExecutor::new(root, &cdn, &space, &config);
    let mut output = Vec::new();
    let statuses = {
        let mut session = Session::new(
            Cursor::new(script.as_bytes()),
            &mut output,
            catalog,
            root,
            executor,
            daemon,
            &config,
            &SilentReporter,
        );
        session.run().unwrap();
        (0..catalog.len())
            .map(|i| session.presence().get(AssetRef(i)))
            .collect()
    };
    (String::from_utf8(output).unwrap(), statuses)
}

#[test]
fn test_session_downloads_selected_range() {
    let tmp = tempdir().unwrap();
    let root = StorageRoot::User {
        base: tmp.path().to_path_buf(),
    };
    let catalog = earth_and_water();
    let daemon = Recorder::default();

    let (text, statuses) = drive("1\n1-2\nd\ny\n\n", &catalog, &root, 10_000, &daemon);

    assert!(text.contains("1. Earth  (3)"));
    assert!(text.contains("Files to download (2): 300.00 bytes"));
    assert!(text.contains("  Downloaded 'Desert Dunes'"));
    assert!(text.contains("  Downloaded 'Glacier'"));
    assert!(text.contains("Downloaded 2 files (300.00 bytes), 0 skipped, 0 failed."));
    assert!(!text.contains("Kill idleassetsd"));
    assert!(text.trim_end().ends_with("Done."));
    assert_eq!(
        statuses,
        vec![
            PresenceStatus::Complete,
            PresenceStatus::Complete,
            PresenceStatus::Absent,
            PresenceStatus::Absent,
        ]
    );
    assert!(daemon.restarts.borrow().is_empty());
}

#[test]
fn test_session_reprompts_and_offers_restart_in_legacy_mode() {
    let tmp = tempdir().unwrap();
    let root = StorageRoot::Legacy {
        base: tmp.path().to_path_buf(),
    };
    let catalog = earth_and_water();
    fs::create_dir_all(root.video_dir()).unwrap();
    fs::write(root.asset_path(catalog.asset(AssetRef(0))), vec![7u8; 100]).unwrap();
    let daemon = Recorder::default();

    let (text, statuses) = drive("9\n1\n3-1\n1\nx\ny\ny\n", &catalog, &root, 0, &daemon);

    assert!(text.contains("Invalid category '9'."));
    assert!(text.contains("Invalid selection: '3-1' is an inverted range. Try again."));
    assert!(text.contains("Files to delete (1): 100.00 bytes"));
    assert!(text.contains("  Deleted 'Desert Dunes'"));
    assert!(text.contains("Kill idleassetsd to update download status in Settings?"));
    assert!(text.contains("Killed idleassetsd."));
    assert!(text.contains("No category selected."));
    assert_eq!(statuses[0], PresenceStatus::Absent);
    assert!(!root.asset_path(catalog.asset(AssetRef(0))).exists());
    assert_eq!(*daemon.restarts.borrow(), vec!["idleassetsd".to_string()]);
}

#[test]
fn test_session_reports_insufficient_space_and_continues() {
    let tmp = tempdir().unwrap();
    let root = StorageRoot::User {
        base: tmp.path().to_path_buf(),
    };
    let catalog = earth_and_water();
    let daemon = Recorder::default();

    let (text, statuses) = drive("3\nall\nd\n\n", &catalog, &root, 100, &daemon);

    assert!(text.contains("Not enough disk space: 650.00 bytes needed, 100.00 bytes available."));
    assert!(!text.contains("Files to download"));
    assert!(statuses.iter().all(|s| *s == PresenceStatus::Absent));
    assert!(!root.video_dir().exists());
}

#[test]
fn test_session_nothing_to_do_when_already_present() {
    let tmp = tempdir().unwrap();
    let root = StorageRoot::User {
        base: tmp.path().to_path_buf(),
    };
    let catalog = earth_and_water();
    fs::create_dir_all(root.video_dir()).unwrap();
    fs::write(root.asset_path(catalog.asset(AssetRef(3))), vec![7u8; 50]).unwrap();
    let daemon = Recorder::default();

    let (text, _) = drive("2\n1\nd\n", &catalog, &root, 0, &daemon);

    assert!(text.contains("downloaded"));
    assert!(text.contains("Nothing to download (1 already satisfied)."));
}

#[test]
fn test_session_declined_confirmation_changes_nothing() {
    let tmp = tempdir().unwrap();
    let root = StorageRoot::User {
        base: tmp.path().to_path_buf(),
    };
    let catalog = earth_and_water();
    let daemon = Recorder::default();

    let (text, statuses) = drive("1\n1\nd\nn\n\n", &catalog, &root, 10_000, &daemon);

    assert!(text.contains("Download files? (y/n)"));
    assert!(!text.contains("Downloaded 1 files"));
    assert_eq!(statuses[0], PresenceStatus::Absent);
}

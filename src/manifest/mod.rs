pub mod document;
pub mod strings;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::storage::StorageRoot;
use crate::transport::Transport;

pub use document::{ManifestDocument, ParsedManifest};
pub use strings::LocalizedStrings;

/// Where the manifest document comes from.
pub trait ManifestSource {
    fn describe(&self) -> String;
    fn read(&self, transport: &dyn Transport) -> Result<Vec<u8>>;

    /// Localized strings to name assets and categories with, if any.
    fn strings_path(&self) -> Option<&Path> {
        None
    }
}

/// Manifest served over HTTPS. Names still come from the local strings bundle.
pub struct RemoteManifest {
    pub url: String,
    pub strings_path: Option<PathBuf>,
}

impl ManifestSource for RemoteManifest {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn read(&self, transport: &dyn Transport) -> Result<Vec<u8>> {
        transport.fetch(&self.url)
    }

    fn strings_path(&self) -> Option<&Path> {
        self.strings_path.as_deref()
    }
}

/// `entries.json` already present in the storage root.
pub struct LocalManifest {
    pub entries_path: PathBuf,
    pub strings_path: PathBuf,
}

impl ManifestSource for LocalManifest {
    fn describe(&self) -> String {
        self.entries_path.display().to_string()
    }

    fn read(&self, _transport: &dyn Transport) -> Result<Vec<u8>> {
        fs::read(&self.entries_path).map_err(|e| {
            Error::Parse(format!(
                "cannot read manifest {}: {}",
                self.entries_path.display(),
                e
            ))
        })
    }

    fn strings_path(&self) -> Option<&Path> {
        Some(&self.strings_path)
    }
}

pub fn source_from_config(config: &AppConfig, root: &StorageRoot) -> Box<dyn ManifestSource> {
    match &config.manifest_url {
        Some(url) => Box::new(RemoteManifest {
            url: url.clone(),
            strings_path: Some(root.strings_path()),
        }),
        None => Box::new(LocalManifest {
            entries_path: root.entries_path(),
            strings_path: root.strings_path(),
        }),
    }
}

/// Fetch and parse the manifest into a complete catalog.
///
/// Sizes the document leaves out are probed with HEAD requests; any asset
/// whose size stays unknown fails the whole fetch.
pub fn fetch_catalog(
    source: &dyn ManifestSource,
    transport: &dyn Transport,
    config: &AppConfig,
    reporter: &dyn ProgressReporter,
) -> Result<Catalog> {
    info!("Fetching manifest from {}", source.describe());
    let data = source.read(transport)?;
    let document = document::parse_document(&data)?;
    let strings = LocalizedStrings::load_optional(source.strings_path())?;
    let mut parsed = document::build(document, &config.asset_url_key, &strings)?;
    debug!(
        "Manifest declares {} categories, {} assets ({} without size)",
        parsed.categories.len(),
        parsed.assets.len(),
        parsed.missing_sizes.len()
    );

    if !parsed.missing_sizes.is_empty() {
        probe_sizes(&mut parsed, transport, config.workers(), reporter)?;
    }

    let catalog = Catalog::new(parsed.categories, parsed.assets)?;
    info!(
        "Catalog ready: {} categories, {} assets",
        catalog.categories().len(),
        catalog.len()
    );
    Ok(catalog)
}

fn probe_sizes(
    parsed: &mut ParsedManifest,
    transport: &dyn Transport,
    workers: usize,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    let total = parsed.missing_sizes.len();
    let done = AtomicUsize::new(0);
    reporter.on_status_start(total);

    let assets = &parsed.assets;
    let probed: Vec<(usize, Result<Option<u64>>)> = pool.install(|| {
        parsed
            .missing_sizes
            .par_iter()
            .map(|&position| {
                let result = transport.content_length(&assets[position].url);
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                reporter.on_status_progress(finished, total);
                (position, result)
            })
            .collect()
    });
    reporter.on_status_complete();

    for (position, result) in probed {
        let asset = &mut parsed.assets[position];
        match result? {
            Some(size) => asset.size = size,
            None => {
                return Err(Error::Parse(format!(
                    "size of asset '{}' is unknown",
                    asset.id
                )))
            }
        }
    }
    parsed.missing_sizes.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use std::collections::HashMap;
    use std::io::Write;

    struct StaticTransport {
        documents: HashMap<String, Vec<u8>>,
        lengths: HashMap<String, u64>,
    }

    impl Transport for StaticTransport {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.documents
                .get(url)
                .cloned()
                .ok_or_else(|| Error::network(url, "404"))
        }

        fn content_length(&self, url: &str) -> Result<Option<u64>> {
            Ok(self.lengths.get(url).copied())
        }

        fn download(&self, url: &str, _sink: &mut dyn Write, _on_chunk: &dyn Fn(u64)) -> Result<u64> {
            Err(Error::network(url, "unexpected download"))
        }
    }

    const DOC: &str = r#"{
        "categories": [{"id": "c", "name": "Cities"}],
        "assets": [
            {"id": "a", "accessibilityLabel": "A", "categories": ["c"], "url": "https://cdn/a.mov"},
            {"id": "b", "accessibilityLabel": "B", "localizedNameKey": "CITY_B", "categories": ["c"], "url": "https://cdn/b.mov", "size": 7}
        ]
    }"#;

    fn transport(lengths: &[(&str, u64)]) -> StaticTransport {
        StaticTransport {
            documents: HashMap::from([("https://cdn/entries.json".to_string(), DOC.as_bytes().to_vec())]),
            lengths: lengths.iter().map(|(u, l)| (u.to_string(), *l)).collect(),
        }
    }

    #[test]
    fn test_remote_fetch_probes_missing_sizes() {
        let source = RemoteManifest {
            url: "https://cdn/entries.json".to_string(),
            strings_path: None,
        };
        let catalog = fetch_catalog(
            &source,
            &transport(&[("https://cdn/a.mov", 42)]),
            &AppConfig::default(),
            &SilentReporter,
        )
        .unwrap();
        let sizes: Vec<u64> = catalog.assets().iter().map(|a| a.size).collect();
        assert_eq!(sizes, vec![42, 7]);
    }

    #[test]
    fn test_unknown_size_fails_fetch() {
        let source = RemoteManifest {
            url: "https://cdn/entries.json".to_string(),
            strings_path: None,
        };
        let result = fetch_catalog(&source, &transport(&[]), &AppConfig::default(), &SilentReporter);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_network_failure_is_fatal() {
        let source = RemoteManifest {
            url: "https://cdn/missing.json".to_string(),
            strings_path: None,
        };
        let result = fetch_catalog(&source, &transport(&[]), &AppConfig::default(), &SilentReporter);
        assert!(matches!(result, Err(Error::Network { .. })));
    }

    #[test]
    fn test_local_manifest_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("entries.json");
        fs::write(&path, DOC).unwrap();
        let strings_path = tmp.path().join("Localizable.nocache.strings");
        fs::write(
            &strings_path,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><dict><key>CITY_B</key><string>Brooklyn Bridge</string></dict></plist>"#,
        )
        .unwrap();
        let source = LocalManifest {
            entries_path: path,
            strings_path,
        };
        let catalog = fetch_catalog(
            &source,
            &transport(&[("https://cdn/a.mov", 1)]),
            &AppConfig::default(),
            &SilentReporter,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        let labels: Vec<&str> = catalog.assets().iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "Brooklyn Bridge"]);
    }
}

//! Localized display names shipped next to `entries.json` in the
//! `TVIdleScreenStrings.bundle`, keyed by `localizedNameKey`.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct LocalizedStrings {
    table: HashMap<String, String>,
}

impl LocalizedStrings {
    /// Read a `.strings` property list, XML or binary. Non-string values are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let value = plist::Value::from_file(path).map_err(|e| {
            Error::Parse(format!("cannot read strings {}: {}", path.display(), e))
        })?;
        let dictionary = value.into_dictionary().ok_or_else(|| {
            Error::Parse(format!("strings {} is not a dictionary", path.display()))
        })?;
        let table: HashMap<String, String> = dictionary
            .into_iter()
            .filter_map(|(key, value)| value.into_string().map(|text| (key, text)))
            .collect();
        debug!("Loaded {} localized strings from {}", table.len(), path.display());
        Ok(Self { table })
    }

    /// Like `load`, but a missing file yields an empty table.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.is_file() => Self::load(path),
            Some(path) => {
                warn!("No localized strings at {}; using manifest names", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.table
            .get(key)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedStrings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            table: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>AerialCategoryLosAngeles</key>
    <string>Los Angeles</string>
    <key>A1_NAME</key>
    <string>Hollywood Hills</string>
    <key>Version</key>
    <integer>3</integer>
</dict>
</plist>
"#;

    #[test]
    fn test_load_xml_strings() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("Localizable.nocache.strings");
        fs::write(&path, FIXTURE).unwrap();

        let strings = LocalizedStrings::load(&path).unwrap();
        assert_eq!(strings.len(), 2);
        assert_eq!(strings.get("AerialCategoryLosAngeles"), Some("Los Angeles"));
        assert_eq!(strings.get("A1_NAME"), Some("Hollywood Hills"));
        assert_eq!(strings.get("Version"), None);
    }

    #[test]
    fn test_load_binary_strings() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("Localizable.nocache.strings");
        let mut dictionary = plist::Dictionary::new();
        dictionary.insert("K".to_string(), plist::Value::String("Kelp Forest".to_string()));
        plist::Value::Dictionary(dictionary)
            .to_file_binary(&path)
            .unwrap();

        let strings = LocalizedStrings::load(&path).unwrap();
        assert_eq!(strings.get("K"), Some("Kelp Forest"));
    }

    #[test]
    fn test_missing_file_is_empty_but_garbage_fails() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("nope.strings");
        assert!(LocalizedStrings::load_optional(Some(&missing)).unwrap().is_empty());
        assert!(LocalizedStrings::load_optional(None).unwrap().is_empty());

        let garbage = tmp.path().join("bad.strings");
        fs::write(&garbage, b"\x00not a plist").unwrap();
        assert!(matches!(
            LocalizedStrings::load_optional(Some(&garbage)),
            Err(Error::Parse(_))
        ));
    }
}

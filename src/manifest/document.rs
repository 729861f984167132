//! The `entries.json` document: categories with subcategories, and assets
//! pointing at them by id.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::strings::LocalizedStrings;
use crate::catalog::{Asset, Category};
use crate::error::{Error, Result};

pub const OTHER_CATEGORY: &str = "Other";

#[derive(Debug, Default, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "localizedNameKey")]
    pub localized_name_key: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubcategoryEntry {
    pub id: Option<String>,
    #[serde(rename = "representativeAssetID")]
    pub representative_asset_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetEntry {
    pub id: Option<String>,
    #[serde(rename = "accessibilityLabel", alias = "name")]
    pub label: Option<String>,
    #[serde(rename = "localizedNameKey")]
    pub localized_name_key: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    #[serde(rename = "showInTopLevel", default)]
    pub show_in_top_level: bool,
    #[serde(alias = "fileSize")]
    pub size: Option<u64>,
    /// Download URLs live under variant-specific keys.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A parsed manifest whose assets may still lack a size.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub categories: Vec<Category>,
    pub assets: Vec<Asset>,
    /// Positions in `assets` whose size the document did not declare.
    pub missing_sizes: Vec<usize>,
}

pub fn parse_document(data: &[u8]) -> Result<ManifestDocument> {
    serde_json::from_slice(data).map_err(|e| Error::Parse(format!("malformed manifest: {e}")))
}

/// Flatten a document into categories and assets, in declaration order.
///
/// Duplicate category ids are merged into the first declaration; a duplicate
/// asset id replaces the earlier entry but keeps its position. Names come from
/// `strings` when the entry's `localizedNameKey` is found there.
pub fn build(
    document: ManifestDocument,
    url_key: &str,
    strings: &LocalizedStrings,
) -> Result<ParsedManifest> {
    let categories = merge_categories(document.categories, strings)?;
    if categories.is_empty() {
        return Err(Error::Parse("manifest declares no categories".to_string()));
    }
    let owners = OwnerIndex::new(&categories);

    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, AssetEntry> = HashMap::new();
    for (position, entry) in document.assets.into_iter().enumerate() {
        let id = entry
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Parse(format!("asset #{} has no id", position + 1)))?;
        if !by_id.contains_key(&id) {
            order.push(id.clone());
        }
        by_id.insert(id, entry);
    }

    let mut out_categories: Vec<Category> = categories
        .iter()
        .map(|c| Category::new(c.id.clone(), c.name.clone()))
        .collect();
    let mut other: Option<usize> = None;
    let mut assets = Vec::with_capacity(order.len());
    let mut missing_sizes = Vec::new();

    for id in order {
        let Some(entry) = by_id.remove(&id) else {
            continue;
        };
        let label = entry
            .localized_name_key
            .as_deref()
            .and_then(|key| strings.get(key))
            .map(str::to_string)
            .or_else(|| entry.label.clone())
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| Error::Parse(format!("asset '{id}' has no name")))?;
        let url = asset_url(&entry, url_key)
            .ok_or_else(|| Error::Parse(format!("asset '{id}' has no '{url_key}' URL")))?;
        let ext = url_extension(&url)
            .ok_or_else(|| Error::Parse(format!("asset '{id}' URL has no file extension: {url}")))?;

        let category = match owners.owner_of(&id, &entry) {
            Some(index) => index,
            None => *other.get_or_insert_with(|| {
                out_categories.push(Category::new(OTHER_CATEGORY, OTHER_CATEGORY));
                out_categories.len() - 1
            }),
        };

        if entry.size.is_none() {
            missing_sizes.push(assets.len());
        }
        assets.push(Asset {
            file_name: format!("{id}{ext}"),
            id,
            label,
            url,
            size: entry.size.unwrap_or(0),
            category,
        });
    }

    Ok(ParsedManifest {
        categories: out_categories,
        assets,
        missing_sizes,
    })
}

#[derive(Debug, Clone)]
struct MergedCategory {
    id: String,
    name: String,
    subcategories: Vec<SubcategoryEntry>,
}

fn merge_categories(
    entries: Vec<CategoryEntry>,
    strings: &LocalizedStrings,
) -> Result<Vec<MergedCategory>> {
    let mut merged: Vec<MergedCategory> = Vec::new();
    for (position, entry) in entries.into_iter().enumerate() {
        let id = entry
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Parse(format!("category #{} has no id", position + 1)))?;
        let key = entry.localized_name_key.as_deref();
        let name = key
            .and_then(|key| strings.get(key))
            .map(str::to_string)
            .or_else(|| entry.name.clone())
            .or_else(|| key.map(display_name_from_key))
            .unwrap_or_else(|| id.clone());
        match merged.iter_mut().find(|c| c.id == id) {
            Some(existing) => {
                existing.name = name;
                existing.subcategories.extend(entry.subcategories);
            }
            None => merged.push(MergedCategory {
                id,
                name,
                subcategories: entry.subcategories,
            }),
        }
    }
    Ok(merged)
}

/// Lookup tables for resolving an asset's owning top-level category.
struct OwnerIndex {
    top_level: HashMap<String, usize>,
    subcategory_parent: HashMap<String, usize>,
    representative_parent: HashMap<String, usize>,
}

impl OwnerIndex {
    fn new(categories: &[MergedCategory]) -> Self {
        let mut top_level = HashMap::new();
        let mut subcategory_parent = HashMap::new();
        let mut representative_parent = HashMap::new();
        for (index, category) in categories.iter().enumerate() {
            top_level.insert(category.id.clone(), index);
            for sub in &category.subcategories {
                if let Some(sub_id) = &sub.id {
                    subcategory_parent.entry(sub_id.clone()).or_insert(index);
                }
                if let Some(rep) = &sub.representative_asset_id {
                    representative_parent.entry(rep.clone()).or_insert(index);
                }
            }
        }
        Self {
            top_level,
            subcategory_parent,
            representative_parent,
        }
    }

    fn owner_of(&self, asset_id: &str, entry: &AssetEntry) -> Option<usize> {
        entry
            .categories
            .iter()
            .find_map(|c| {
                self.top_level
                    .get(c)
                    .or_else(|| self.subcategory_parent.get(c))
                    .copied()
            })
            .or_else(|| {
                entry
                    .subcategories
                    .iter()
                    .find_map(|s| self.subcategory_parent.get(s).copied())
            })
            .or_else(|| self.representative_parent.get(asset_id).copied())
            .or(if entry.show_in_top_level { Some(0) } else { None })
    }
}

fn asset_url(entry: &AssetEntry, url_key: &str) -> Option<String> {
    [url_key, "url"]
        .iter()
        .find_map(|key| entry.extra.get(*key).and_then(Value::as_str))
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Extension of the URL path including the dot, e.g. `.mov`.
fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let ext = Path::new(parsed.path()).extension()?.to_str()?;
    Some(format!(".{ext}"))
}

/// `AerialCategoryCities` -> `Cities`.
fn display_name_from_key(key: &str) -> String {
    let trimmed = key
        .strip_prefix("AerialCategory")
        .or_else(|| key.strip_prefix("AerialSubcategory"))
        .unwrap_or(key);
    if trimmed.is_empty() {
        key.to_string()
    } else {
        trimmed.to_string()
    }
}

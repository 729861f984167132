use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Position of an asset in the catalog. Stable for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetRef(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub label: String,
    pub url: String,
    /// Local file name, `<id><ext>`.
    pub file_name: String,
    /// Expected size in bytes.
    pub size: u64,
    /// Index of the owning category.
    pub category: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    assets: Vec<AssetRef>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            assets: Vec::new(),
        }
    }

    pub fn assets(&self) -> &[AssetRef] {
        &self.assets
    }

    pub fn total_count(&self) -> usize {
        self.assets.len()
    }
}

/// Which assets a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Category(usize),
    All,
}

/// Manifest entries for one run. Immutable once built.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    assets: Vec<Asset>,
}

impl Catalog {
    /// Build a catalog from categories and assets in declaration order.
    /// Every asset must name an existing category.
    pub fn new(mut categories: Vec<Category>, assets: Vec<Asset>) -> Result<Self> {
        for category in categories.iter_mut() {
            category.assets.clear();
        }
        for (position, asset) in assets.iter().enumerate() {
            let category = categories.get_mut(asset.category).ok_or_else(|| {
                Error::Parse(format!(
                    "asset '{}' refers to unknown category #{}",
                    asset.id, asset.category
                ))
            })?;
            category.assets.push(AssetRef(position));
        }
        Ok(Self { categories, assets })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn asset(&self, asset: AssetRef) -> &Asset {
        &self.assets[asset.0]
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Categories in manifest order with their asset counts.
    pub fn list_categories(&self) -> Vec<(&Category, usize)> {
        self.categories
            .iter()
            .map(|category| (category, category.total_count()))
            .collect()
    }

    /// Number a scope's assets from 1, category-major in manifest order.
    pub fn list_assets(&self, scope: Scope) -> Listing {
        let refs: Vec<AssetRef> = match scope {
            Scope::Category(index) => self
                .categories
                .get(index)
                .map(|category| category.assets.clone())
                .unwrap_or_default(),
            Scope::All => self
                .categories
                .iter()
                .flat_map(|category| category.assets.iter().copied())
                .collect(),
        };
        let rows = refs
            .into_iter()
            .enumerate()
            .map(|(i, asset)| ListingRow {
                index: i + 1,
                asset,
            })
            .collect();
        Listing { scope, rows }
    }

    pub fn scope_name(&self, scope: Scope) -> &str {
        match scope {
            Scope::Category(index) => self
                .categories
                .get(index)
                .map(|c| c.name.as_str())
                .unwrap_or("Unknown"),
            Scope::All => "All",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingRow {
    pub index: usize,
    pub asset: AssetRef,
}

/// One numbered pass over a scope. Indices never change for the lifetime of
/// the listing; presence state is looked up separately.
#[derive(Debug, Clone)]
pub struct Listing {
    scope: Scope,
    rows: Vec<ListingRow>,
}

impl Listing {
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn rows(&self) -> &[ListingRow] {
        &self.rows
    }

    pub fn max_index(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn asset_refs(&self) -> Vec<AssetRef> {
        self.rows.iter().map(|row| row.asset).collect()
    }

    /// Map parsed indices back to assets, in index order. Indices outside the
    /// listing are ignored.
    pub fn resolve(&self, indices: &BTreeSet<usize>) -> Vec<AssetRef> {
        indices
            .iter()
            .filter_map(|&index| index.checked_sub(1).and_then(|i| self.rows.get(i)))
            .map(|row| row.asset)
            .collect()
    }

    /// Rows grouped by owning category, in listing order.
    pub fn groups<'a>(&self, catalog: &'a Catalog) -> Vec<(&'a str, Vec<ListingRow>)> {
        let mut groups: Vec<(usize, Vec<ListingRow>)> = Vec::new();
        for row in &self.rows {
            let category = catalog.asset(row.asset).category;
            match groups.last_mut() {
                Some((current, rows)) if *current == category => rows.push(*row),
                _ => groups.push((category, vec![*row])),
            }
        }
        groups
            .into_iter()
            .map(|(category, rows)| (catalog.categories[category].name.as_str(), rows))
            .collect()
    }
}

//! Crop space requirements.
//!
//! The built-in table lives in `crops.toml` and is embedded in the binary at
//! compile time. It is read-only and shared by every planning run.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Space assumed for a crop that is not in the catalog.
pub const DEFAULT_SPACE_SQFT: f64 = 5.0;

/// A single crop and the plot area it occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRequirement {
    /// Crop name as shown to users (e.g. `Bell Peppers`).
    pub name: String,
    /// Required area in square feet.
    pub space_sqft: f64,
}

impl CropRequirement {
    /// A crop needing `space_sqft` square feet.
    pub fn new(name: impl Into<String>, space_sqft: f64) -> Self {
        Self {
            name: name.into(),
            space_sqft,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    crops: Vec<CropRequirement>,
}

static CROPS_TOML: &str = include_str!("crops.toml");

static BUILTIN: LazyLock<CropCatalog> = LazyLock::new(|| {
    CropCatalog::from_toml(CROPS_TOML).expect("embedded crops.toml is invalid")
});

/// Ordered crop name → space requirement table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropCatalog {
    crops: Vec<CropRequirement>,
}

impl CropCatalog {
    /// The embedded catalog.
    ///
    /// # Panics
    ///
    /// Panics on first use if the embedded TOML is malformed, which the
    /// unit tests rule out.
    pub fn builtin() -> &'static CropCatalog {
        &BUILTIN
    }

    /// Catalog over `crops`, kept in the given order.
    pub fn new(crops: Vec<CropRequirement>) -> Self {
        Self { crops }
    }

    /// Parse a catalog from TOML with a `[[crops]]` array.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file: CatalogFile = toml::from_str(content)?;
        Ok(Self::new(file.crops))
    }

    /// Look up a crop by exact name.
    pub fn get(&self, name: &str) -> Option<&CropRequirement> {
        self.crops.iter().find(|c| c.name == name)
    }

    /// Space required by `name`, or [`DEFAULT_SPACE_SQFT`] when unlisted.
    pub fn space_for(&self, name: &str) -> f64 {
        self.get(name)
            .map(|c| c.space_sqft)
            .unwrap_or(DEFAULT_SPACE_SQFT)
    }

    /// Crop names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.crops.iter().map(|c| c.name.as_str())
    }

    /// Number of listed crops.
    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }
}

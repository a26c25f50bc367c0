//! Bulk download manifest.
//!
//! Supplied by the remote app as an opaque JSON payload at the start of a
//! bulk prefetch and consumed once per run. Asset iteration keeps the
//! manifest's own declaration order so progress increments are
//! reproducible across runs.

use std::fmt;
use std::slice;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::AssetError;

/// One asset of a manifest: remote path plus its version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    /// Version tag as supplied, e.g. `?v=12`.
    pub version_tag: String,
}

impl ManifestEntry {
    /// Full request URL: the path with the version tag appended.
    pub fn url(&self) -> String {
        format!("{}{}", self.path, self.version_tag)
    }
}

/// Manifest assets in declaration order.
///
/// Deserialized from a JSON object; a plain map type would re-sort the
/// keys, so the entries are collected by hand.
#[derive(Debug, Clone, Default)]
pub struct AssetList(Vec<ManifestEntry>);

impl AssetList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, ManifestEntry> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ManifestEntry] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AssetList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ListVisitor;

        impl<'de> Visitor<'de> for ListVisitor {
            type Value = AssetList;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of asset paths to version tags")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((path, version_tag)) = map.next_entry::<String, String>()? {
                    entries.push(ManifestEntry { path, version_tag });
                }
                Ok(AssetList(entries))
            }
        }

        deserializer.deserialize_map(ListVisitor)
    }
}

/// Versioned asset list for one bulk prefetch.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetManifest {
    /// Version committed to the sentinel once every asset is present.
    pub version: String,
    pub assets: AssetList,
}

impl AssetManifest {
    /// Parse the JSON payload handed over by the remote app.
    pub fn parse(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

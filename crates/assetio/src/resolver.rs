//! Pure mapping from remote asset URLs to local cache paths.

use std::path::PathBuf;

/// URL-path prefix identifying a cacheable remote asset.
pub const ASSET_PREFIX: &str = "/assets";

/// Query marker carrying an asset's version tag.
pub const VERSION_MARKER: &str = "?v=";

/// Inputs of the path resolution, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Application install root the cache folder hangs off of.
    pub install_root: PathBuf,
    /// Cache folder name substituted for the asset namespace prefix.
    pub cache_folder: String,
    /// Whether the application runs from a packed archive layout, which
    /// sits one directory deeper than the unpacked layout.
    pub packed: bool,
}

impl ResolverConfig {
    pub fn new(install_root: impl Into<PathBuf>, cache_folder: impl Into<String>) -> Self {
        Self {
            install_root: install_root.into(),
            cache_folder: cache_folder.into(),
            packed: false,
        }
    }

    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = packed;
        self
    }

    /// Directory all cache entries live under.
    pub fn cache_root(&self) -> PathBuf {
        self.base().join(&self.cache_folder)
    }

    fn base(&self) -> PathBuf {
        if self.packed {
            self.install_root.join("..")
        } else {
            self.install_root.clone()
        }
    }
}

/// Map a remote asset URL to its local cache path.
///
/// Strips the namespace prefix, substitutes the configured cache folder and
/// collapses a trailing `?v=<tag>` marker into a `.{tag}` suffix so distinct
/// versions of the same asset occupy distinct paths. Deterministic, no I/O.
pub fn resolve(asset_url: &str, config: &ResolverConfig) -> PathBuf {
    let rel = asset_url.strip_prefix(ASSET_PREFIX).unwrap_or(asset_url);
    let rel = rel.replace(VERSION_MARKER, ".");
    config.cache_root().join(rel.trim_start_matches('/'))
}

/// Extension portion of a URL after the final dot of its last segment,
/// query remnants included. Callers match with `starts_with`.
pub fn url_extension(url: &str) -> Option<&str> {
    let name = url.rsplit('/').next().unwrap_or(url);
    name.rfind('.').map(|dot| &name[dot + 1..])
}

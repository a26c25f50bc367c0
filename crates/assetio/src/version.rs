//! Asset-set version tracking.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::AssetError;
use crate::store::CacheStore;

/// Version reported before any manifest has fully downloaded.
pub const BASELINE_ASSET_VERSION: &str = "104";

/// Sentinel file name under the cache root.
pub const SENTINEL_FILE: &str = "asset-version";

/// Reads and advances the persisted asset-set version sentinel.
#[derive(Clone)]
pub struct VersionStore {
    store: Arc<CacheStore>,
}

impl VersionStore {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    fn sentinel_path(&self) -> PathBuf {
        self.store.cache_root().join(SENTINEL_FILE)
    }

    /// Currently cached asset-set version. Falls back to the baseline when
    /// no manifest has ever completed.
    pub async fn current(&self) -> String {
        match self.store.read(&self.sentinel_path()).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_owned(),
            Err(_) => BASELINE_ASSET_VERSION.to_owned(),
        }
    }

    /// Record `version` as fully cached. Only called once every asset of a
    /// manifest is present on disk.
    pub async fn advance(&self, version: &str) -> Result<(), AssetError> {
        self.store
            .write(&self.sentinel_path(), version.as_bytes())
            .await?;
        debug!(version = %version, "asset version advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;
    use crate::resolver::ResolverConfig;
    use tempfile::tempdir;

    fn versions_at(root: &std::path::Path, enabled: bool) -> VersionStore {
        let store = CacheStore::new(
            ResolverConfig::new(root, "assets"),
            Arc::new(MockFetcher::new()),
            enabled,
        );
        VersionStore::new(Arc::new(store))
    }

    #[tokio::test]
    async fn absent_sentinel_reports_baseline() {
        let dir = tempdir().unwrap();
        assert_eq!(versions_at(dir.path(), true).current().await, BASELINE_ASSET_VERSION);
    }

    #[tokio::test]
    async fn advance_then_read_back() {
        let dir = tempdir().unwrap();
        let versions = versions_at(dir.path(), true);

        versions.advance("7").await.unwrap();
        assert_eq!(versions.current().await, "7");

        versions.advance("8").await.unwrap();
        assert_eq!(versions.current().await, "8");
    }

    #[tokio::test]
    async fn disabled_cache_never_persists_the_sentinel() {
        let dir = tempdir().unwrap();
        let versions = versions_at(dir.path(), false);

        versions.advance("7").await.unwrap();
        assert_eq!(versions.current().await, BASELINE_ASSET_VERSION);
    }
}

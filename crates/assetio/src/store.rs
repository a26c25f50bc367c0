//! Filesystem cache store.
//!
//! Exclusive owner of every path under the cache root. Reads and probes
//! always consult the disk; writes are gated by the `cache_enabled` flag so
//! disabling the cache never blocks asset delivery, it only disables
//! persistence.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::AssetError;
use crate::fetch::AssetFetcher;
use crate::resolver::{self, ResolverConfig};

pub struct CacheStore {
    resolver: ResolverConfig,
    fetcher: Arc<dyn AssetFetcher>,
    enabled: bool,
}

impl CacheStore {
    pub fn new(resolver: ResolverConfig, fetcher: Arc<dyn AssetFetcher>, enabled: bool) -> Self {
        Self {
            resolver,
            fetcher,
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Local path an asset URL maps to.
    pub fn resolve(&self, url: &str) -> PathBuf {
        resolver::resolve(url, &self.resolver)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.resolver.cache_root()
    }

    /// Non-throwing presence probe. Any stat failure counts as absent.
    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    /// Read a cache entry.
    pub async fn read(&self, path: &Path) -> Result<Bytes, AssetError> {
        match fs::read(path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.to_path_buf()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write a cache entry, creating parent directories as needed. Reports
    /// success without touching the disk when caching is disabled.
    pub async fn write(&self, path: &Path, data: &[u8]) -> Result<(), AssetError> {
        if !self.enabled {
            debug!(path = ?path, "cache disabled, skipping write");
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| AssetError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, data).await.map_err(|source| AssetError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Obtain bytes for `url` and populate the cache entry at `path`.
    ///
    /// Uses `precomputed` when supplied, otherwise performs a network GET
    /// through the fetch collaborator. The bytes are returned whether or not
    /// the write persisted; a failed write is logged and otherwise ignored
    /// so the immediate caller still gets its data.
    pub async fn fetch_then_write(
        &self,
        url: &str,
        path: &Path,
        precomputed: Option<Bytes>,
    ) -> Result<Bytes, AssetError> {
        let data = match precomputed {
            Some(data) => data,
            None => self.fetcher.fetch(url).await?,
        };

        if let Err(err) = self.write(path, &data).await {
            warn!(path = ?path, error = %err, "cache write failed, returning fetched bytes");
        }

        Ok(data)
    }

    /// Make sure the cache entry for `url` is present, fetching it when
    /// missing or when `overwrite` is requested. Returns the entry's path.
    pub async fn ensure(&self, url: &str, overwrite: bool) -> Result<PathBuf, AssetError> {
        let path = self.resolve(url);
        if !overwrite && self.exists(&path).await {
            return Ok(path);
        }

        self.fetch_then_write(url, &path, None).await?;
        Ok(path)
    }

    /// Serve `url` from the cache, falling back to a write-through fetch on
    /// a miss.
    pub async fn load(&self, url: &str) -> Result<Bytes, AssetError> {
        let path = self.resolve(url);
        if self.exists(&path).await {
            return self.read(&path).await;
        }

        debug!(url = %url, "cache miss, fetching");
        self.fetch_then_write(url, &path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;
    use tempfile::tempdir;

    fn store_at(root: &Path, fetcher: Arc<MockFetcher>, enabled: bool) -> CacheStore {
        CacheStore::new(ResolverConfig::new(root, "assets"), fetcher, enabled)
    }

    #[tokio::test]
    async fn probe_misses_on_empty_cache() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path(), Arc::new(MockFetcher::new()), true);
        assert!(!store.exists(&store.resolve("/assets/a.png?v=1")).await);
    }

    #[tokio::test]
    async fn read_missing_entry_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path(), Arc::new(MockFetcher::new()), true);
        let err = store.read(&store.resolve("/assets/a.png")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path(), Arc::new(MockFetcher::new()), true);
        let path = store.resolve("/assets/data/a.json?v=2");

        store.write(&path, b"payload").await.unwrap();
        assert!(store.exists(&path).await);
        assert_eq!(store.read(&path).await.unwrap(), Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn disabled_write_reports_success_without_persisting() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path(), Arc::new(MockFetcher::new()), false);
        let path = store.resolve("/assets/a.png");

        store.write(&path, b"payload").await.unwrap();
        assert!(!store.exists(&path).await);
    }

    #[tokio::test]
    async fn cache_hit_never_touches_the_network() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let store = store_at(dir.path(), fetcher.clone(), true);
        let path = store.resolve("/assets/a.png?v=1");
        store.write(&path, b"cached").await.unwrap();

        let data = store.load("/assets/a.png?v=1").await.unwrap();
        assert_eq!(data, Bytes::from_static(b"cached"));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn cache_miss_fetches_once_and_writes_one_entry() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.insert("/assets/a.png?v=1", Bytes::from_static(b"fresh"));
        let store = store_at(dir.path(), fetcher.clone(), true);

        let data = store.load("/assets/a.png?v=1").await.unwrap();
        assert_eq!(data, Bytes::from_static(b"fresh"));
        assert_eq!(fetcher.call_count(), 1);
        assert!(store.exists(&store.resolve("/assets/a.png?v=1")).await);

        // second load is served locally
        store.load("/assets/a.png?v=1").await.unwrap();
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn disabled_cache_still_delivers_bytes() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.insert("/assets/a.png", Bytes::from_static(b"fresh"));
        let store = store_at(dir.path(), fetcher.clone(), false);

        let data = store.load("/assets/a.png").await.unwrap();
        assert_eq!(data, Bytes::from_static(b"fresh"));
        assert!(!store.exists(&store.resolve("/assets/a.png")).await);

        // nothing persisted, so every load goes out again
        store.load("/assets/a.png").await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn precomputed_bytes_skip_the_fetch() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let store = store_at(dir.path(), fetcher.clone(), true);
        let path = store.resolve("/assets/a.bin");

        let data = store
            .fetch_then_write("/assets/a.bin", &path, Some(Bytes::from_static(b"given")))
            .await
            .unwrap();
        assert_eq!(data, Bytes::from_static(b"given"));
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(store.read(&path).await.unwrap(), Bytes::from_static(b"given"));
    }

    #[tokio::test]
    async fn ensure_is_conditional_unless_overwriting() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.insert("/assets/a.png?v=1", Bytes::from_static(b"one"));
        let store = store_at(dir.path(), fetcher.clone(), true);

        store.ensure("/assets/a.png?v=1", false).await.unwrap();
        store.ensure("/assets/a.png?v=1", false).await.unwrap();
        assert_eq!(fetcher.call_count(), 1);

        store.ensure("/assets/a.png?v=1", true).await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_propagates() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path(), Arc::new(MockFetcher::new()), true);
        let err = store.load("/assets/missing.png").await.unwrap_err();
        assert!(matches!(err, AssetError::Status(_)));
    }
}

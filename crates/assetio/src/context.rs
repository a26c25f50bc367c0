//! Engine context.
//!
//! One explicit object, constructed once at startup, passed by reference to
//! every proxy and the bridge. Holds the configuration, the cache store,
//! the scheduler and the runtime handle; nothing in the crate reaches for
//! ambient globals.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::runtime::Handle;

use crate::config::AppConfig;
use crate::error::AssetError;
use crate::fetch::{AssetFetcher, FetcherConfig, HttpFetcher};
use crate::resolver::ResolverConfig;
use crate::scheduler::DownloadScheduler;
use crate::store::CacheStore;
use crate::transport::{AssetPayload, ResponseType};
use crate::version::VersionStore;

pub struct AssetContext {
    config: AppConfig,
    store: Arc<CacheStore>,
    scheduler: DownloadScheduler,
    versions: VersionStore,
    runtime: Handle,
}

impl AssetContext {
    pub fn builder() -> AssetContextBuilder {
        AssetContextBuilder::new()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &DownloadScheduler {
        &self.scheduler
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    pub(crate) fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future);
    }

    /// Serve `url` from the cache as a base64-encoded payload.
    pub async fn load_base64(&self, url: &str) -> Result<String, AssetError> {
        Ok(BASE64.encode(self.store.load(url).await?))
    }

    /// Serve `url` from the cache, shaped for the requested response type.
    pub async fn load_payload(
        &self,
        url: &str,
        kind: ResponseType,
    ) -> Result<AssetPayload, AssetError> {
        match kind {
            ResponseType::Binary => Ok(AssetPayload::Binary(self.store.load(url).await?)),
            ResponseType::Unset | ResponseType::Text => {
                Ok(AssetPayload::Text(self.load_base64(url).await?))
            }
        }
    }
}

/// Builder wiring the engine together from the host's configuration.
pub struct AssetContextBuilder {
    config: AppConfig,
    install_root: PathBuf,
    packed: bool,
    origin: Option<String>,
    fetcher: Option<Arc<dyn AssetFetcher>>,
}

impl AssetContextBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            install_root: PathBuf::from("."),
            packed: false,
            origin: None,
            fetcher: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Application install root the cache folder hangs off of.
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = root.into();
        self
    }

    /// Mark the packed/archived application layout.
    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = packed;
        self
    }

    /// Origin of the remote app, used by the default HTTP fetcher.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Replace the network collaborator entirely.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Build the context. Must be called from within a tokio runtime; the
    /// current handle drives the proxies' background loads.
    pub fn build(self) -> Result<Arc<AssetContext>, AssetError> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let origin = self
                    .origin
                    .ok_or_else(|| AssetError::Url("no origin configured".to_owned()))?;
                Arc::new(HttpFetcher::new(&FetcherConfig::new(origin))?)
            }
        };

        let resolver = ResolverConfig::new(self.install_root, self.config.cache_folder_name())
            .packed(self.packed);
        let store = Arc::new(CacheStore::new(
            resolver,
            fetcher,
            self.config.cache_enabled,
        ));
        let versions = VersionStore::new(store.clone());
        let scheduler = DownloadScheduler::new(
            store.clone(),
            versions.clone(),
            self.config.concurrency_window(),
            self.config.skip_download(),
        );

        Ok(Arc::new(AssetContext {
            config: self.config,
            store,
            scheduler,
            versions,
            runtime: Handle::current(),
        }))
    }
}

impl Default for AssetContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

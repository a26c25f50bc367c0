//! # AssetIo
//!
//! A library for transparently serving a remote web app's assets from a
//! local on-disk cache inside a rendering host. Requests and media `src`
//! assignments under the asset namespace are intercepted, probed against
//! the cache and populated from the network on a miss, without any
//! cooperation from the remote app.
//!
//! ## Features
//!
//! - Drop-in transport and media-element decorators over the host's
//!   native primitives
//! - Deterministic URL → path resolution with per-version cache entries
//! - Batched bulk prefetch with a bounded concurrency window, progress
//!   reporting and cooperative cancellation
//! - Write-through cache population with a persisted asset-set version
//!   sentinel

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod media;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod transport;
pub mod version;

pub use bridge::AssetBridge;
pub use config::{AppConfig, NativeMode};
pub use context::{AssetContext, AssetContextBuilder};
pub use error::AssetError;
pub use fetch::{AssetFetcher, FetcherConfig, HttpFetcher};
pub use manifest::{AssetList, AssetManifest, ManifestEntry};
pub use resolver::{resolve, ResolverConfig, ASSET_PREFIX};
pub use scheduler::{BatchHandlers, DownloadScheduler};
pub use store::CacheStore;
pub use version::{VersionStore, BASELINE_ASSET_VERSION};

// Re-export the proxy layer
pub use media::{
    Element, ImageProxy, InterfaceEntry, InterfaceTable, MediaHost, MediaSourceProxy,
    ObjectUrlRegistry, SrcAccessors,
};
pub use transport::{
    AssetPayload, CachingTransport, ErrorEventHandler, EventHandler, ReadyState, ResponseBody,
    ResponseType, Transport,
};

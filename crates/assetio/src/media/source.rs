//! Media-source element proxy.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::{Element, InterfaceTable, SrcAccessors};
use crate::context::AssetContext;
use crate::error::AssetError;
use crate::resolver::ASSET_PREFIX;

/// Host-side registry minting and releasing binary object URLs.
pub trait ObjectUrlRegistry: Send + Sync + 'static {
    /// Mint an object URL backed by `bytes`.
    fn create(&self, bytes: Bytes) -> String;
    /// Release a previously minted object URL.
    fn revoke(&self, url: &str);
}

/// Parent media element owning playback and the `src` the object URL
/// lands on.
pub trait MediaHost: Element {
    /// Register the playback-ended handler. The handler may fire more than
    /// once; single-shot behavior is the registrant's concern.
    fn set_on_ended(&mut self, handler: Box<dyn FnMut() + Send>);
}

/// Wraps a source element so asset-namespace `src` assignments land on the
/// parent media element as cached binary object URLs.
pub struct MediaSourceProxy<E: Element, H: MediaHost> {
    element: Arc<Mutex<E>>,
    host: Arc<Mutex<H>>,
    host_src: SrcAccessors<H>,
    registry: Arc<dyn ObjectUrlRegistry>,
    ctx: Arc<AssetContext>,
    url: Option<String>,
}

impl<E: Element, H: MediaHost> MediaSourceProxy<E, H> {
    /// Wrap `element` under `host`, resolving the host's native `src`
    /// descriptor from its composed interface chain.
    pub fn new(
        element: E,
        host: H,
        host_table: &InterfaceTable<H>,
        registry: Arc<dyn ObjectUrlRegistry>,
        ctx: Arc<AssetContext>,
    ) -> Result<Self, AssetError> {
        let host_src = host_table.src_accessors()?;
        Ok(Self {
            element: Arc::new(Mutex::new(element)),
            host: Arc::new(Mutex::new(host)),
            host_src,
            registry,
            ctx,
            url: None,
        })
    }

    /// Last value assigned through the proxy.
    pub fn src(&self) -> Option<String> {
        self.url.clone()
    }

    pub fn element(&self) -> Arc<Mutex<E>> {
        self.element.clone()
    }

    pub fn host(&self) -> Arc<Mutex<H>> {
        self.host.clone()
    }

    /// Assign `src`. Non-asset URLs reach the host's native setter
    /// unchanged; asset URLs are cached and handed over as an object URL
    /// that is released exactly once when playback ends.
    pub fn set_src(&mut self, url: &str) {
        if url.is_empty() {
            return;
        }
        self.url = Some(url.to_owned());

        if !url.starts_with(ASSET_PREFIX) {
            (self.host_src.set)(&mut self.host.lock(), url);
            return;
        }

        let url = url.to_owned();
        let ctx = Arc::clone(&self.ctx);
        let element = Arc::clone(&self.element);
        let host = Arc::clone(&self.host);
        let registry = Arc::clone(&self.registry);
        let set = self.host_src.set;
        self.ctx.spawn(async move {
            match ctx.store().load(&url).await {
                Ok(bytes) => {
                    let object_url = registry.create(bytes);
                    debug!(url = %url, object_url = %object_url, "media source served from cache");

                    let mut host = host.lock();
                    set(&mut host, &object_url);

                    // released once; later firings find the slot empty
                    let mut pending = Some(object_url);
                    host.set_on_ended(Box::new(move || {
                        if let Some(spent) = pending.take() {
                            registry.revoke(&spent);
                        }
                    }));
                }
                Err(err) => element.lock().emit_error(&err),
            }
        });
    }
}

//! Image element proxy.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{image_mime, Element, InterfaceTable, SrcAccessors};
use crate::context::AssetContext;
use crate::error::AssetError;
use crate::resolver::ASSET_PREFIX;

/// Assignments already carrying inline image data pass through.
const DATA_URL_PREFIX: &str = "data:image/";

/// Wraps a native image element so asset-namespace `src` assignments are
/// served from the cache as data URLs.
pub struct ImageProxy<E: Element> {
    element: Arc<Mutex<E>>,
    src: SrcAccessors<E>,
    ctx: Arc<AssetContext>,
    url: Option<String>,
}

impl<E: Element> ImageProxy<E> {
    /// Wrap `element`, resolving the native `src` descriptor from its
    /// composed interface chain.
    pub fn new(
        element: E,
        table: &InterfaceTable<E>,
        ctx: Arc<AssetContext>,
    ) -> Result<Self, AssetError> {
        let src = table.src_accessors()?;
        Ok(Self {
            element: Arc::new(Mutex::new(element)),
            src,
            ctx,
            url: None,
        })
    }

    /// Last value assigned through the proxy.
    pub fn src(&self) -> Option<String> {
        self.url.clone()
    }

    /// Shared handle to the wrapped element.
    pub fn element(&self) -> Arc<Mutex<E>> {
        self.element.clone()
    }

    /// Assign `src`. Data URLs and non-asset URLs reach the native setter
    /// unchanged; asset URLs resolve through the cache first.
    pub fn set_src(&mut self, url: &str) {
        if url.is_empty() {
            return;
        }
        self.url = Some(url.to_owned());

        if url.starts_with(DATA_URL_PREFIX) || !url.starts_with(ASSET_PREFIX) {
            (self.src.set)(&mut self.element.lock(), url);
            return;
        }

        let url = url.to_owned();
        let ctx = Arc::clone(&self.ctx);
        let element = Arc::clone(&self.element);
        let set = self.src.set;
        self.ctx.spawn(async move {
            match ctx.load_base64(&url).await {
                Ok(encoded) => {
                    let mime = image_mime(&url);
                    debug!(url = %url, mime, "image served from cache");
                    set(
                        &mut element.lock(),
                        &format!("data:{mime};base64,{encoded}"),
                    );
                }
                Err(err) => element.lock().emit_error(&err),
            }
        });
    }
}

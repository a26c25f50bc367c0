//! Caching decorator over the native transport.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::{
    AssetPayload, ErrorEventHandler, EventHandler, ReadyState, ResponseBody, ResponseType,
    Transport,
};
use crate::context::AssetContext;
use crate::error::AssetError;
use crate::resolver::{self, ASSET_PREFIX};

/// Sub-paths under the asset namespace that always pass through.
const EXCLUDED_PREFIXES: &[&str] = &["/assets/fonts", "/assets/asset-map"];

/// Audio container extension left to the native transport.
const EXCLUDED_EXTENSION: &str = "m4a";

/// Classification applied at `send`.
fn intercepts(url: &str) -> bool {
    if !url.starts_with(ASSET_PREFIX) {
        return false;
    }
    if EXCLUDED_PREFIXES.iter().any(|prefix| url.starts_with(prefix)) {
        return false;
    }
    if resolver::url_extension(url).is_some_and(|ext| ext.starts_with(EXCLUDED_EXTENSION)) {
        return false;
    }
    true
}

/// State synthesized by the intercepted path, shadowing the native values.
#[derive(Default)]
struct Synthesized {
    ready_state: Option<ReadyState>,
    status: Option<u16>,
    response: Option<ResponseBody>,
}

/// Drop-in caching wrapper around a native transport.
///
/// Asset-namespace requests are served from the cache (populated on miss);
/// everything else is forwarded untouched. Call sites keep the plain
/// [`Transport`] surface.
pub struct CachingTransport<N: Transport> {
    inner: Arc<Mutex<N>>,
    ctx: Arc<AssetContext>,
    url: Option<String>,
    synthesized: Arc<Mutex<Synthesized>>,
}

impl<N: Transport> CachingTransport<N> {
    pub fn new(inner: N, ctx: Arc<AssetContext>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
            ctx,
            url: None,
            synthesized: Arc::new(Mutex::new(Synthesized::default())),
        }
    }

    fn deliver(payload: AssetPayload, synthesized: &Mutex<Synthesized>, inner: &Mutex<N>) {
        let response = match payload {
            AssetPayload::Text(encoded) => match decode_text(&encoded) {
                Ok(text) => ResponseBody::Text(text),
                Err(err) => {
                    inner.lock().emit_error(&err);
                    return;
                }
            },
            AssetPayload::Binary(bytes) => ResponseBody::Binary(bytes),
        };

        {
            let mut state = synthesized.lock();
            state.response = Some(response);
            state.status = Some(200);
            state.ready_state = Some(ReadyState::Done);
        }

        let mut native = inner.lock();
        native.emit_ready_state_change();
        if native.has_load_handler() {
            native.emit_load();
        } else {
            native.dispatch_load();
        }
    }
}

fn decode_text(encoded: &str) -> Result<String, AssetError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|err| AssetError::Decode(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| AssetError::Decode(err.to_string()))
}

impl<N: Transport> Transport for CachingTransport<N> {
    fn open(&mut self, method: &str, url: &str) {
        self.url = Some(url.to_owned());
        self.inner.lock().open(method, url);
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.inner.lock().set_request_header(name, value);
    }

    fn send(&mut self, body: Option<Bytes>) {
        let Some(url) = self.url.clone() else {
            self.inner.lock().send(body);
            return;
        };
        if !intercepts(&url) {
            self.inner.lock().send(body);
            return;
        }

        let kind = {
            let mut native = self.inner.lock();
            if native.response_type() == ResponseType::Unset {
                native.set_response_type(ResponseType::Text);
            }
            native.response_type()
        };
        self.synthesized.lock().ready_state = Some(ReadyState::Loading);
        debug!(url = %url, "intercepting asset request");

        let ctx = Arc::clone(&self.ctx);
        let inner = Arc::clone(&self.inner);
        let synthesized = Arc::clone(&self.synthesized);
        self.ctx.spawn(async move {
            match ctx.load_payload(&url, kind).await {
                Ok(payload) => Self::deliver(payload, &synthesized, &inner),
                Err(err) => inner.lock().emit_error(&err),
            }
        });
    }

    fn abort(&mut self) {
        self.inner.lock().abort();
    }

    fn ready_state(&self) -> ReadyState {
        self.synthesized
            .lock()
            .ready_state
            .unwrap_or_else(|| self.inner.lock().ready_state())
    }

    fn status(&self) -> u16 {
        self.synthesized
            .lock()
            .status
            .unwrap_or_else(|| self.inner.lock().status())
    }

    fn response(&self) -> Option<ResponseBody> {
        if let Some(response) = self.synthesized.lock().response.clone() {
            return Some(response);
        }
        self.inner.lock().response()
    }

    fn response_url(&self) -> Option<String> {
        self.inner.lock().response_url()
    }

    fn response_type(&self) -> ResponseType {
        self.inner.lock().response_type()
    }

    fn set_response_type(&mut self, kind: ResponseType) {
        self.inner.lock().set_response_type(kind);
    }

    fn response_header(&self, name: &str) -> Option<String> {
        self.inner.lock().response_header(name)
    }

    fn all_response_headers(&self) -> String {
        self.inner.lock().all_response_headers()
    }

    fn set_on_ready_state_change(&mut self, handler: EventHandler) {
        self.inner.lock().set_on_ready_state_change(handler);
    }

    fn set_on_load(&mut self, handler: EventHandler) {
        self.inner.lock().set_on_load(handler);
    }

    fn set_on_error(&mut self, handler: ErrorEventHandler) {
        self.inner.lock().set_on_error(handler);
    }

    fn has_load_handler(&self) -> bool {
        self.inner.lock().has_load_handler()
    }

    fn emit_ready_state_change(&mut self) {
        self.inner.lock().emit_ready_state_change();
    }

    fn emit_load(&mut self) {
        self.inner.lock().emit_load();
    }

    fn emit_error(&mut self, error: &AssetError) {
        self.inner.lock().emit_error(error);
    }

    fn dispatch_load(&mut self) {
        self.inner.lock().dispatch_load();
    }
}

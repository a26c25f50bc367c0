//! Native transport surface and its caching decorator.
//!
//! [`Transport`] is the capability set of the host's request primitive.
//! [`CachingTransport`] wraps any implementation of it, selected at
//! construction time, and keeps the observable contract (readiness
//! transitions, status, response shape) indistinguishable between the
//! pass-through and intercepted paths, timing aside.

mod intercept;

pub use intercept::CachingTransport;

use bytes::Bytes;

use crate::error::AssetError;

/// Readiness of a request, mirroring the host primitive's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    Unsent,
    Opened,
    HeadersReceived,
    Loading,
    Done,
}

/// Declared shape of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Nothing set by the caller; treated as text on interception.
    #[default]
    Unset,
    Text,
    Binary,
}

/// A delivered response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Text(String),
    Binary(Bytes),
}

/// Payload shape the cache layer produces for delivery: text consumers
/// receive their bytes base64-encoded, binary consumers receive them raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPayload {
    Text(String),
    Binary(Bytes),
}

pub type EventHandler = Box<dyn FnMut() + Send>;
pub type ErrorEventHandler = Box<dyn FnMut(&AssetError) + Send>;

/// Surface of the host's native request primitive.
///
/// The `emit_*` methods invoke the handlers registered on this transport;
/// `dispatch_load` routes a synthetic load event through the transport's
/// own event machinery instead. Both are needed so a wrapper can complete
/// a request on the primitive's behalf.
pub trait Transport: Send + 'static {
    fn open(&mut self, method: &str, url: &str);
    fn set_request_header(&mut self, name: &str, value: &str);
    fn send(&mut self, body: Option<Bytes>);
    fn abort(&mut self);

    fn ready_state(&self) -> ReadyState;
    fn status(&self) -> u16;
    fn response(&self) -> Option<ResponseBody>;
    fn response_url(&self) -> Option<String>;
    fn response_type(&self) -> ResponseType;
    fn set_response_type(&mut self, kind: ResponseType);
    fn response_header(&self, name: &str) -> Option<String>;
    fn all_response_headers(&self) -> String;

    fn set_on_ready_state_change(&mut self, handler: EventHandler);
    fn set_on_load(&mut self, handler: EventHandler);
    fn set_on_error(&mut self, handler: ErrorEventHandler);
    fn has_load_handler(&self) -> bool;

    /// Invoke the registered ready-state-change handler, if any.
    fn emit_ready_state_change(&mut self);
    /// Invoke the registered load handler, if any.
    fn emit_load(&mut self);
    /// Invoke the registered error handler, if any.
    fn emit_error(&mut self, error: &AssetError);
    /// Dispatch a synthetic load event through the event machinery.
    fn dispatch_load(&mut self);
}

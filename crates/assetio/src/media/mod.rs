//! Media element proxies.
//!
//! Image and media-source elements trigger loads through property
//! assignment rather than a request call, so interception wraps the
//! element and overrides its `src` setter. The native descriptor is not
//! declared on the element itself but on an ancestor interface; lookup
//! walks an explicit composed interface table, most-derived entry first,
//! resolved once at proxy construction.

mod image;
mod source;

pub use image::ImageProxy;
pub use source::{MediaHost, MediaSourceProxy, ObjectUrlRegistry};

use crate::error::AssetError;
use crate::resolver;

/// A native element with a registered error channel.
pub trait Element: Send + 'static {
    /// Invoke the element's registered error handler, if one is present.
    fn emit_error(&mut self, error: &AssetError);
}

/// Accessors for the `src` attribute as declared by one interface.
pub struct SrcAccessors<E: ?Sized> {
    pub set: fn(&mut E, &str),
    pub get: fn(&E) -> Option<String>,
}

impl<E: ?Sized> Clone for SrcAccessors<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ?Sized> Copy for SrcAccessors<E> {}

/// One interface in an element's composed interface chain.
pub struct InterfaceEntry<E: ?Sized> {
    /// Interface name, e.g. `"HTMLImageElement"`.
    pub interface: &'static str,
    /// The `src` descriptor, when this interface declares it.
    pub src: Option<SrcAccessors<E>>,
}

/// Composed interface table for an element type, most-derived first.
pub struct InterfaceTable<E: ?Sized> {
    entries: Vec<InterfaceEntry<E>>,
}

impl<E: ?Sized> InterfaceTable<E> {
    pub fn new(entries: Vec<InterfaceEntry<E>>) -> Self {
        Self { entries }
    }

    /// First `src` descriptor found walking the chain upward.
    pub fn src_accessors(&self) -> Result<SrcAccessors<E>, AssetError> {
        self.entries
            .iter()
            .find_map(|entry| entry.src)
            .ok_or(AssetError::MissingSrcDescriptor)
    }
}

/// Ordered extension → MIME table for image data URLs.
const IMAGE_MIME_TABLE: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("webp", "image/webp"),
];

const FALLBACK_IMAGE_MIME: &str = "image/png";

/// MIME type for an asset URL, defaulting to PNG for unknown extensions.
/// Matching tolerates the `?v=` remnant carried by versioned URLs.
pub(crate) fn image_mime(url: &str) -> &'static str {
    let Some(ext) = resolver::url_extension(url) else {
        return FALLBACK_IMAGE_MIME;
    };
    IMAGE_MIME_TABLE
        .iter()
        .find(|(prefix, _)| ext.starts_with(prefix))
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_IMAGE_MIME)
}

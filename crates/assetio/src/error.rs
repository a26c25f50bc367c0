use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;

// Custom error type for cache and download operations
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not cached: {}", .0.display())]
    NotFound(PathBuf),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status code {0}")]
    Status(StatusCode),

    #[error("cache write failed for {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(String),

    #[error("payload decode failed: {0}")]
    Decode(String),

    #[error("no src attribute declared in the element's interface chain")]
    MissingSrcDescriptor,
}

impl AssetError {
    /// Whether this error is an expected local-probe miss rather than a
    /// failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound(_))
    }
}

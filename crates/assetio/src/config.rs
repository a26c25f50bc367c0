//! Process configuration, read once by the host shell before any proxy
//! installs and never mutated afterwards.

use serde::Deserialize;

use crate::error::AssetError;

/// Cache folder used when no override is configured.
pub const DEFAULT_CACHE_FOLDER: &str = "assets";

/// Number of downloads issued together in one scheduler group.
pub const DEFAULT_CONCURRENCY_WINDOW: usize = 10;

/// Recognized options of the host's configuration object.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Whether cache writes persist to disk. Disabling never blocks asset
    /// delivery, it only disables persistence.
    pub cache_enabled: bool,
    /// Override for the cache folder name under the install root.
    pub cache_folder: Option<String>,
    /// Native interception options; `None` leaves the proxies uninstalled.
    pub native_mode: Option<NativeMode>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_folder: None,
            native_mode: None,
        }
    }
}

/// Options of the native interception layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NativeMode {
    pub enabled: bool,
    /// Pre-arms the bulk-download cancellation flag at startup.
    pub skip_download: bool,
    /// Concurrency window for bulk downloads.
    pub async_count: usize,
}

impl Default for NativeMode {
    fn default() -> Self {
        Self {
            enabled: false,
            skip_download: false,
            async_count: DEFAULT_CONCURRENCY_WINDOW,
        }
    }
}

impl AppConfig {
    /// Parse the configuration payload handed over by the host shell.
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Effective cache folder name.
    pub fn cache_folder_name(&self) -> &str {
        self.cache_folder.as_deref().unwrap_or(DEFAULT_CACHE_FOLDER)
    }

    /// Effective concurrency window, always at least 1.
    pub fn concurrency_window(&self) -> usize {
        self.native_mode
            .as_ref()
            .map(|native| native.async_count)
            .unwrap_or(DEFAULT_CONCURRENCY_WINDOW)
            .max(1)
    }

    pub fn native_enabled(&self) -> bool {
        self.native_mode.as_ref().is_some_and(|native| native.enabled)
    }

    pub fn skip_download(&self) -> bool {
        self.native_mode
            .as_ref()
            .is_some_and(|native| native.skip_download)
    }
}

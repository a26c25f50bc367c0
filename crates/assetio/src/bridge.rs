//! Host-installed bridge exposed to the remote app.
//!
//! Bulk prefetch, cancellation and the current asset version, all with
//! callback-style delivery: exactly one of `on_complete` / `on_error`
//! fires per run, exactly once.

use std::sync::Arc;

use tracing::warn;

use crate::context::AssetContext;
use crate::manifest::AssetManifest;
use crate::scheduler::BatchHandlers;

pub struct AssetBridge {
    ctx: Arc<AssetContext>,
}

impl AssetBridge {
    pub fn new(ctx: Arc<AssetContext>) -> Self {
        Self { ctx }
    }

    /// Start a bulk prefetch for the manifest JSON handed over by the
    /// remote app. Fire-and-forget; every outcome arrives through
    /// `handlers`.
    pub fn download_manifest(&self, manifest_json: &str, handlers: BatchHandlers) {
        let manifest = match AssetManifest::parse(manifest_json) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!(error = %err, "manifest rejected");
                (handlers.on_error)(err);
                return;
            }
        };

        let scheduler = self.ctx.scheduler().clone();
        self.ctx
            .spawn(async move { scheduler.run_manifest(manifest, false, handlers).await });
    }

    /// Signal cancellation. Takes effect at the next group boundary; the
    /// in-flight group always completes.
    pub fn cancel_download(&self) {
        self.ctx.scheduler().cancel();
    }

    /// Deliver the currently cached asset-set version to `callback`.
    pub fn current_asset_version(&self, callback: Box<dyn FnOnce(String) + Send>) {
        let versions = self.ctx.versions().clone();
        self.ctx
            .spawn(async move { callback(versions.current().await) });
    }
}

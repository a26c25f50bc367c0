//! Batched concurrent download scheduler.
//!
//! Downloads a manifest's assets in sequential groups of at most the
//! configured concurrency window. Unbounded concurrent downloads would
//! exhaust descriptor limits and hammer the remote server; windowed groups
//! bound the peak deterministically. Within a group members run
//! concurrently with no ordering guarantee; group N+1 never starts before
//! group N has fully settled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::AssetError;
use crate::manifest::AssetManifest;
use crate::store::CacheStore;
use crate::version::VersionStore;

/// Callback triple for one manifest run. At most one of `on_complete` /
/// `on_error` fires, exactly once.
pub struct BatchHandlers {
    /// Invoked after every clean group with the overall percentage (0-100).
    pub on_progress: Box<dyn Fn(f64) + Send + Sync>,
    /// Invoked once the whole manifest is present and committed.
    pub on_complete: Box<dyn FnOnce() + Send>,
    /// Invoked when a group fails; the run is abandoned.
    pub on_error: Box<dyn FnOnce(AssetError) + Send>,
}

impl BatchHandlers {
    /// Handlers that drop every notification.
    pub fn discard() -> Self {
        Self {
            on_progress: Box::new(|_| {}),
            on_complete: Box::new(|| {}),
            on_error: Box::new(|_| {}),
        }
    }
}

/// Fetches manifest batches with a bounded concurrency window, reporting
/// progress and honoring cooperative cancellation.
#[derive(Clone)]
pub struct DownloadScheduler {
    store: Arc<CacheStore>,
    versions: VersionStore,
    window: usize,
    cancelled: Arc<AtomicBool>,
}

impl DownloadScheduler {
    /// `start_cancelled` pre-arms the flag so bulk prefetch is suppressed
    /// from startup (the skip-download option).
    pub fn new(
        store: Arc<CacheStore>,
        versions: VersionStore,
        window: usize,
        start_cancelled: bool,
    ) -> Self {
        Self {
            store,
            versions,
            window: window.max(1),
            cancelled: Arc::new(AtomicBool::new(start_cancelled)),
        }
    }

    /// Signal cancellation. Set once per session, never reset; observed
    /// only at group boundaries, so the in-flight group always completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Download every asset of `manifest`, committing its version to the
    /// sentinel after a full, uncancelled run. All outcomes are delivered
    /// through `handlers`.
    pub async fn run_manifest(
        &self,
        manifest: AssetManifest,
        overwrite: bool,
        handlers: BatchHandlers,
    ) {
        let total = manifest.len();
        let mut downloaded = 0usize;

        for group in manifest.assets.as_slice().chunks(self.window) {
            if self.is_cancelled() {
                debug!(downloaded, total, "manifest run cancelled");
                return;
            }

            let downloads = group.iter().map(|entry| {
                let url = entry.url();
                async move { self.store.ensure(&url, overwrite).await }
            });
            let results = join_all(downloads).await;

            if let Some(err) = results.into_iter().find_map(Result::err) {
                warn!(error = %err, downloaded, total, "manifest group failed, aborting run");
                (handlers.on_error)(err);
                return;
            }

            downloaded += group.len();
            (handlers.on_progress)(downloaded as f64 / total as f64 * 100.0);
        }

        if downloaded == total && !self.is_cancelled() {
            if let Err(err) = self.versions.advance(&manifest.version).await {
                (handlers.on_error)(err);
                return;
            }
            debug!(total, version = %manifest.version, "manifest run complete");
            (handlers.on_complete)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;
    use crate::resolver::ResolverConfig;
    use crate::version::BASELINE_ASSET_VERSION;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::tempdir;

    struct Harness {
        fetcher: Arc<MockFetcher>,
        store: Arc<CacheStore>,
        versions: VersionStore,
    }

    fn harness(root: &Path, fetcher: MockFetcher) -> Harness {
        let fetcher = Arc::new(fetcher);
        let store = Arc::new(CacheStore::new(
            ResolverConfig::new(root, "assets"),
            fetcher.clone(),
            true,
        ));
        let versions = VersionStore::new(store.clone());
        Harness {
            fetcher,
            store,
            versions,
        }
    }

    fn manifest(n: usize) -> AssetManifest {
        let entries: Vec<String> = (0..n)
            .map(|i| format!(r#""/assets/f{i}.png": "?v=1""#))
            .collect();
        AssetManifest::parse(&format!(
            r#"{{"version": "7", "assets": {{{}}}}}"#,
            entries.join(",")
        ))
        .unwrap()
    }

    fn seed(fetcher: &MockFetcher, n: usize) {
        for i in 0..n {
            fetcher.insert(format!("/assets/f{i}.png?v=1"), Bytes::from_static(b"px"));
        }
    }

    fn progress_recorder() -> (Arc<Mutex<Vec<f64>>>, Box<dyn Fn(f64) + Send + Sync>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |pct| sink.lock().push(pct)))
    }

    fn counting_handlers(
        progress: Box<dyn Fn(f64) + Send + Sync>,
        completions: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
    ) -> BatchHandlers {
        BatchHandlers {
            on_progress: progress,
            on_complete: Box::new(move || {
                completions.fetch_add(1, Ordering::SeqCst);
            }),
            on_error: Box::new(move |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            }),
        }
    }

    #[tokio::test]
    async fn sequential_run_reports_two_steps_and_commits() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new();
        seed(&fetcher, 2);
        let h = harness(dir.path(), fetcher);
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 1, false);

        let (seen, progress) = progress_recorder();
        let completions = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        scheduler
            .run_manifest(
                manifest(2),
                false,
                counting_handlers(progress, completions.clone(), errors.clone()),
            )
            .await;

        assert_eq!(*seen.lock(), vec![50.0, 100.0]);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(h.fetcher.call_count(), 2);
        assert_eq!(h.versions.current().await, "7");
    }

    #[tokio::test]
    async fn progress_steps_are_ceil_of_total_over_window() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new();
        seed(&fetcher, 7);
        let h = harness(dir.path(), fetcher);
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 3, false);

        let (seen, progress) = progress_recorder();
        let handlers = BatchHandlers {
            on_progress: progress,
            ..BatchHandlers::discard()
        };
        scheduler.run_manifest(manifest(7), false, handlers).await;

        let seen = seen.lock();
        // ceil(7 / 3) groups, monotonic, ending at 100
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), 100.0);
    }

    #[tokio::test]
    async fn concurrency_stays_within_the_window() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::with_delay(Duration::from_millis(20));
        seed(&fetcher, 8);
        let h = harness(dir.path(), fetcher);
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 3, false);

        scheduler
            .run_manifest(manifest(8), false, BatchHandlers::discard())
            .await;

        assert!(h.fetcher.peak_concurrency() <= 3);
        assert_eq!(h.fetcher.call_count(), 8);
    }

    #[tokio::test]
    async fn cancellation_between_groups_stops_quietly() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new();
        seed(&fetcher, 2);
        let h = harness(dir.path(), fetcher);
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 1, false);
        h.versions.advance("6").await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let completions = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let cancel_after_first: Box<dyn Fn(f64) + Send + Sync> = {
            let scheduler = scheduler.clone();
            let sink = seen.clone();
            Box::new(move |pct| {
                sink.lock().push(pct);
                scheduler.cancel();
            })
        };
        scheduler
            .run_manifest(
                manifest(2),
                false,
                counting_handlers(cancel_after_first, completions.clone(), errors.clone()),
            )
            .await;

        assert_eq!(*seen.lock(), vec![50.0]);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        // prior sentinel value survives a cancelled run
        assert_eq!(h.versions.current().await, "6");
    }

    #[tokio::test]
    async fn pre_armed_cancellation_skips_the_whole_run() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new();
        seed(&fetcher, 2);
        let h = harness(dir.path(), fetcher);
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 1, true);

        scheduler
            .run_manifest(manifest(2), false, BatchHandlers::discard())
            .await;

        assert_eq!(h.fetcher.call_count(), 0);
        assert_eq!(h.versions.current().await, BASELINE_ASSET_VERSION);
    }

    #[tokio::test]
    async fn group_failure_aborts_without_commit() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new();
        // only the first asset is resolvable
        fetcher.insert("/assets/f0.png?v=1", Bytes::from_static(b"px"));
        let h = harness(dir.path(), fetcher);
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 1, false);

        let (seen, progress) = progress_recorder();
        let completions = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        scheduler
            .run_manifest(
                manifest(2),
                false,
                counting_handlers(progress, completions.clone(), errors.clone()),
            )
            .await;

        assert_eq!(*seen.lock(), vec![50.0]);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(h.versions.current().await, BASELINE_ASSET_VERSION);
    }

    #[tokio::test]
    async fn already_cached_assets_are_not_refetched() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new();
        seed(&fetcher, 2);
        let h = harness(dir.path(), fetcher);
        let path = h.store.resolve("/assets/f0.png?v=1");
        h.store.write(&path, b"px").await.unwrap();
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 2, false);

        scheduler
            .run_manifest(manifest(2), false, BatchHandlers::discard())
            .await;

        assert_eq!(h.fetcher.call_count(), 1);
        assert_eq!(h.versions.current().await, "7");
    }

    #[tokio::test]
    async fn empty_manifest_completes_vacuously() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), MockFetcher::new());
        let scheduler = DownloadScheduler::new(h.store.clone(), h.versions.clone(), 10, false);

        let completions = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let (_, progress) = progress_recorder();
        scheduler
            .run_manifest(
                AssetManifest::parse(r#"{"version": "9", "assets": {}}"#).unwrap(),
                false,
                counting_handlers(progress, completions.clone(), errors.clone()),
            )
            .await;

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(h.versions.current().await, "9");
    }
}

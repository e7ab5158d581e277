//! Progress-callback trait for per-page pipeline events.
//!
//! Inject an `Arc<dyn ResizeProgress>` via
//! [`crate::config::ResizeConfigBuilder::progress`] to receive real-time
//! events as the pipeline processes each page. Callbacks are the
//! least-invasive integration point: callers can forward events to a
//! terminal progress bar, a channel, or a database record without the
//! library knowing how the host application communicates.

use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// Pages are processed concurrently, so `on_page_*` methods may be called
/// from different threads at once; implementations must protect shared
/// mutable state. All methods have default no-op implementations so
/// callers only override what they care about.
pub trait ResizeProgress: Send + Sync {
    /// Called once, after page conversion, before any page is scaled.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page enters the scale/raster/tile stages.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's tiles have all been written.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, tile_count: usize) {
        let _ = (page_num, total_pages, tile_count);
    }

    /// Called when a page fails (it will be missing from the archive).
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after all pages have been attempted.
    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ResizeProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::ResizeConfig`].
pub type ProgressHook = Arc<dyn ResizeProgress>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingProgress {
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ResizeProgress for TrackingProgress {
        fn on_page_complete(&self, _page: usize, _total: usize, _tiles: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_does_not_panic() {
        let hook = NoopProgress;
        hook.on_run_start(3);
        hook.on_page_start(1, 3);
        hook.on_page_complete(1, 3, 4);
        hook.on_page_error(2, 3, "render failed");
        hook.on_run_complete(3, 2);
    }

    #[test]
    fn tracking_receives_events() {
        let hook = TrackingProgress {
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };
        hook.on_page_complete(1, 2, 6);
        hook.on_page_error(2, 2, "pdf2svg missing");
        assert_eq!(hook.completes.load(Ordering::SeqCst), 1);
        assert_eq!(hook.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_hook_works() {
        let hook: ProgressHook = Arc::new(NoopProgress);
        hook.on_run_start(10);
        hook.on_page_complete(1, 10, 2);
    }
}

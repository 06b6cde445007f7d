//! Progress-callback trait for per-page split events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to be told when a
//! document has been opened and each time a page image lands in the store.
//!
//! # Example
//!
//! ```rust
//! use pdfsplit::{SplitConfig, SplitProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl SplitProgressCallback for Counter {
//!     fn on_page_stored(&self, page_num: usize, total_pages: usize, location: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{page_num}/{total_pages} → {location}");
//!     }
//! }
//!
//! let config = SplitConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as a split advances.
///
/// All methods default to no-ops. Pages are stored strictly in order on one
/// task, so calls for a single request never overlap; the `Send + Sync` bound
/// exists because one callback may be shared by concurrent requests.
pub trait SplitProgressCallback: Send + Sync {
    /// The document was opened and holds `total_pages` pages.
    fn on_split_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Page `page_num` (1-indexed) was written to `location`.
    fn on_page_stored(&self, page_num: usize, total_pages: usize, location: &str) {
        let _ = (page_num, total_pages, location);
    }

    /// Every page was stored. Not called when the split fails.
    fn on_split_complete(&self, stored_pages: usize) {
        let _ = stored_pages;
    }
}

/// Callback that ignores every event.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        total: AtomicUsize,
        locations: Mutex<Vec<String>>,
        completed: AtomicUsize,
    }

    impl SplitProgressCallback for Recorder {
        fn on_split_start(&self, total_pages: usize) {
            self.total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_stored(&self, _page_num: usize, _total_pages: usize, location: &str) {
            self.locations.lock().unwrap().push(location.to_string());
        }

        fn on_split_complete(&self, stored_pages: usize) {
            self.completed.store(stored_pages, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_split_start(3);
        cb.on_page_stored(1, 3, "memory://output/a-001.jpg");
        cb.on_split_complete(3);
    }

    #[test]
    fn recorder_receives_events_through_arc_dyn() {
        let recorder = Arc::new(Recorder::default());
        let cb: ProgressCallback = recorder.clone();

        cb.on_split_start(2);
        cb.on_page_stored(1, 2, "a-001.jpg");
        cb.on_page_stored(2, 2, "a-002.jpg");
        cb.on_split_complete(2);

        assert_eq!(recorder.total.load(Ordering::SeqCst), 2);
        assert_eq!(
            *recorder.locations.lock().unwrap(),
            vec!["a-001.jpg".to_string(), "a-002.jpg".to_string()]
        );
        assert_eq!(recorder.completed.load(Ordering::SeqCst), 2);
    }
}

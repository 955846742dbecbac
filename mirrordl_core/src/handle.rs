//! The public, shareable handle to a running download: status, cancellation,
//! and the progress/finish callback slots.
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle of a download started through [`crate::get`], [`crate::post`],
/// or [`crate::get_chunks`].
///
/// Transitions are monotonic: `InProgress -> Completed` or
/// `InProgress -> Failed`, never the reverse. Set exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    InProgress,
    Completed,
    Failed,
}

impl Status {
    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Status::InProgress,
            1 => Status::Completed,
            _ => Status::Failed,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Status::InProgress => 0,
            Status::Completed => 1,
            Status::Failed => 2,
        }
    }
}

type ProgressCallback = Box<dyn Fn(&DownloadHandle, u64) + Send + Sync + 'static>;
type FinishCallback = Box<dyn Fn(&DownloadHandle, Status) + Send + Sync + 'static>;

struct Inner {
    status: AtomicU8,
    cancelled: AtomicBool,
    on_progress: Mutex<Option<ProgressCallback>>,
    on_finish: Mutex<Option<FinishCallback>>,
}

/// A cheap, `Clone`-able reference to one in-flight (or finished) download.
///
/// Every clone observes the same underlying state: the inner `Arc`'d status,
/// cancellation flag, and callback slots are shared. Callbacks are always
/// invoked with a `&DownloadHandle` so that `cancel()` can be called from
/// inside a progress or finish callback without re-entering ownership of
/// anything.
#[derive(Clone)]
pub struct DownloadHandle {
    inner: Arc<Inner>,
}

impl DownloadHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                status: AtomicU8::new(Status::InProgress.tag()),
                cancelled: AtomicBool::new(false),
                on_progress: Mutex::new(None),
                on_finish: Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> Status {
        Status::from_tag(self.inner.status.load(Ordering::SeqCst))
    }

    /// Requests cancellation. Once set, neither `on_progress` nor
    /// `on_finish` fires again, no matter what a fetch task in flight at the
    /// time goes on to do; `finish` still records the terminal status
    /// internally (so `status()` keeps working), it just stops short of
    /// invoking the callback.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a callback invoked each time bytes land in the writer, with
    /// the cumulative number of bytes received so far.
    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&DownloadHandle, u64) + Send + Sync + 'static,
    {
        *self.inner.on_progress.lock().unwrap() = Some(Box::new(callback));
    }

    /// Registers a callback invoked exactly once, when the download reaches
    /// a terminal state.
    pub fn on_finish<F>(&self, callback: F)
    where
        F: Fn(&DownloadHandle, Status) + Send + Sync + 'static,
    {
        *self.inner.on_finish.lock().unwrap() = Some(Box::new(callback));
    }

    pub(crate) fn emit_progress(&self, total_bytes: u64) {
        if self.is_cancelled() {
            return;
        }
        if let Some(callback) = self.inner.on_progress.lock().unwrap().as_ref() {
            callback(self, total_bytes);
        }
    }

    /// Sets the terminal status, unless the status was already set
    /// (set-once: the first caller wins, later callers are no-ops), then
    /// fires `on_finish`, unless the handle was cancelled, in which case the
    /// status is still recorded but the callback is skipped.
    pub(crate) fn finish(&self, status: Status) {
        debug_assert_ne!(status, Status::InProgress);
        let prev = self.inner.status.compare_exchange(
            Status::InProgress.tag(),
            status.tag(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if prev.is_err() {
            return;
        }
        if self.is_cancelled() {
            return;
        }
        if let Some(callback) = self.inner.on_finish.lock().unwrap().as_ref() {
            callback(self, status);
        }
    }
}

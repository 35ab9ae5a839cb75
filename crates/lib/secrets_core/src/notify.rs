//! Toast notifications.
//!
//! Every operation outcome is published as a short-lived toast. Toasts are
//! shown oldest first and each one expires on its own timer, a fixed dwell
//! after it was published.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Default time a toast stays visible: 3.5 seconds.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(3_500);

/// Identity of a toast, unique within its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
    pub published_at: Instant,
}

struct Inner {
    toasts: Mutex<Vec<Toast>>,
    /// Owned by the queue so identities never leak across instances.
    next_id: AtomicU64,
    dwell: Duration,
}

impl Inner {
    fn toasts(&self) -> MutexGuard<'_, Vec<Toast>> {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: ToastId) -> bool {
        let mut toasts = self.toasts();
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }
}

/// FIFO queue of visible toasts. Cheap to clone; clones share the queue.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<Inner>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::with_dwell(DEFAULT_DWELL)
    }

    pub fn with_dwell(dwell: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                toasts: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                dwell,
            }),
        }
    }

    pub fn dwell(&self) -> Duration {
        self.inner.dwell
    }

    /// Enqueue a toast and schedule its removal after the dwell interval.
    ///
    /// Identical messages are not merged.
    pub fn publish(&self, message: impl Into<String>, severity: Severity) -> ToastId {
        let id = ToastId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let message = message.into();
        debug!(%id, severity = severity.as_str(), %message, "toast published");
        self.inner.toasts().push(Toast {
            id,
            message,
            severity,
            published_at: Instant::now(),
        });

        // Outside a runtime the toast still expires: `toasts()` prunes by age.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::downgrade(&self.inner);
            let dwell = self.inner.dwell;
            handle.spawn(async move {
                tokio::time::sleep(dwell).await;
                if let Some(inner) = inner.upgrade()
                    && inner.remove(id)
                {
                    debug!(%id, "toast expired");
                }
            });
        }
        id
    }

    /// Remove a toast before its timer fires. Returns whether it was present.
    pub fn dismiss(&self, id: ToastId) -> bool {
        self.inner.remove(id)
    }

    /// Visible toasts, oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        let dwell = self.inner.dwell;
        let now = Instant::now();
        let mut toasts = self.inner.toasts();
        toasts.retain(|t| now.duration_since(t.published_at) < dwell);
        toasts.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts().is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

//! Network-activity accounting.
//!
//! [`NetworkActivity`] counts requests that are between `will_send` and
//! `did_receive`. It is an ordinary value: create one, hand clones to the
//! endpoints that should feed it through [`NetworkActivityPlugin`], and watch
//! it from whatever shows a busy indicator.

use crate::plugin::{Plugin, RawOutcome, RequestDescriptor};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

type VisibilityHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// A shared counter of in-flight requests.
///
/// Clones share the same count.
///
/// # Examples
///
/// ```
/// use outcall::NetworkActivity;
///
/// let activity = NetworkActivity::new();
/// activity.increment();
/// assert!(activity.is_active());
/// activity.decrement();
/// assert_eq!(activity.count(), 0);
/// ```
#[derive(Clone)]
pub struct NetworkActivity {
    inner: Arc<ActivityInner>,
}

struct ActivityInner {
    count: Mutex<usize>,
    changes: watch::Sender<usize>,
    on_visibility: Option<VisibilityHandler>,
}

impl NetworkActivity {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a counter that calls `handler` whenever the count moves
    /// between zero and non-zero. The argument is `true` when activity starts.
    ///
    /// The handler runs while the counter is locked and must not call back
    /// into this `NetworkActivity`.
    pub fn with_visibility_handler<F>(handler: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        Self::build(Some(Arc::new(handler)))
    }

    fn build(on_visibility: Option<VisibilityHandler>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(ActivityInner {
                count: Mutex::new(0),
                changes,
                on_visibility,
            }),
        }
    }

    /// Records one more request in flight.
    pub fn increment(&self) {
        self.adjust(|count| Some(count + 1));
    }

    /// Records one request finishing.
    ///
    /// An unpaired call at zero is logged and ignored.
    pub fn decrement(&self) {
        self.adjust(|count| count.checked_sub(1));
    }

    /// Increments now and decrements when the returned guard is dropped.
    pub fn track(&self) -> ActivityGuard {
        self.increment();
        ActivityGuard {
            activity: self.clone(),
        }
    }

    /// The number of requests currently in flight.
    pub fn count(&self) -> usize {
        *self
            .inner
            .count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` while at least one request is in flight.
    pub fn is_active(&self) -> bool {
        self.count() > 0
    }

    /// Subscribes to count changes.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.changes.subscribe()
    }

    fn adjust(&self, step: impl FnOnce(usize) -> Option<usize>) {
        let mut count = self
            .inner
            .count
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = *count;
        let Some(after) = step(before) else {
            tracing::warn!("Network activity decremented below zero; ignoring");
            return;
        };
        *count = after;
        self.inner.changes.send_replace(after);

        if (before == 0) != (after == 0) {
            tracing::trace!(active = after > 0, "Network activity visibility changed");
            if let Some(handler) = &self.inner.on_visibility {
                handler(after > 0);
            }
        }
    }
}

impl Default for NetworkActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NetworkActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkActivity")
            .field("count", &self.count())
            .finish()
    }
}

/// Decrements its [`NetworkActivity`] when dropped.
#[must_use = "dropping the guard ends the tracked activity immediately"]
pub struct ActivityGuard {
    activity: NetworkActivity,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.activity.decrement();
    }
}

/// Feeds a [`NetworkActivity`] from request hooks.
///
/// Attach it as an endpoint-wide plugin so every request is counted. Each
/// `will_send` is paired with exactly one `did_receive`, including for
/// cancelled requests, so the count returns to zero once everything is done.
#[derive(Debug, Clone)]
pub struct NetworkActivityPlugin {
    activity: NetworkActivity,
}

impl NetworkActivityPlugin {
    /// Creates a plugin that feeds `activity`.
    pub fn new(activity: NetworkActivity) -> Self {
        Self { activity }
    }

    /// The counter this plugin feeds.
    pub fn activity(&self) -> &NetworkActivity {
        &self.activity
    }
}

impl Plugin for NetworkActivityPlugin {
    fn will_send(&self, _request: &RequestDescriptor) {
        self.activity.increment();
    }

    fn did_receive(&self, _request: &RequestDescriptor, _outcome: &RawOutcome<'_>) {
        self.activity.decrement();
    }
}

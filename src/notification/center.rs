//! Active toast set with per-entry expiry timers.
//!
//! Each enqueued notification gets exactly one spawned timer task. The task
//! holds only a weak reference to the center, and its `JoinHandle` is kept
//! next to the entry so that dismissal aborts it deterministically. Removal
//! goes through a single lookup under the lock, so a timer that fires after a
//! dismissal finds nothing to remove.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{Anchor, Notification, NotificationId, NotificationOptions, Severity};
use crate::config::NotificationSettings;

struct Entry {
    notification: Notification,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Drop for State {
    fn drop(&mut self) {
        for entry in &self.entries {
            entry.timer.abort();
        }
    }
}

struct Inner {
    state: Mutex<State>,
    settings: NotificationSettings,
    narrow_viewport: AtomicBool,
    snapshots: watch::Sender<Vec<Notification>>,
}

/// Owner of the active notification list.
///
/// Cloning yields another handle to the same center. All operations are
/// non-blocking; [`enqueue`](Self::enqueue) spawns the expiry timer on the
/// current Tokio runtime.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(NotificationSettings::default())
    }
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("active", &self.len())
            .field("narrow_viewport", &self.is_narrow_viewport())
            .finish()
    }
}

impl NotificationCenter {
    /// Creates an empty center with the given defaults.
    pub fn new(settings: NotificationSettings) -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                settings,
                narrow_viewport: AtomicBool::new(false),
                snapshots,
            }),
        }
    }

    /// Returns the defaults this center was built with.
    pub fn settings(&self) -> &NotificationSettings {
        &self.inner.settings
    }

    /// Switches the default anchor between the regular and narrow layouts.
    pub fn set_narrow_viewport(&self, narrow: bool) {
        self.inner.narrow_viewport.store(narrow, Ordering::SeqCst);
    }

    pub fn is_narrow_viewport(&self) -> bool {
        self.inner.narrow_viewport.load(Ordering::SeqCst)
    }

    /// Anchor used when a caller does not specify one.
    pub fn default_anchor(&self) -> Anchor {
        if self.is_narrow_viewport() {
            self.inner.settings.narrow_anchor
        } else {
            self.inner.settings.anchor
        }
    }

    /// Appends a notification and schedules its expiry.
    ///
    /// Returns the new id immediately. A missing or zero duration falls back
    /// to the configured default.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn enqueue(
        &self,
        message: impl Into<String>,
        severity: Severity,
        options: NotificationOptions,
    ) -> NotificationId {
        let duration = options
            .duration
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| self.inner.settings.default_duration());
        let anchor = options.anchor.unwrap_or_else(|| self.default_anchor());
        let assertiveness = options
            .assertiveness
            .unwrap_or_else(|| severity.default_assertiveness());

        let mut state = self.lock();
        state.next_id += 1;
        let id = NotificationId::from_raw(state.next_id);
        let notification = Notification::new(
            id,
            message.into(),
            severity,
            duration,
            anchor,
            assertiveness,
            options.action,
        );
        let timer = self.spawn_expiry(id, duration);
        state.entries.push(Entry {
            notification,
            timer,
        });
        self.publish(&state);
        drop(state);

        debug!(%id, %severity, ?duration, "notification enqueued");
        id
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Success, NotificationOptions::default())
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Info, NotificationOptions::default())
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Warning, NotificationOptions::default())
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Error, NotificationOptions::default())
    }

    /// Removes a notification and cancels its timer.
    ///
    /// Idempotent: returns `false` when the id is unknown or already gone.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        match self.remove(id) {
            Some(entry) => {
                entry.timer.abort();
                debug!(%id, "notification dismissed");
                true
            }
            None => false,
        }
    }

    /// Dismisses the notification, then runs its action.
    ///
    /// Returns `false` if the id is unknown or carries no action; a toast
    /// without an action stays active. The entry is detached under a single
    /// lock, so only the caller that removed it runs the callback, and the
    /// callback runs without the lock held so it may call back into the center.
    pub fn invoke_action(&self, id: NotificationId) -> bool {
        let entry = {
            let mut state = self.lock();
            let Some(pos) = state
                .entries
                .iter()
                .position(|e| e.notification.id() == id && e.notification.action().is_some())
            else {
                return false;
            };
            let entry = state.entries.remove(pos);
            self.publish(&state);
            entry
        };
        entry.timer.abort();

        match entry.notification.action() {
            Some(action) => {
                debug!(%id, label = action.label(), "notification action invoked");
                action.invoke();
                true
            }
            None => false,
        }
    }

    /// Snapshot of the active notifications in insertion order.
    pub fn list(&self) -> Vec<Notification> {
        self.lock()
            .entries
            .iter()
            .map(|e| e.notification.clone())
            .collect()
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.notification.id() == id)
            .map(|e| e.notification.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Cancels every pending timer and empties the set.
    pub fn clear_all(&self) {
        let mut state = self.lock();
        let cleared = state.entries.len();
        for entry in state.entries.drain(..) {
            entry.timer.abort();
        }
        self.publish(&state);
        drop(state);

        debug!(cleared, "notifications cleared");
    }

    /// Receiver that observes a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.snapshots.subscribe()
    }

    fn expire(&self, id: NotificationId) {
        // The entry's own task is the caller, so the handle is dropped, not aborted.
        if self.remove(id).is_some() {
            debug!(%id, "notification expired");
        }
    }

    fn remove(&self, id: NotificationId) -> Option<Entry> {
        let mut state = self.lock();
        let pos = state
            .entries
            .iter()
            .position(|e| e.notification.id() == id)?;
        let entry = state.entries.remove(pos);
        self.publish(&state);
        Some(entry)
    }

    fn spawn_expiry(&self, id: NotificationId, duration: Duration) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                NotificationCenter { inner }.expire(id);
            }
        })
    }

    fn publish(&self, state: &State) {
        self.inner.snapshots.send_replace(
            state
                .entries
                .iter()
                .map(|e| e.notification.clone())
                .collect(),
        );
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

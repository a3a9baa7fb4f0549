//! Dialog stack ownership and settlement.
//!
//! Each entry moves `PENDING -> SETTLED` once. Settlement detaches the entry
//! from the stack under the lock and only then runs its callbacks and
//! resolves the waiting [`DialogResponse`]; whoever detaches the entry first
//! decides the outcome, every later attempt finds nothing.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use super::{
    BoxError, Callback, ConfirmCallback, DialogConfig, DialogError, DialogId, DialogKind,
    DialogResponse, DialogView,
};
use crate::config::DialogSettings;

enum Waiter {
    Alert(oneshot::Sender<()>),
    Confirm(oneshot::Sender<bool>),
    Detached,
}

impl Waiter {
    fn resolve(self, confirmed: bool) {
        // A dropped response only means the caller stopped waiting.
        match self {
            Waiter::Alert(tx) => {
                let _ = tx.send(());
            }
            Waiter::Confirm(tx) => {
                let _ = tx.send(confirmed);
            }
            Waiter::Detached => {}
        }
    }
}

struct Slot {
    view: DialogView,
    on_confirm: Option<ConfirmCallback>,
    on_cancel: Option<Callback>,
    on_close: Option<Callback>,
    waiter: Waiter,
}

impl Slot {
    fn close(self) {
        if let Some(on_close) = self.on_close {
            on_close();
        }
        self.waiter.resolve(false);
    }
}

#[derive(Default)]
struct State {
    next_id: u64,
    stack: Vec<Slot>,
}

impl State {
    fn find_mut(&mut self, id: DialogId) -> Option<&mut Slot> {
        self.stack.iter_mut().find(|slot| slot.view.id == id)
    }
}

struct Inner {
    state: Mutex<State>,
    settings: DialogSettings,
    narrow_viewport: AtomicBool,
    snapshots: watch::Sender<Vec<DialogView>>,
}

/// Owner of the dialog stack.
///
/// Cloning yields another handle to the same stack. The `show_*` methods are
/// called by application code; `confirm`, `cancel`, `close_dialog` and
/// `request_dismiss` are the events the rendering layer forwards.
#[derive(Clone)]
pub struct DialogOrchestrator {
    inner: Arc<Inner>,
}

impl Default for DialogOrchestrator {
    fn default() -> Self {
        Self::new(DialogSettings::default())
    }
}

impl std::fmt::Debug for DialogOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogOrchestrator")
            .field("active", &self.len())
            .finish_non_exhaustive()
    }
}

impl DialogOrchestrator {
    pub fn new(settings: DialogSettings) -> Self {
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

    /// Modals opened while the viewport is narrow default to full screen.
    pub fn set_narrow_viewport(&self, narrow: bool) {
        self.inner.narrow_viewport.store(narrow, Ordering::SeqCst);
    }

    pub fn is_narrow_viewport(&self) -> bool {
        self.inner.narrow_viewport.load(Ordering::SeqCst)
    }

    /// Shows an alert. The response resolves when it is confirmed or closed.
    pub fn show_alert(&self, config: DialogConfig) -> DialogResponse<()> {
        let (tx, rx) = oneshot::channel();
        let confirm_label = Some(self.inner.settings.alert_confirm_label.clone());
        let id = self.push(DialogKind::Alert, config, confirm_label, None, Waiter::Alert(tx));
        DialogResponse::new(id, rx)
    }

    /// Shows a confirmation. The response resolves `true` only when the
    /// confirm callback completes successfully; cancel, close, and a failing
    /// callback all resolve `false`.
    pub fn show_confirm(&self, config: DialogConfig) -> DialogResponse<bool> {
        let (tx, rx) = oneshot::channel();
        let settings = &self.inner.settings;
        let id = self.push(
            DialogKind::Confirm,
            config,
            Some(settings.confirm_label.clone()),
            Some(settings.cancel_label.clone()),
            Waiter::Confirm(tx),
        );
        DialogResponse::new(id, rx)
    }

    /// Opens a modal container and returns its id immediately.
    pub fn show_modal(&self, mut config: DialogConfig) -> DialogId {
        if config.full_screen.is_none() {
            config.full_screen = Some(self.is_narrow_viewport());
        }
        self.push(DialogKind::Modal, config, None, None, Waiter::Detached)
    }

    /// Opens a bottom sheet and returns its id immediately.
    pub fn show_bottom_sheet(&self, config: DialogConfig) -> DialogId {
        self.push(DialogKind::BottomSheet, config, None, None, Waiter::Detached)
    }

    /// Handles the confirm button of an alert or confirmation.
    ///
    /// Runs the confirm callback (the entry stays on the stack while it is
    /// pending), then settles the entry. Returns whether the callback
    /// succeeded. A callback failure is logged, never returned.
    ///
    /// # Errors
    ///
    /// - [`DialogError::NotFound`] if the entry is not active
    /// - [`DialogError::NotConfirmable`] for modals and bottom sheets
    /// - [`DialogError::ConfirmInProgress`] if a confirm is already running
    pub async fn confirm(&self, id: DialogId) -> Result<bool, DialogError> {
        let (kind, callback) = {
            let mut state = self.lock();
            let slot = state.find_mut(id).ok_or(DialogError::NotFound(id))?;
            let kind = slot.view.kind;
            if !kind.is_confirmable() {
                return Err(DialogError::NotConfirmable { id, kind });
            }
            if slot.view.confirming {
                return Err(DialogError::ConfirmInProgress(id));
            }
            slot.view.confirming = true;
            let callback = slot.on_confirm.take();
            self.publish(&state);
            (kind, callback)
        };

        let outcome = match callback {
            Some(callback) => run_confirm(callback).await,
            None => Ok(()),
        };

        let Some(slot) = self.detach(id) else {
            debug!(%id, "dialog settled while its confirm callback was running");
            return Ok(false);
        };

        let confirmed = match outcome {
            Ok(()) => true,
            Err(err) => {
                warn!(%id, %kind, error = %err, "dialog confirm callback failed");
                false
            }
        };
        debug!(%id, %kind, confirmed, "dialog confirmed");
        slot.waiter.resolve(confirmed);
        Ok(confirmed)
    }

    /// Handles the cancel button.
    ///
    /// For a confirmation this fires `on_cancel` and resolves `false`. Other
    /// kinds have no cancel path and are closed instead. Returns `false` if
    /// the entry was not active.
    pub fn cancel(&self, id: DialogId) -> bool {
        let Some(mut slot) = self.detach(id) else {
            return false;
        };

        if slot.view.kind == DialogKind::Confirm {
            debug!(%id, "dialog cancelled");
            if let Some(on_cancel) = slot.on_cancel.take() {
                on_cancel();
            }
            slot.waiter.resolve(false);
        } else {
            debug!(%id, kind = %slot.view.kind, "dialog without cancel path closed");
            slot.close();
        }
        true
    }

    /// Closes an entry: fires `on_close` and resolves any waiter negatively.
    ///
    /// Idempotent; returns `false` if the entry was not active.
    pub fn close_dialog(&self, id: DialogId) -> bool {
        match self.detach(id) {
            Some(slot) => {
                debug!(%id, kind = %slot.view.kind, "dialog closed");
                slot.close();
                true
            }
            None => false,
        }
    }

    /// Backdrop click or escape key. Ignored for persistent entries.
    pub fn request_dismiss(&self, id: DialogId) -> bool {
        let persistent = {
            let state = self.lock();
            match state.stack.iter().find(|slot| slot.view.id == id) {
                Some(slot) => slot.view.persistent,
                None => return false,
            }
        };

        if persistent {
            debug!(%id, "dismiss ignored for persistent dialog");
            return false;
        }
        self.close_dialog(id)
    }

    /// Closes every entry in stack order and empties the stack.
    ///
    /// Returns the number of entries closed.
    pub fn close_all_dialogs(&self) -> usize {
        let drained: Vec<Slot> = {
            let mut state = self.lock();
            let drained = state.stack.drain(..).collect();
            self.publish(&state);
            drained
        };

        let count = drained.len();
        for slot in drained {
            slot.close();
        }
        debug!(count, "all dialogs closed");
        count
    }

    /// Snapshot of the stack, oldest first.
    pub fn dialogs(&self) -> Vec<DialogView> {
        self.lock()
            .stack
            .iter()
            .map(|slot| slot.view.clone())
            .collect()
    }

    /// The most recently opened entry.
    pub fn top(&self) -> Option<DialogView> {
        self.lock().stack.last().map(|slot| slot.view.clone())
    }

    pub fn get(&self, id: DialogId) -> Option<DialogView> {
        self.lock()
            .stack
            .iter()
            .find(|slot| slot.view.id == id)
            .map(|slot| slot.view.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().stack.is_empty()
    }

    /// Receiver that observes a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<DialogView>> {
        self.inner.snapshots.subscribe()
    }

    fn push(
        &self,
        kind: DialogKind,
        config: DialogConfig,
        default_confirm: Option<String>,
        default_cancel: Option<String>,
        waiter: Waiter,
    ) -> DialogId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = DialogId::from_raw(state.next_id);

        let view = DialogView {
            id,
            kind,
            title: config.title,
            message: config.message,
            body: config.body,
            confirm_label: config.confirm_label.or(default_confirm),
            cancel_label: config.cancel_label.or(default_cancel),
            persistent: config.persistent,
            full_screen: config.full_screen.unwrap_or(false),
            confirming: false,
        };
        state.stack.push(Slot {
            view,
            on_confirm: config.on_confirm,
            on_cancel: config.on_cancel,
            on_close: config.on_close,
            waiter,
        });
        self.publish(&state);
        drop(state);

        debug!(%id, %kind, "dialog opened");
        id
    }

    fn detach(&self, id: DialogId) -> Option<Slot> {
        let mut state = self.lock();
        let pos = state.stack.iter().position(|slot| slot.view.id == id)?;
        let slot = state.stack.remove(pos);
        self.publish(&state);
        Some(slot)
    }

    fn publish(&self, state: &State) {
        self.inner
            .snapshots
            .send_replace(state.stack.iter().map(|slot| slot.view.clone()).collect());
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_confirm(callback: ConfirmCallback) -> Result<(), BoxError> {
    match AssertUnwindSafe(async move { callback().await })
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(_) => Err("confirm callback panicked".into()),
    }
}

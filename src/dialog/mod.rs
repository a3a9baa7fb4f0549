//! Modal interactions that resolve asynchronously.
//!
//! The [`DialogOrchestrator`] keeps an ordered stack of active dialogs.
//! Alerts and confirmations hand back a [`DialogResponse`] that settles
//! exactly once; modals and bottom sheets are fire-and-forget containers
//! observed through their `on_close` callback.

mod orchestrator;

pub use orchestrator::DialogOrchestrator;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::oneshot;

/// Error type returned by confirm callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type ConfirmCallback = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;
pub(crate) type Callback = Box<dyn FnOnce() + Send>;

/// Identifier of a dialog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DialogId(u64);

impl DialogId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dialog-{}", self.0)
    }
}

/// The interaction primitive that created a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogKind {
    Alert,
    Confirm,
    Modal,
    BottomSheet,
}

impl DialogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogKind::Alert => "alert",
            DialogKind::Confirm => "confirm",
            DialogKind::Modal => "modal",
            DialogKind::BottomSheet => "bottomSheet",
        }
    }

    /// Whether the kind has a confirm button handled by the orchestrator.
    pub fn is_confirmable(&self) -> bool {
        matches!(self, DialogKind::Alert | DialogKind::Confirm)
    }
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported to the rendering layer when it drives a dialog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    #[error("dialog {0} is not active")]
    NotFound(DialogId),

    #[error("dialog {0} is already confirming")]
    ConfirmInProgress(DialogId),

    #[error("dialog {id} of kind {kind} has no confirm action")]
    NotConfirmable { id: DialogId, kind: DialogKind },
}

/// Caller-supplied description of a dialog.
///
/// Content fields are opaque to the orchestrator and passed through to the
/// rendering layer. Unset labels fall back to per-kind defaults.
#[derive(Default)]
pub struct DialogConfig {
    pub title: Option<String>,
    pub message: Option<String>,
    pub body: Option<String>,
    pub confirm_label: Option<String>,
    pub cancel_label: Option<String>,
    /// Suppresses dismissal through backdrop click or escape.
    pub persistent: bool,
    pub full_screen: Option<bool>,
    pub(crate) on_confirm: Option<ConfirmCallback>,
    pub(crate) on_cancel: Option<Callback>,
    pub(crate) on_close: Option<Callback>,
}

impl fmt::Debug for DialogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogConfig")
            .field("title", &self.title)
            .field("message", &self.message)
            .field("persistent", &self.persistent)
            .field("full_screen", &self.full_screen)
            .field("on_confirm", &self.on_confirm.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}

impl DialogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn confirm_label(mut self, label: impl Into<String>) -> Self {
        self.confirm_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn cancel_label(mut self, label: impl Into<String>) -> Self {
        self.cancel_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    #[must_use]
    pub fn full_screen(mut self, full_screen: bool) -> Self {
        self.full_screen = Some(full_screen);
        self
    }

    /// Async action run when the user confirms. A returned error (or a
    /// panic) makes a confirmation resolve `false`.
    #[must_use]
    pub fn on_confirm<F, Fut, Er>(mut self, callback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), Er>> + Send + 'static,
        Er: Into<BoxError>,
    {
        self.on_confirm = Some(Box::new(move || {
            async move { callback().await.map_err(Into::<BoxError>::into) }.boxed()
        }));
        self
    }

    #[must_use]
    pub fn on_cancel(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_close(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }
}

/// Read-only projection of a dialog entry for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogView {
    pub id: DialogId,
    pub kind: DialogKind,
    pub title: Option<String>,
    pub message: Option<String>,
    pub body: Option<String>,
    pub confirm_label: Option<String>,
    pub cancel_label: Option<String>,
    pub persistent: bool,
    pub full_screen: bool,
    /// An async confirm callback is running; the confirm button should be
    /// disabled.
    pub confirming: bool,
}

/// Pending outcome of an alert or confirmation.
///
/// Resolves once the dialog settles. If the orchestrator is dropped first,
/// it resolves to the negative outcome (`()` / `false`), so awaiting it never
/// hangs.
#[derive(Debug)]
#[must_use = "a dialog response does nothing unless awaited"]
pub struct DialogResponse<T> {
    id: DialogId,
    rx: oneshot::Receiver<T>,
}

impl<T> DialogResponse<T> {
    pub(crate) fn new(id: DialogId, rx: oneshot::Receiver<T>) -> Self {
        Self { id, rx }
    }

    /// Identifier of the dialog this response belongs to.
    pub fn id(&self) -> DialogId {
        self.id
    }
}

impl<T: Default> Future for DialogResponse<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(DialogKind::BottomSheet.to_string(), "bottomSheet");
        assert!(DialogKind::Alert.is_confirmable());
        assert!(DialogKind::Confirm.is_confirmable());
        assert!(!DialogKind::Modal.is_confirmable());
        assert!(!DialogKind::BottomSheet.is_confirmable());
    }

    #[test]
    fn test_config_builder() {
        let config = DialogConfig::new()
            .title("Excluir médico")
            .message("Deseja excluir?")
            .confirm_label("Excluir")
            .persistent(true)
            .on_cancel(|| {});

        assert_eq!(config.title.as_deref(), Some("Excluir médico"));
        assert_eq!(config.confirm_label.as_deref(), Some("Excluir"));
        assert!(config.persistent);
        assert!(config.on_cancel.is_some());
        assert!(config.on_confirm.is_none());
        assert!(format!("{:?}", config).contains("on_cancel: true"));
    }

    #[test]
    fn test_error_messages() {
        let id = DialogId::from_raw(3);
        assert_eq!(
            DialogError::NotFound(id).to_string(),
            "dialog dialog-3 is not active"
        );
        assert_eq!(
            DialogError::NotConfirmable {
                id,
                kind: DialogKind::Modal
            }
            .to_string(),
            "dialog dialog-3 of kind modal has no confirm action"
        );
    }

    #[tokio::test]
    async fn test_response_resolves_default_when_sender_dropped() {
        let (tx, rx) = oneshot::channel::<bool>();
        let response = DialogResponse::new(DialogId::from_raw(1), rx);
        drop(tx);
        assert!(!response.await);
    }

    #[tokio::test]
    async fn test_on_confirm_error_is_boxed() {
        let config = DialogConfig::new().on_confirm(|| async { Err::<(), _>("falhou") });
        let callback = config.on_confirm.unwrap();
        let err = callback().await.unwrap_err();
        assert_eq!(err.to_string(), "falhou");
    }
}

//! Transient toast notifications.
//!
//! A [`Notification`] is a short-lived message with a severity, a screen
//! anchor and an accessibility announcement level. The [`NotificationCenter`]
//! owns the active set, schedules one expiry timer per entry and publishes
//! snapshots for the rendering layer.

mod center;

pub use center::NotificationCenter;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a notification, unique within one center and ordered by
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationId(u64);

impl NotificationId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw sequence number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Announcement level used when the caller does not pick one.
    pub fn default_assertiveness(&self) -> Assertiveness {
        match self {
            Severity::Error => Assertiveness::Assertive,
            Severity::Success | Severity::Warning | Severity::Info => Assertiveness::Polite,
        }
    }

    /// Lowercase name, as used in configuration and rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently assistive technology should announce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assertiveness {
    Polite,
    Assertive,
}

/// Vertical screen edge a toast is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Top,
    Bottom,
}

/// Horizontal placement of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizontal {
    Left,
    Center,
    Right,
}

/// Screen anchor of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub vertical: Vertical,
    pub horizontal: Horizontal,
}

impl Anchor {
    pub const TOP_RIGHT: Anchor = Anchor::new(Vertical::Top, Horizontal::Right);
    pub const TOP_CENTER: Anchor = Anchor::new(Vertical::Top, Horizontal::Center);

    pub const fn new(vertical: Vertical, horizontal: Horizontal) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::TOP_RIGHT
    }
}

/// A labelled zero-argument callback attached to a toast (e.g. "Tentar novamente").
#[derive(Clone)]
pub struct NotificationAction {
    label: String,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl NotificationAction {
    /// Creates an action with the given label and callback.
    pub fn new(label: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }

    /// Creates an action from an already shared callback.
    pub fn from_shared(label: impl Into<String>, callback: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            label: label.into(),
            callback,
        }
    }

    /// Returns the button label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the callback.
    pub fn invoke(&self) {
        (self.callback)();
    }
}

impl fmt::Debug for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Per-call overrides for [`NotificationCenter::enqueue`].
///
/// Every field falls back to the center's defaults when left unset.
#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    pub duration: Option<Duration>,
    pub anchor: Option<Anchor>,
    pub assertiveness: Option<Assertiveness>,
    pub action: Option<NotificationAction>,
}

impl NotificationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    #[must_use]
    pub fn with_assertiveness(mut self, assertiveness: Assertiveness) -> Self {
        self.assertiveness = Some(assertiveness);
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// One active toast.
#[derive(Debug, Clone)]
pub struct Notification {
    id: NotificationId,
    message: String,
    severity: Severity,
    created_at: DateTime<Utc>,
    duration: Duration,
    anchor: Anchor,
    assertiveness: Assertiveness,
    action: Option<NotificationAction>,
}

impl Notification {
    pub(crate) fn new(
        id: NotificationId,
        message: String,
        severity: Severity,
        duration: Duration,
        anchor: Anchor,
        assertiveness: Assertiveness,
        action: Option<NotificationAction>,
    ) -> Self {
        Self {
            id,
            message,
            severity,
            created_at: Utc::now(),
            duration,
            anchor,
            assertiveness,
            action,
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn assertiveness(&self) -> Assertiveness {
        self.assertiveness
    }

    pub fn action(&self) -> Option<&NotificationAction> {
        self.action.as_ref()
    }

    /// Wall-clock age of the notification.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at).to_std().unwrap_or_default()
    }

    /// Whether the display duration has elapsed by the wall clock.
    ///
    /// Removal is driven by the center's timer, not by this check.
    pub fn is_expired(&self) -> bool {
        self.age() >= self.duration
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

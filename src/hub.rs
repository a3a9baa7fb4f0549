//! Composition root for the feedback layer.
//!
//! A [`FeedbackHub`] is built once from a [`FeedbackConfig`] and handed to the
//! parts of the application that need to show feedback. Handles are cheap to
//! clone and all share the same collections.

use std::fmt;
use std::future::Future;

use crate::config::FeedbackConfig;
use crate::dialog::DialogOrchestrator;
use crate::error::NotificationErrorMapper;
use crate::notification::NotificationCenter;
use crate::retry::RetryController;

/// One notification center, one dialog stack and one error mapper.
#[derive(Clone)]
pub struct FeedbackHub {
    config: FeedbackConfig,
    notifications: NotificationCenter,
    dialogs: DialogOrchestrator,
    errors: NotificationErrorMapper,
}

impl Default for FeedbackHub {
    fn default() -> Self {
        Self::new(FeedbackConfig::default())
    }
}

impl fmt::Debug for FeedbackHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackHub")
            .field("notifications", &self.notifications)
            .field("dialogs", &self.dialogs)
            .finish_non_exhaustive()
    }
}

impl FeedbackHub {
    pub fn new(config: FeedbackConfig) -> Self {
        let notifications = NotificationCenter::new(config.notifications.clone());
        let dialogs = DialogOrchestrator::new(config.dialogs.clone());
        let errors = NotificationErrorMapper::new(notifications.clone(), config.errors.clone());
        Self {
            config,
            notifications,
            dialogs,
            errors,
        }
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn dialogs(&self) -> &DialogOrchestrator {
        &self.dialogs
    }

    pub fn errors(&self) -> &NotificationErrorMapper {
        &self.errors
    }

    /// Propagates the viewport breakpoint to toasts and modals.
    pub fn set_narrow_viewport(&self, narrow: bool) {
        self.notifications.set_narrow_viewport(narrow);
        self.dialogs.set_narrow_viewport(narrow);
    }

    /// Wraps `operation` in a controller using the configured retry defaults.
    pub fn retry_controller<T, E, F, Fut>(&self, operation: F) -> RetryController<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + fmt::Display + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        RetryController::new(operation, self.config.retry_config())
    }

    /// Drops every toast and closes every dialog, e.g. on logout.
    pub fn reset(&self) {
        self.notifications.clear_all();
        self.dialogs.close_all_dialogs();
    }
}

//! Turns API failures into error toasts.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{ApiFailure, Entity, ErrorDetector, MEDICO_LINKED_MESSAGE};
use crate::config::ErrorSettings;
use crate::notification::{
    Assertiveness, NotificationAction, NotificationCenter, NotificationId, NotificationOptions,
    Severity,
};

/// Retry entry point attached to an error toast.
pub type RetryFn = Arc<dyn Fn() + Send + Sync>;

/// Optional context for [`NotificationErrorMapper::handle_api_error`].
#[derive(Clone, Default)]
pub struct ErrorContext {
    pub entity: Option<Entity>,
    pub retry: Option<RetryFn>,
}

impl fmt::Debug for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorContext")
            .field("entity", &self.entity)
            .field("retry", &self.retry.is_some())
            .finish()
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Attaches a retry callback, rendered as a "Tentar novamente" action.
    #[must_use]
    pub fn retry(mut self, retry: impl Fn() + Send + Sync + 'static) -> Self {
        self.retry = Some(Arc::new(retry));
        self
    }

    #[must_use]
    pub fn retry_shared(mut self, retry: RetryFn) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Publishes one assertive error toast per failure.
#[derive(Clone)]
pub struct NotificationErrorMapper {
    center: NotificationCenter,
    settings: ErrorSettings,
    detector: Arc<ErrorDetector>,
}

impl fmt::Debug for NotificationErrorMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationErrorMapper")
            .field("settings", &self.settings)
            .field("patterns", &self.detector.pattern_count())
            .finish_non_exhaustive()
    }
}

impl NotificationErrorMapper {
    pub fn new(center: NotificationCenter, settings: ErrorSettings) -> Self {
        Self::with_detector(center, settings, ErrorDetector::new())
    }

    pub fn with_detector(
        center: NotificationCenter,
        settings: ErrorSettings,
        detector: ErrorDetector,
    ) -> Self {
        Self {
            center,
            settings,
            detector: Arc::new(detector),
        }
    }

    pub fn settings(&self) -> &ErrorSettings {
        &self.settings
    }

    pub fn detector(&self) -> &ErrorDetector {
        &self.detector
    }

    /// Classifies `failure` and enqueues the matching error toast.
    ///
    /// The toast is always `error` severity and assertive. When the context
    /// carries a retry callback, the toast gets an action bound to it.
    pub fn handle_api_error(&self, failure: &ApiFailure, context: ErrorContext) -> NotificationId {
        let category = self.detector.classify(failure);
        let message = category.user_message(context.entity);
        debug!(
            %category,
            status = ?failure.status,
            entity = ?context.entity,
            retry = context.retry.is_some(),
            "mapping api failure to toast"
        );

        let mut options = self.error_options();
        if let Some(retry) = context.retry {
            options = options.with_action(NotificationAction::from_shared(
                self.settings.retry_label.clone(),
                retry,
            ));
        }
        self.center.enqueue(message, Severity::Error, options)
    }

    /// Toast for a doctor delete blocked by linked patients or exams.
    pub fn medico_delete_blocked(&self) -> NotificationId {
        self.center
            .enqueue(MEDICO_LINKED_MESSAGE, Severity::Error, self.error_options())
    }

    fn error_options(&self) -> NotificationOptions {
        NotificationOptions::new()
            .with_duration(self.settings.duration())
            .with_assertiveness(Assertiveness::Assertive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationSettings;
    use crate::error::{CONNECTION_MESSAGE, LINKED_RECORDS_MESSAGE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn mapper() -> (NotificationCenter, NotificationErrorMapper) {
        let center = NotificationCenter::new(NotificationSettings::default());
        let mapper = NotificationErrorMapper::new(center.clone(), ErrorSettings::default());
        (center, mapper)
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflict_for_medico() {
        let (center, mapper) = mapper();
        let id = mapper.handle_api_error(
            &ApiFailure::with_status(409),
            ErrorContext::new().entity(Entity::Medico),
        );

        let toast = center.get(id).unwrap();
        assert!(toast
            .message()
            .starts_with("Não é possível excluir este médico pois existem registros vinculados"));
        assert_eq!(toast.severity(), Severity::Error);
        assert_eq!(toast.assertiveness(), Assertiveness::Assertive);
        assert_eq!(toast.duration(), Duration::from_millis(7000));
        assert!(toast.action().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_without_context() {
        let (center, mapper) = mapper();
        let id = mapper.handle_api_error(&ApiFailure::with_status(404), ErrorContext::default());
        assert_eq!(
            center.get(id).unwrap().message(),
            "O registro não foi encontrado."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure() {
        let (center, mapper) = mapper();
        let refused = mapper.handle_api_error(
            &ApiFailure::network("connect ECONNREFUSED"),
            ErrorContext::default(),
        );
        let zero = mapper.handle_api_error(&ApiFailure::with_status(0), ErrorContext::default());

        assert_eq!(center.get(refused).unwrap().message(), CONNECTION_MESSAGE);
        assert_eq!(center.get(zero).unwrap().message(), CONNECTION_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_action_is_attached_and_invoked() {
        let (center, mapper) = mapper();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let id = mapper.handle_api_error(
            &ApiFailure::with_status(500),
            ErrorContext::new().retry(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let toast = center.get(id).unwrap();
        assert_eq!(toast.action().unwrap().label(), "Tentar novamente");
        assert!(center.invoke_action(id));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(center.get(id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_toast_expires_after_configured_duration() {
        let (center, mapper) = mapper();
        mapper.handle_api_error(&ApiFailure::with_status(500), ErrorContext::default());

        tokio::time::sleep(Duration::from_millis(6999)).await;
        assert_eq!(center.len(), 1);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(center.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_label() {
        let center = NotificationCenter::default();
        let settings = ErrorSettings {
            retry_label: "Repetir".to_string(),
            ..ErrorSettings::default()
        };
        let mapper = NotificationErrorMapper::new(center.clone(), settings);

        let id = mapper.handle_api_error(
            &ApiFailure::with_status(409),
            ErrorContext::new().entity(Entity::Exame).retry(|| {}),
        );
        let toast = center.get(id).unwrap();
        assert_eq!(toast.message(), LINKED_RECORDS_MESSAGE);
        assert_eq!(toast.action().unwrap().label(), "Repetir");
    }

    #[tokio::test(start_paused = true)]
    async fn test_medico_delete_blocked() {
        let (center, mapper) = mapper();
        let id = mapper.medico_delete_blocked();
        let toast = center.get(id).unwrap();
        assert_eq!(toast.message(), MEDICO_LINKED_MESSAGE);
        assert_eq!(toast.assertiveness(), Assertiveness::Assertive);
    }
}

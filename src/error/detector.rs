//! Rule-based classifier for API failures.
//!
//! Each [`ErrorPattern`] matches a failure by HTTP status, by a regex over the
//! failure message, or both. Patterns are checked in priority order and the
//! first match wins; failures no pattern claims fall through to the backend
//! message, then to [`ErrorCategory::Unexpected`].

use std::sync::OnceLock;

use regex::Regex;

use super::{ApiFailure, Entity, ErrorCategory};

/// A rule mapping a status code and/or message pattern to a category.
#[derive(Debug)]
pub struct ErrorPattern {
    statuses: Vec<u16>,
    regex: Option<Regex>,
    category: ErrorCategory,
    description: String,
}

impl ErrorPattern {
    /// Creates a new error pattern.
    ///
    /// # Arguments
    /// * `statuses` - HTTP statuses that select this pattern
    /// * `pattern` - Optional regex over the failure message
    /// * `category` - The category to assign on match
    /// * `description` - What this pattern detects
    ///
    /// # Panics
    /// Panics if the regex pattern is invalid.
    pub fn new(
        statuses: &[u16],
        pattern: Option<&str>,
        category: ErrorCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            statuses: statuses.to_vec(),
            regex: pattern.map(|p| Regex::new(p).expect("Invalid regex pattern")),
            category,
            description: description.into(),
        }
    }

    /// Creates a new error pattern with a pre-compiled regex.
    pub fn with_regex(
        statuses: &[u16],
        regex: Option<Regex>,
        category: ErrorCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            statuses: statuses.to_vec(),
            regex,
            category,
            description: description.into(),
        }
    }

    pub fn category(&self) -> &ErrorCategory {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Checks if this pattern matches the given failure.
    pub fn matches(&self, failure: &ApiFailure) -> bool {
        let by_status = failure
            .status
            .is_some_and(|status| self.statuses.contains(&status));
        let by_message = self
            .regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(failure.text()));
        by_status || by_message
    }
}

/// Classifies API failures using pattern matching.
#[derive(Debug)]
pub struct ErrorDetector {
    /// The list of patterns to match against, in priority order.
    patterns: Vec<ErrorPattern>,
}

impl Default for ErrorDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorDetector {
    /// Creates a detector with the built-in patterns.
    pub fn new() -> Self {
        Self {
            patterns: Self::default_patterns(),
        }
    }

    /// Creates a detector with custom patterns.
    pub fn with_patterns(patterns: Vec<ErrorPattern>) -> Self {
        Self { patterns }
    }

    /// Shared detector with the built-in patterns.
    pub fn shared() -> &'static ErrorDetector {
        static DETECTOR: OnceLock<ErrorDetector> = OnceLock::new();
        DETECTOR.get_or_init(ErrorDetector::new)
    }

    fn default_patterns() -> Vec<ErrorPattern> {
        vec![
            ErrorPattern::new(
                &[0],
                Some(r"(?i)Network Error|ECONN|timeout|conex"),
                ErrorCategory::Connection,
                "Network failure or timeout",
            ),
            ErrorPattern::new(
                &[403],
                Some(r"(?i)permiss"),
                ErrorCategory::PermissionDenied,
                "HTTP 403 or permission message",
            ),
            ErrorPattern::new(&[404], None, ErrorCategory::NotFound, "HTTP 404"),
            ErrorPattern::new(
                &[409],
                Some(r"(?i)vinculad|associad|relacionament"),
                ErrorCategory::Conflict,
                "HTTP 409 or linked-records message",
            ),
        ]
    }

    /// Adds a pattern after the existing ones.
    pub fn add_pattern(&mut self, pattern: ErrorPattern) {
        self.patterns.push(pattern);
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    /// Classifies a failure into exactly one category.
    pub fn classify(&self, failure: &ApiFailure) -> ErrorCategory {
        if let Some(pattern) = self.patterns.iter().find(|p| p.matches(failure)) {
            return pattern.category.clone();
        }
        match &failure.message {
            Some(message) => ErrorCategory::Backend(message.clone()),
            None => ErrorCategory::Unexpected,
        }
    }

    /// Classifies a failure and renders the user-facing message.
    pub fn message_for(&self, failure: &ApiFailure, entity: Option<Entity>) -> String {
        self.classify(failure).user_message(entity)
    }
}

/// Classifies a failure with the built-in patterns.
pub fn classify(failure: &ApiFailure) -> ErrorCategory {
    ErrorDetector::shared().classify(failure)
}

/// User-facing message for a failure, using the built-in patterns.
pub fn message_for(failure: &ApiFailure, entity: Option<Entity>) -> String {
    ErrorDetector::shared().message_for(failure, entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        CONNECTION_MESSAGE, LINKED_RECORDS_MESSAGE, MEDICO_LINKED_MESSAGE, PERMISSION_MESSAGE,
        UNEXPECTED_MESSAGE,
    };

    // ==================== ErrorPattern Tests ====================

    #[test]
    fn test_pattern_matches_status_or_message() {
        let pattern = ErrorPattern::new(
            &[418],
            Some(r"(?i)teapot"),
            ErrorCategory::Unexpected,
            "Teapot",
        );

        assert_eq!(pattern.description(), "Teapot");
        assert!(pattern.matches(&ApiFailure::with_status(418)));
        assert!(pattern.matches(&ApiFailure::network("I'm a TEAPOT")));
        assert!(!pattern.matches(&ApiFailure::with_status(500).message("server")));
    }

    #[test]
    fn test_status_only_pattern_ignores_message() {
        let pattern = ErrorPattern::new(&[404], None, ErrorCategory::NotFound, "404");
        assert!(!pattern.matches(&ApiFailure::network("404")));
    }

    #[test]
    fn test_pattern_with_regex() {
        let regex = Regex::new(r"(?i)duplicad").unwrap();
        let pattern = ErrorPattern::with_regex(&[], Some(regex), ErrorCategory::Conflict, "dup");
        assert!(pattern.matches(&ApiFailure::network("CPF duplicado")));
        assert_eq!(pattern.category(), &ErrorCategory::Conflict);
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_status_zero_is_connection() {
        assert_eq!(classify(&ApiFailure::with_status(0)), ErrorCategory::Connection);
    }

    #[test]
    fn test_connection_messages() {
        for text in [
            "Network Error",
            "connect ECONNREFUSED 127.0.0.1:5000",
            "timeout of 10000ms exceeded",
            "Erro de conexão",
        ] {
            assert_eq!(
                classify(&ApiFailure::network(text)),
                ErrorCategory::Connection,
                "{text}"
            );
        }
    }

    #[test]
    fn test_connection_takes_precedence_over_status() {
        let failure = ApiFailure::with_status(404).message("gateway timeout");
        assert_eq!(classify(&failure), ErrorCategory::Connection);
    }

    #[test]
    fn test_permission() {
        assert_eq!(
            message_for(&ApiFailure::with_status(403), None),
            PERMISSION_MESSAGE
        );
        assert_eq!(
            classify(&ApiFailure::with_status(400).message("Sem permissão")),
            ErrorCategory::PermissionDenied
        );
    }

    #[test]
    fn test_not_found_with_and_without_entity() {
        let failure = ApiFailure::with_status(404);
        assert_eq!(message_for(&failure, None), "O registro não foi encontrado.");
        assert_eq!(
            message_for(&failure, Some(Entity::Paciente)),
            "O paciente não foi encontrado."
        );
    }

    #[test]
    fn test_conflict() {
        let failure = ApiFailure::with_status(409);
        assert_eq!(message_for(&failure, Some(Entity::Medico)), MEDICO_LINKED_MESSAGE);
        assert_eq!(message_for(&failure, Some(Entity::Exame)), LINKED_RECORDS_MESSAGE);
        assert_eq!(
            classify(&ApiFailure::with_status(400).message("Paciente associado a exames")),
            ErrorCategory::Conflict
        );
    }

    #[test]
    fn test_backend_message_passthrough() {
        let failure = ApiFailure::with_status(422).message("CPF inválido");
        assert_eq!(classify(&failure), ErrorCategory::Backend("CPF inválido".into()));
        assert_eq!(message_for(&failure, Some(Entity::Paciente)), "CPF inválido");
    }

    #[test]
    fn test_fallback_unexpected() {
        assert_eq!(message_for(&ApiFailure::with_status(500), None), UNEXPECTED_MESSAGE);
        assert_eq!(classify(&ApiFailure::default()), ErrorCategory::Unexpected);
    }

    #[test]
    fn test_custom_pattern_appended() {
        let mut detector = ErrorDetector::new();
        let builtin = detector.pattern_count();
        detector.add_pattern(ErrorPattern::new(
            &[503],
            None,
            ErrorCategory::Connection,
            "Service unavailable",
        ));

        assert_eq!(detector.pattern_count(), builtin + 1);
        assert_eq!(
            detector.message_for(&ApiFailure::with_status(503), None),
            CONNECTION_MESSAGE
        );
        assert_eq!(
            ErrorDetector::default().classify(&ApiFailure::with_status(503)),
            ErrorCategory::Unexpected
        );
    }
}

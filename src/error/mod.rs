//! API failure classification and error toasts.
//!
//! Failures from the data-access layer are classified into one
//! [`ErrorCategory`] by an [`ErrorDetector`], rendered into a Portuguese
//! message, and published by the [`NotificationErrorMapper`] as an assertive
//! error toast with an optional retry action.

pub mod classification;
pub mod detector;
pub mod mapper;

pub use classification::{
    ApiFailure, Entity, ErrorCategory, UnknownEntity, CONNECTION_MESSAGE, LINKED_RECORDS_MESSAGE,
    MEDICO_LINKED_MESSAGE, PERMISSION_MESSAGE, UNEXPECTED_MESSAGE,
};
pub use detector::{classify, message_for, ErrorDetector, ErrorPattern};
pub use mapper::{ErrorContext, NotificationErrorMapper, RetryFn};

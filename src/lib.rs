//! medfeedback - asynchronous UI feedback orchestration
//!
//! Toasts with per-entry expiry, a stack of dialogs whose outcomes can be
//! awaited, retries with exponential backoff, and a mapper that turns API
//! failures into user-facing error toasts. [`FeedbackHub`] wires them
//! together from a [`FeedbackConfig`].

pub mod config;
pub mod dialog;
pub mod error;
pub mod hub;
pub mod logging;
pub mod notification;
pub mod retry;
pub mod ui;

pub use config::FeedbackConfig;
pub use hub::FeedbackHub;

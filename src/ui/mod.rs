//! Terminal rendering for the feedback layer.
//!
//! Provides 24-bit color panels for toasts, dialogs and retry progress.

mod colors;
mod renderer;

pub use colors::Theme;
pub use renderer::FeedbackRenderer;

//! 24-bit RGB color theme for terminal output.

use owo_colors::Rgb;

use crate::notification::Severity;

/// Palette used by the terminal renderer.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Success toasts - green (34, 197, 94)
    pub success: Rgb,
    /// Error toasts - red (239, 68, 68)
    pub error: Rgb,
    /// Warning toasts - yellow (234, 179, 8)
    pub warning: Rgb,
    /// Info toasts and in-flight work - blue (59, 130, 246)
    pub info: Rgb,
    /// Secondary text - gray (107, 114, 128)
    pub muted: Rgb,
    /// Dialog frames and ids - cyan (34, 211, 238)
    pub accent: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Rgb(34, 197, 94),
            error: Rgb(239, 68, 68),
            warning: Rgb(234, 179, 8),
            info: Rgb(59, 130, 246),
            muted: Rgb(107, 114, 128),
            accent: Rgb(34, 211, 238),
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn severity(&self, severity: Severity) -> Rgb {
        match severity {
            Severity::Success => self.success,
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}

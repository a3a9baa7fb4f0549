//! Text rendering of feedback snapshots.
//!
//! Projects the read-only snapshots published by the notification center,
//! the dialog orchestrator and retry controllers into themed terminal panels.

use std::fmt;

use owo_colors::{OwoColorize, Rgb};

use crate::dialog::{DialogKind, DialogView};
use crate::notification::{Assertiveness, Horizontal, Notification, Vertical};
use crate::retry::{RetryConfig, RetryState};
use crate::ui::Theme;

/// Renders toasts, dialogs and retry progress as text panels.
#[derive(Debug, Clone)]
pub struct FeedbackRenderer {
    theme: Theme,
    /// Panel width (characters)
    width: usize,
    /// Whether colors are enabled (respects NO_COLOR env var)
    colors_enabled: bool,
}

impl Default for FeedbackRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackRenderer {
    pub fn new() -> Self {
        Self {
            theme: Theme::default(),
            width: 60,
            colors_enabled: std::env::var("NO_COLOR").is_err(),
        }
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Sets the panel width. Widths below 12 are raised to 12.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(12);
        self
    }

    #[must_use]
    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colors_enabled = enabled;
        self
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// One line per toast, in list order.
    pub fn render_notifications(&self, notifications: &[Notification]) -> String {
        if notifications.is_empty() {
            return self.paint("(no notifications)", self.theme.muted);
        }
        notifications
            .iter()
            .map(|n| self.render_notification(n))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A single toast line: severity marker, message, placement and action.
    ///
    /// The message is never shortened; toasts carry the whole user-facing text.
    pub fn render_notification(&self, notification: &Notification) -> String {
        let color = self.theme.severity(notification.severity());
        let marker = match notification.assertiveness() {
            Assertiveness::Assertive => "!",
            Assertiveness::Polite => "●",
        };

        let mut line = format!(
            "{} {} {}",
            self.paint(marker, color),
            self.paint_bold(&format!("{:<7}", notification.severity().as_str()), color),
            notification.message(),
        );

        let meta = format!(
            "{} · {}ms · {}",
            notification.id(),
            notification.duration().as_millis(),
            anchor_name(notification)
        );
        line.push_str(&format!("  {}", self.paint(&meta, self.theme.muted)));

        if let Some(action) = notification.action() {
            line.push_str(&format!(
                "  {}",
                self.paint_bold(&format!("[{}]", action.label()), self.theme.accent)
            ));
        }
        line
    }

    /// Panels for every dialog, oldest first.
    pub fn render_dialogs(&self, dialogs: &[DialogView]) -> String {
        if dialogs.is_empty() {
            return self.paint("(no dialogs)", self.theme.muted);
        }
        dialogs
            .iter()
            .map(|d| self.render_dialog(d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A framed panel for one dialog entry.
    pub fn render_dialog(&self, dialog: &DialogView) -> String {
        let frame = match dialog.kind {
            DialogKind::Alert | DialogKind::Confirm => self.theme.accent,
            DialogKind::Modal | DialogKind::BottomSheet => self.theme.info,
        };
        let inner_width = self.width - 2;
        let mut output = String::new();

        output.push_str(&format!("{}\n", self.border(inner_width, frame)));

        let title = dialog.title.as_deref().unwrap_or_else(|| dialog.kind.as_str());
        output.push_str(&format!(
            " {} {}\n",
            self.paint_bold(&safe_truncate(title, inner_width - 2), frame),
            self.paint(&dialog_tags(dialog), self.theme.muted)
        ));

        output.push_str(&format!("{}\n", self.border(inner_width, frame)));

        for text in [dialog.message.as_deref(), dialog.body.as_deref()]
            .into_iter()
            .flatten()
        {
            output.push_str(&format!(" {}\n", safe_truncate(text, inner_width - 2)));
        }

        let buttons = self.buttons(dialog);
        if !buttons.is_empty() {
            output.push('\n');
            output.push_str(&format!(" {buttons}\n"));
        }

        output.push_str(&self.border(inner_width, frame));
        output
    }

    /// A panel describing a retry run: attempt progress and outcome.
    pub fn render_retry<T, E: fmt::Display>(
        &self,
        state: &RetryState<T, E>,
        config: &RetryConfig,
    ) -> String {
        let inner_width = self.width - 2;
        let total = config.total_attempts();
        let attempt = (state.retry_count + 1).min(total);
        let color = if state.error.is_some() {
            self.theme.error
        } else if state.data.is_some() && !state.loading {
            self.theme.success
        } else {
            self.theme.info
        };

        let mut output = String::new();
        output.push_str(&format!("{}\n", self.border(inner_width, color)));
        output.push_str(&format!(
            " {}\n",
            self.paint_bold(&format!("Attempt {}/{}", attempt, total), color)
        ));
        output.push_str(&format!("{}\n", self.border(inner_width, color)));

        let filled = attempt as usize;
        let empty = total.saturating_sub(attempt) as usize;
        let progress = format!("{}{}", "●".repeat(filled), "○".repeat(empty));
        output.push_str(&format!(" {}\n", self.paint(&progress, color)));

        let status = if state.loading {
            let next = config.delay_for(state.retry_count.saturating_sub(1));
            if state.retry_count > 0 {
                format!("Retrying (backoff {}ms)...", next.as_millis())
            } else {
                "Running...".to_string()
            }
        } else if let Some(err) = &state.error {
            format!("Failed: {}", safe_truncate(&err.to_string(), inner_width - 10))
        } else if state.data.is_some() {
            "Succeeded".to_string()
        } else {
            "Idle".to_string()
        };
        output.push_str(&format!(" {}\n", status));

        output.push_str(&self.border(inner_width, color));
        output
    }

    fn buttons(&self, dialog: &DialogView) -> String {
        let mut buttons = Vec::new();
        if let Some(label) = &dialog.confirm_label {
            let text = format!("[ {} ]", label);
            if dialog.confirming {
                buttons.push(self.paint(&text, self.theme.muted));
            } else {
                buttons.push(self.paint_bold(&text, self.theme.success));
            }
        }
        if let Some(label) = &dialog.cancel_label {
            buttons.push(self.paint(&format!("[ {} ]", label), self.theme.muted));
        }
        buttons.join("  ")
    }

    fn border(&self, width: usize, color: Rgb) -> String {
        self.paint(&"─".repeat(width), color)
    }

    fn paint(&self, text: &str, color: Rgb) -> String {
        if self.colors_enabled {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_bold(&self, text: &str, color: Rgb) -> String {
        if self.colors_enabled {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn anchor_name(notification: &Notification) -> String {
    let anchor = notification.anchor();
    let vertical = match anchor.vertical {
        Vertical::Top => "top",
        Vertical::Bottom => "bottom",
    };
    let horizontal = match anchor.horizontal {
        Horizontal::Left => "left",
        Horizontal::Center => "center",
        Horizontal::Right => "right",
    };
    format!("{}-{}", vertical, horizontal)
}

fn dialog_tags(dialog: &DialogView) -> String {
    let mut tags = vec![dialog.id.to_string(), dialog.kind.to_string()];
    if dialog.persistent {
        tags.push("persistent".to_string());
    }
    if dialog.full_screen {
        tags.push("full screen".to_string());
    }
    if dialog.confirming {
        tags.push("confirming...".to_string());
    }
    format!("({})", tags.join(", "))
}

/// Safely truncates a string to the given maximum character count.
/// This handles multi-byte UTF-8 characters correctly.
fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

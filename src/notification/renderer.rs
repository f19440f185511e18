//! Terminal panels for notifications.

use std::time::Duration;

use owo_colors::{OwoColorize, Rgb};

use super::{Notification, Notifier};

/// 24-bit RGB palette used by the panels.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Success state color - green (34, 197, 94)
    pub success: Rgb,
    /// Error state color - red (239, 68, 68)
    pub error: Rgb,
    /// Warning state color - yellow (234, 179, 8)
    pub warning: Rgb,
    /// In-progress state color - blue (59, 130, 246)
    pub in_progress: Rgb,
    /// Muted/secondary text color - gray (107, 114, 128)
    pub muted: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Rgb(34, 197, 94),
            error: Rgb(239, 68, 68),
            warning: Rgb(234, 179, 8),
            in_progress: Rgb(59, 130, 246),
            muted: Rgb(107, 114, 128),
        }
    }
}

/// Renders notifications as bordered terminal panels.
#[derive(Debug, Clone)]
pub struct NotificationRenderer {
    theme: Theme,
    /// Panel width (characters)
    width: usize,
    colored: bool,
}

impl Default for NotificationRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationRenderer {
    /// Creates a coloured renderer with the default theme and a width of 60.
    pub fn new() -> Self {
        Self {
            theme: Theme::default(),
            width: 60,
            colored: true,
        }
    }

    /// Sets the panel width. Widths below 20 are raised to 20.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(20);
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Enables or disables ANSI colours.
    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn paint(&self, text: &str, color: Rgb, bold: bool) -> String {
        match (self.colored, bold) {
            (false, _) => text.to_string(),
            (true, false) => text.color(color).to_string(),
            (true, true) => text.color(color).bold().to_string(),
        }
    }

    fn border_line(&self, color: Rgb) -> String {
        self.paint(&"─".repeat(self.width - 2), color, false)
    }

    /// Safely truncates a string to the given maximum character count.
    fn safe_truncate(s: &str, max_chars: usize) -> String {
        if s.chars().count() <= max_chars {
            s.to_string()
        } else {
            let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", truncated)
        }
    }

    fn push_row(output: &mut String, text: String) {
        output.push(' ');
        output.push_str(&text);
        output.push('\n');
    }

    fn push_header(&self, output: &mut String, header: &str, accent: Rgb) {
        output.push_str(&self.border_line(accent));
        output.push('\n');
        Self::push_row(output, self.paint(header, accent, true));
        output.push_str(&self.border_line(accent));
        output.push('\n');
    }

    /// Renders any notification.
    pub fn render(&self, notification: &Notification) -> String {
        match notification {
            Notification::Error {
                message,
                description,
                ..
            } => self.render_error(message, description.as_deref()),
            Notification::Retrying {
                attempt,
                max_attempts,
                delay,
                reason,
            } => self.render_retry(*attempt, *max_attempts, *delay, reason),
        }
    }

    /// Renders an error panel with the message and an optional description.
    pub fn render_error(&self, message: &str, description: Option<&str>) -> String {
        let theme = self.theme;
        let inner_width = self.width - 2;
        let mut output = String::new();

        self.push_header(&mut output, "Request Failed", theme.error);
        output.push('\n');

        Self::push_row(
            &mut output,
            Self::safe_truncate(message, inner_width.saturating_sub(2)),
        );
        if let Some(description) = description {
            Self::push_row(&mut output, self.paint(description, theme.muted, false));
        }

        output.push('\n');
        output.push_str(&self.border_line(theme.error));
        output
    }

    /// Renders a retry panel with attempt progress and the delay.
    pub fn render_retry(
        &self,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        reason: &str,
    ) -> String {
        let theme = self.theme;
        let inner_width = self.width - 2;
        let mut output = String::new();

        let header = format!("Retry Attempt {}/{}", attempt, max_attempts);
        self.push_header(&mut output, &header, theme.in_progress);
        output.push('\n');

        Self::push_row(&mut output, self.paint("Error:", theme.muted, false));
        Self::push_row(
            &mut output,
            Self::safe_truncate(reason, inner_width.saturating_sub(2)),
        );
        output.push('\n');

        let delay_msg = format!("Retrying in {:.1}s...", delay.as_secs_f64());
        Self::push_row(&mut output, self.paint(&delay_msg, theme.in_progress, true));

        let filled = attempt.min(max_attempts) as usize;
        let empty = max_attempts.saturating_sub(attempt) as usize;
        let progress_bar = format!("{}{}", "●".repeat(filled), "○".repeat(empty));
        Self::push_row(&mut output, self.paint(&progress_bar, theme.in_progress, false));

        output.push_str(&self.border_line(theme.in_progress));
        output
    }

    /// Renders a one-line success summary.
    pub fn render_success(&self, summary: &str) -> String {
        format!("{} {}", self.paint("✓", self.theme.success, true), summary)
    }

    /// Renders a one-line warning.
    pub fn render_warning(&self, summary: &str) -> String {
        format!("{} {}", self.paint("!", self.theme.warning, true), summary)
    }
}

/// Prints rendered notifications to stderr.
#[derive(Debug, Clone, Default)]
pub struct TerminalNotifier {
    renderer: NotificationRenderer,
}

impl TerminalNotifier {
    pub fn new(renderer: NotificationRenderer) -> Self {
        Self { renderer }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        eprintln!("{}", self.renderer.render(notification));
    }
}

//! User-facing notifications for failures and retries.
//!
//! Hooks emit a [`Notification`] through a [`Notifier`] whenever they capture
//! an error or schedule a retry. The default notifier forwards to `tracing`;
//! the CLI renders notifications as coloured terminal panels.

mod renderer;

pub use renderer::{NotificationRenderer, TerminalNotifier, Theme};

use std::time::Duration;
use tracing::{error, info};

/// How long an error notification stays visible.
pub const ERROR_NOTIFICATION_DURATION: Duration = Duration::from_secs(5);

/// A notification about a failure or a recovery action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// An operation failed.
    Error {
        /// Text fit for display.
        message: String,
        /// Secondary line, e.g. `Error code: 503`.
        description: Option<String>,
        /// How long the notification should stay visible.
        duration: Duration,
    },

    /// An operation is being retried.
    Retrying {
        /// The attempt that failed (1-based).
        attempt: u32,
        /// Maximum number of attempts configured.
        max_attempts: u32,
        /// Delay before the next attempt.
        delay: Duration,
        /// Reason for the retry.
        reason: String,
    },
}

impl Notification {
    /// Creates an error notification with the default duration.
    pub fn error(message: impl Into<String>, description: Option<String>) -> Self {
        Self::Error {
            message: message.into(),
            description,
            duration: ERROR_NOTIFICATION_DURATION,
        }
    }

    /// Creates a new Retrying notification.
    pub fn retrying(
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self::Retrying {
            attempt,
            max_attempts,
            delay,
            reason: reason.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error {
                message,
                description,
                ..
            } => match description {
                Some(description) => write!(f, "{} ({})", message, description),
                None => write!(f, "{}", message),
            },
            Self::Retrying {
                attempt,
                max_attempts,
                delay,
                reason,
            } => {
                write!(
                    f,
                    "Retrying ({}/{}) in {} ms: {}",
                    attempt,
                    max_attempts,
                    delay.as_millis(),
                    reason
                )
            }
        }
    }
}

/// Receives notifications emitted by the hooks.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

impl<F> Notifier for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        self(notification)
    }
}

/// Forwards notifications to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        if notification.is_error() {
            error!(target: "storefront::notify", "{}", notification);
        } else {
            info!(target: "storefront::notify", "{}", notification);
        }
    }
}

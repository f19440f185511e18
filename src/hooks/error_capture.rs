//! Single-slot error state with user notification.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{parse, Failure, NormalizedError};
use crate::notification::{Notification, Notifier, TracingNotifier};

/// Snapshot of an [`ErrorCapture`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorState {
    /// The current error, if any.
    pub error: Option<NormalizedError>,
    pub is_error: bool,
    /// When the current error was captured.
    pub timestamp: Option<DateTime<Utc>>,
    /// Errors captured over the lifetime of this capture. Not reset by `clear`.
    pub count: u32,
}

/// Holds at most one current error.
///
/// Clones share the same slot.
#[derive(Clone)]
pub struct ErrorCapture {
    state: Arc<Mutex<ErrorState>>,
    notifier: Arc<dyn Notifier>,
}

impl Default for ErrorCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorCapture")
            .field("state", &*self.lock())
            .finish()
    }
}

impl ErrorCapture {
    /// Creates a capture that reports through `tracing`.
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(TracingNotifier))
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ErrorState::default())),
            notifier,
        }
    }

    /// Parses `failure`, stores it as the current error and notifies the user.
    pub fn capture(&self, failure: impl Into<Failure>) -> NormalizedError {
        let error = parse(failure);
        self.record(&error);
        self.announce(&error);
        error
    }

    /// Resets the slot. The capture count is kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.error = None;
        state.is_error = false;
        state.timestamp = None;
    }

    pub fn error(&self) -> Option<NormalizedError> {
        self.lock().error.clone()
    }

    pub fn is_error(&self) -> bool {
        self.lock().is_error
    }

    pub fn state(&self) -> ErrorState {
        self.lock().clone()
    }

    /// Clears the slot, then runs `op`. A failure is captured and swallowed.
    pub async fn run_guarded<T, E, F, Fut>(&self, op: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        self.clear();
        match op().await {
            Ok(value) => Some(value),
            Err(failure) => {
                self.capture(failure);
                None
            }
        }
    }

    pub(crate) fn record(&self, error: &NormalizedError) {
        let mut state = self.lock();
        state.error = Some(error.clone());
        state.is_error = true;
        state.timestamp = Some(Utc::now());
        state.count = state.count.saturating_add(1);
    }

    pub(crate) fn announce(&self, error: &NormalizedError) {
        let description = error
            .status_code()
            .map(|status| format!("Error code: {}", status));
        self.notifier
            .notify(&Notification::error(error.user_message(), description));
    }

    fn lock(&self) -> MutexGuard<'_, ErrorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

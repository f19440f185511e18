//! Lifecycle state for one async operation at a time.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::error_capture::ErrorCapture;
use crate::error::{parse, Failure, NormalizedError};
use crate::notification::Notifier;

/// Snapshot of an [`AsyncAction`].
#[derive(Clone, Debug, PartialEq)]
pub struct ActionState<T> {
    pub is_running: bool,
    /// Value of the last successful run. Kept when a later run fails.
    pub result: Option<T>,
    pub error: Option<NormalizedError>,
}

#[derive(Debug)]
struct Inner<T> {
    /// Token of the newest run; only that run may commit.
    latest_token: u64,
    is_running: bool,
    result: Option<T>,
}

/// Tracks `{ is_running, result, error }` for an async operation.
///
/// Starting a run while another is in flight supersedes it. The older run is
/// not cancelled, but its outcome is discarded when it settles.
#[derive(Debug)]
pub struct AsyncAction<T> {
    inner: Arc<Mutex<Inner<T>>>,
    errors: ErrorCapture,
}

impl<T> Clone for AsyncAction<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            errors: self.errors.clone(),
        }
    }
}

impl<T: Clone> Default for AsyncAction<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> AsyncAction<T> {
    pub fn new() -> Self {
        Self::with_errors(ErrorCapture::new())
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_errors(ErrorCapture::with_notifier(notifier))
    }

    /// Uses an existing error capture, sharing its slot.
    pub fn with_errors(errors: ErrorCapture) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                latest_token: 0,
                is_running: false,
                result: None,
            })),
            errors,
        }
    }

    /// Runs `op`, tracking its lifecycle.
    ///
    /// Returns the value on success. Failures are captured and yield `None`.
    /// If a newer run started in the meantime, this run's outcome is not
    /// committed to the shared state.
    pub async fn execute<E, F, Fut>(&self, op: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        let token = {
            let mut inner = self.lock();
            inner.latest_token += 1;
            inner.is_running = true;
            self.errors.clear();
            inner.latest_token
        };

        let outcome = op().await;

        let mut inner = self.lock();
        if inner.latest_token != token {
            debug!(
                token,
                latest = inner.latest_token,
                "Discarding outcome of superseded run"
            );
            return outcome.ok();
        }

        inner.is_running = false;
        match outcome {
            Ok(value) => {
                inner.result = Some(value.clone());
                Some(value)
            }
            Err(failure) => {
                let error = parse(failure);
                self.errors.record(&error);
                drop(inner);
                self.errors.announce(&error);
                None
            }
        }
    }

    /// Clears all state and detaches any in-flight run.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.latest_token += 1;
        inner.is_running = false;
        inner.result = None;
        self.errors.clear();
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running
    }

    pub fn result(&self) -> Option<T> {
        self.lock().result.clone()
    }

    pub fn error(&self) -> Option<NormalizedError> {
        self.errors.error()
    }

    pub fn errors(&self) -> &ErrorCapture {
        &self.errors
    }

    pub fn state(&self) -> ActionState<T> {
        let inner = self.lock();
        ActionState {
            is_running: inner.is_running,
            result: inner.result.clone(),
            error: self.errors.error(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Progress state around the backoff retry engine.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Failure, NormalizedError};
use crate::notification::{Notification, Notifier};
use crate::retry::RetryPolicy;

/// Snapshot of a [`RetryTracker`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryState {
    pub is_retrying: bool,
    /// 1-based number of the attempt in progress, 0 before the first.
    pub current_attempt: u32,
}

/// Exposes `{ is_retrying, current_attempt }` for progress display while a
/// retry run is in flight.
#[derive(Clone)]
pub struct RetryTracker {
    state: Arc<Mutex<RetryState>>,
    policy: RetryPolicy,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for RetryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTracker")
            .field("state", &*self.lock())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RetryTracker {
    /// Creates a tracker whose runs use `policy` for the cap and jitter.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(RetryState::default())),
            policy,
            notifier: None,
        }
    }

    /// Emits a [`Notification::Retrying`] before each backoff sleep.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn state(&self) -> RetryState {
        *self.lock()
    }

    pub fn is_retrying(&self) -> bool {
        self.lock().is_retrying
    }

    pub fn current_attempt(&self) -> u32 {
        self.lock().current_attempt
    }

    /// Runs `op` with this tracker's policy.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        self.run_policy(self.policy.clone(), op).await
    }

    /// Runs `op` with an explicit attempt budget and base delay.
    ///
    /// The attempt counter restarts at 0. On success it returns to 0; on
    /// failure it keeps the number of the last attempt made.
    pub async fn retry<T, E, F, Fut>(
        &self,
        op: F,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        let policy = RetryPolicy {
            max_attempts,
            base_delay,
            ..self.policy.clone()
        };
        self.run_policy(policy, op).await
    }

    async fn run_policy<T, E, F, Fut>(
        &self,
        policy: RetryPolicy,
        mut op: F,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        *self.lock() = RetryState {
            is_retrying: true,
            current_attempt: 0,
        };

        let result = policy
            .run_with_observer(
                || {
                    self.lock().current_attempt += 1;
                    op()
                },
                |session, error, delay| {
                    if let Some(notifier) = &self.notifier {
                        notifier.notify(&Notification::retrying(
                            session.attempt + 1,
                            session.max_attempts,
                            delay,
                            error.user_message(),
                        ));
                    }
                },
            )
            .await;

        let mut state = self.lock();
        state.is_retrying = false;
        if result.is_ok() {
            state.current_attempt = 0;
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, RetryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

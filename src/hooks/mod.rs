//! Stateful wrappers that expose the error and retry core to a UI layer.
//!
//! Each hook keeps its state behind an `Arc<Mutex<_>>`, so clones of one hook
//! observe and update the same slot while independent hooks never interact.
//!
//! - [`ErrorCapture`] holds the current error and notifies the user.
//! - [`AsyncAction`] tracks the running/result/error lifecycle of an operation.
//! - [`RetryTracker`] exposes retry progress around the backoff engine.

mod async_action;
mod error_capture;
mod retry_tracker;

pub use async_action::{ActionState, AsyncAction};
pub use error_capture::{ErrorCapture, ErrorState};
pub use retry_tracker::{RetryState, RetryTracker};

//! Storefront - resilient catalog client for the dummyjson API.
//!
//! The core normalizes every failure (HTTP error responses, transport errors,
//! arbitrary caught values) into one [`error::NormalizedError`], retries
//! transient failures with exponential backoff and exposes both through small
//! stateful hooks for a UI layer.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod logging;
pub mod notification;
pub mod retry;

pub use error::{ErrorKind, NormalizedError};
pub use fetch::{ApiResult, FetchClient, FetchConfig, Payload};
pub use retry::{retry_with_backoff, RetryPolicy};

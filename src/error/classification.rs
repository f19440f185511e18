//! Error classification for the storefront error model.
//!
//! Every failure that crosses the client boundary resolves to exactly one
//! [`ErrorKind`]. The HTTP status mapping and the retryability rule live here
//! so that the parser, the fetch wrapper and the retry engine agree on them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The request never produced a response (DNS, refused connection, dropped socket).
    #[serde(alias = "NETWORK_ERROR")]
    Network,
    /// The request was rejected as malformed (HTTP 400 and most other 4xx).
    #[serde(alias = "VALIDATION_ERROR")]
    Validation,
    /// Credentials are missing or invalid (HTTP 401).
    #[serde(alias = "AUTHENTICATION_ERROR")]
    Authentication,
    /// Credentials are valid but lack permission (HTTP 403).
    #[serde(alias = "AUTHORIZATION_ERROR")]
    Authorization,
    /// The requested resource does not exist (HTTP 404).
    NotFound,
    /// The server failed to handle a valid request (HTTP 5xx).
    #[serde(alias = "SERVER_ERROR")]
    Server,
    /// Too many requests (HTTP 429).
    RateLimit,
    /// The request was aborted or exceeded its deadline.
    Timeout,
    /// Anything that could not be classified.
    Unknown,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Network,
        ErrorKind::Validation,
        ErrorKind::Authentication,
        ErrorKind::Authorization,
        ErrorKind::NotFound,
        ErrorKind::Server,
        ErrorKind::RateLimit,
        ErrorKind::Timeout,
        ErrorKind::Unknown,
    ];

    /// Returns the wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Authentication => "AUTHENTICATION",
            ErrorKind::Authorization => "AUTHORIZATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Server => "SERVER",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Returns the sentence shown to users when the upstream supplied no message.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Network => {
                "Unable to connect to the server. Check your internet connection."
            }
            ErrorKind::Validation => "The submitted data is invalid. Check your input.",
            ErrorKind::Authentication => "Authentication required. Please sign in.",
            ErrorKind::Authorization => "You do not have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::Server => "The server encountered an error. Please try again later.",
            ErrorKind::RateLimit => "Too many requests. Please wait a moment.",
            ErrorKind::Timeout => "The request timed out. Please try again.",
            ErrorKind::Unknown => "An unknown error occurred. Please try again later.",
        }
    }

    /// Returns true if this kind is retryable on its own, regardless of status.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimit | ErrorKind::Server
        )
    }

    /// Returns true for the kinds that usually need user or operator attention.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            ErrorKind::Server | ErrorKind::Authentication | ErrorKind::Authorization
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an HTTP status code to an [`ErrorKind`].
///
/// 400, 401, 403, 404 and 429 have dedicated kinds; any other 4xx counts as a
/// validation failure, anything from 500 up is a server failure and the rest
/// is unknown.
pub fn classify_by_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Validation,
        401 => ErrorKind::Authentication,
        403 => ErrorKind::Authorization,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimit,
        401..=499 => ErrorKind::Validation,
        500..=u16::MAX => ErrorKind::Server,
        _ => ErrorKind::Unknown,
    }
}

/// Decides whether an error of `kind` with `status` may be retried.
///
/// Network, timeout, rate-limit and server kinds are retryable, as is any
/// status of 500 or above.
pub fn is_retryable(kind: ErrorKind, status: Option<u16>) -> bool {
    kind.is_transient() || status.is_some_and(|s| s >= 500)
}

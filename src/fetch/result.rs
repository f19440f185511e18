//! Result types returned by the fetch wrapper.

use serde::de::DeserializeOwned;

use crate::error::{ErrorKind, NormalizedError};

/// A decoded success body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload<T> {
    /// The response declared a JSON content type and decoded as `T`.
    Json(T),
    /// Any other content type, as text.
    Text(String),
}

impl<T> Payload<T> {
    pub fn is_json(&self) -> bool {
        matches!(self, Payload::Json(_))
    }

    /// The decoded JSON value, if any.
    pub fn json(self) -> Option<T> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }
}

impl<T: DeserializeOwned> Payload<T> {
    /// The value as `T`, decoding a text payload as JSON if needed.
    pub fn into_value(self) -> Result<T, NormalizedError> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(text) => serde_json::from_str(&text).map_err(|e| {
                NormalizedError::new(
                    ErrorKind::Unknown,
                    format!("Unexpected response body: {}", e),
                )
                .stamped()
            }),
        }
    }
}

/// Explicit success-or-failure value returned when errors are not thrown.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiResult<T> {
    Success {
        data: T,
        status: u16,
    },
    Failure {
        error: NormalizedError,
        /// HTTP status, absent for transport failures.
        status: Option<u16>,
    },
}

impl<T> ApiResult<T> {
    /// Wraps a failure, taking the status from the error.
    pub fn failure(error: NormalizedError) -> Self {
        let status = error.status_code();
        ApiResult::Failure { error, status }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiResult::Success { status, .. } => Some(*status),
            ApiResult::Failure { status, .. } => *status,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResult::Success { data, .. } => Some(data),
            ApiResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&NormalizedError> {
        match self {
            ApiResult::Failure { error, .. } => Some(error),
            ApiResult::Success { .. } => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResult<U> {
        match self {
            ApiResult::Success { data, status } => ApiResult::Success {
                data: f(data),
                status,
            },
            ApiResult::Failure { error, status } => ApiResult::Failure { error, status },
        }
    }

    pub fn into_result(self) -> Result<T, NormalizedError> {
        match self {
            ApiResult::Success { data, .. } => Ok(data),
            ApiResult::Failure { error, .. } => Err(error),
        }
    }
}

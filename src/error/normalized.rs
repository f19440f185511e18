//! The normalized error value every failure is converted into.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::classification::{is_retryable, ErrorKind};

/// Fallback message used when an HTTP failure carries no status text.
///
/// [`NormalizedError::user_message`] treats it as "no message" and shows the
/// kind-specific sentence instead.
pub const GENERIC_SERVER_MESSAGE: &str = "Server error";

/// Detail code applied by [`NormalizedError::validation`] when a detail has none.
pub const DEFAULT_VALIDATION_CODE: &str = "VALIDATION_ERROR";

/// A structured sub-error, used by validation failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// The input field the detail refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable description of the problem.
    pub message: String,
    /// Machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetail {
    /// Creates a detail with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
            code: None,
        }
    }

    /// Sets the field this detail refers to.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Sets the machine-readable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// A failure normalized into the storefront error model.
///
/// `retryable` is always derived from `kind` and `status_code`; there is no way
/// to set it directly. Values are immutable once built: the `with_*` methods
/// consume the error and return a new one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "NormalizedErrorRepr")]
pub struct NormalizedError {
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    retryable: bool,
}

/// Wire shape accepted on input. `type` and `timestampUtc` are accepted as
/// aliases and any incoming `retryable` flag is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NormalizedErrorRepr {
    #[serde(alias = "type")]
    kind: ErrorKind,
    message: String,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default, alias = "timestampUtc")]
    timestamp: Option<String>,
}

impl From<NormalizedErrorRepr> for NormalizedError {
    fn from(repr: NormalizedErrorRepr) -> Self {
        let mut error = NormalizedError::new(repr.kind, repr.message).with_details(repr.details);
        if let Some(status) = repr.status_code {
            error = error.with_status(status);
        }
        if let Some(request_id) = repr.request_id {
            error = error.with_request_id(request_id);
        }
        if let Some(timestamp) = repr.timestamp {
            error = error.with_timestamp(timestamp);
        }
        error
    }
}

/// Current UTC time as an ISO-8601 string with millisecond precision.
pub(crate) fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl NormalizedError {
    /// Creates an error with no status, details, request id or timestamp.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            details: Vec::new(),
            request_id: None,
            timestamp: None,
            retryable: is_retryable(kind, None),
        }
    }

    /// Attaches an HTTP status code and re-derives `retryable`.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self.retryable = is_retryable(self.kind, self.status_code);
        self
    }

    /// Replaces the detail list.
    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    /// Attaches a request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attaches an explicit ISO-8601 timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Stamps the current UTC time.
    pub fn stamped(self) -> Self {
        self.with_timestamp(utc_timestamp())
    }

    /// Builds a validation error (HTTP 400). Details without a code get
    /// [`DEFAULT_VALIDATION_CODE`].
    pub fn validation(message: impl Into<String>, details: Vec<ErrorDetail>) -> Self {
        let details = details
            .into_iter()
            .map(|detail| {
                if detail.code.is_some() {
                    detail
                } else {
                    detail.with_code(DEFAULT_VALIDATION_CODE)
                }
            })
            .collect();

        Self::new(ErrorKind::Validation, message)
            .with_status(400)
            .with_details(details)
            .stamped()
    }

    /// Builds a server error (HTTP 500).
    pub fn server(message: impl Into<String>, request_id: Option<String>) -> Self {
        let error = Self::new(ErrorKind::Server, message).with_status(500);
        match request_id {
            Some(id) => error.with_request_id(id).stamped(),
            None => error.stamped(),
        }
    }

    /// Builds an authentication error (HTTP 401).
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
            .with_status(401)
            .stamped()
    }

    /// Builds an authorization error (HTTP 403).
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
            .with_status(403)
            .stamped()
    }

    /// Builds a network error with an optional custom message.
    pub fn network(message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| "Unable to connect to the server".to_string());
        Self::new(ErrorKind::Network, message).stamped()
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Returns true if re-attempting the operation is sanctioned.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Returns text fit for display: the upstream message when it said
    /// something, otherwise the default sentence for the kind.
    pub fn user_message(&self) -> &str {
        let message = self.message.trim();
        if message.is_empty() || message == GENERIC_SERVER_MESSAGE {
            self.kind.default_message()
        } else {
            &self.message
        }
    }

    /// Validation error carrying at least one detail.
    pub fn is_validation_error(&self) -> bool {
        self.kind == ErrorKind::Validation && !self.details.is_empty()
    }

    pub fn is_server_error(&self) -> bool {
        self.kind == ErrorKind::Server
    }

    /// Authentication or authorization failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Authentication | ErrorKind::Authorization
        )
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NormalizedError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_retryable_from_kind() {
        assert!(NormalizedError::new(ErrorKind::Network, "down").is_retryable());
        assert!(!NormalizedError::new(ErrorKind::NotFound, "gone").is_retryable());
    }

    #[test]
    fn test_with_status_rederives_retryable() {
        let error = NormalizedError::new(ErrorKind::Unknown, "odd").with_status(503);
        assert!(error.is_retryable());
        assert_eq!(error.status_code(), Some(503));

        let error = NormalizedError::new(ErrorKind::Validation, "bad").with_status(500);
        // A 5xx status makes even a validation kind retryable.
        assert!(error.is_retryable());
    }

    #[test]
    fn test_validation_factory_fills_default_codes() {
        let error = NormalizedError::validation(
            "Validation failed",
            vec![
                ErrorDetail::new("Invalid email format").with_field("email"),
                ErrorDetail::new("Too short")
                    .with_field("password")
                    .with_code("MIN_LENGTH"),
            ],
        );

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.status_code(), Some(400));
        assert!(!error.is_retryable());
        assert!(error.timestamp().is_some());
        assert_eq!(error.details()[0].code.as_deref(), Some(DEFAULT_VALIDATION_CODE));
        assert_eq!(error.details()[1].code.as_deref(), Some("MIN_LENGTH"));
        assert!(error.is_validation_error());
    }

    #[test]
    fn test_server_factory() {
        let error = NormalizedError::server("db down", Some("r1".to_string()));
        assert_eq!(error.kind(), ErrorKind::Server);
        assert_eq!(error.status_code(), Some(500));
        assert_eq!(error.request_id(), Some("r1"));
        assert!(error.is_retryable());
        assert!(error.is_server_error());
    }

    #[test]
    fn test_auth_factories() {
        let authn = NormalizedError::authentication("sign in");
        let authz = NormalizedError::authorization("forbidden");
        assert_eq!(authn.status_code(), Some(401));
        assert_eq!(authz.status_code(), Some(403));
        assert!(authn.is_auth_error());
        assert!(authz.is_auth_error());
        assert!(!authn.is_retryable());
        assert!(!authz.is_retryable());
    }

    #[test]
    fn test_network_factory_default_message() {
        let error = NormalizedError::network(None);
        assert_eq!(error.kind(), ErrorKind::Network);
        assert_eq!(error.message(), "Unable to connect to the server");
        assert!(error.is_retryable());
    }

    #[test]
    fn test_validation_without_details_is_not_a_validation_error() {
        let error = NormalizedError::new(ErrorKind::Validation, "bad input");
        assert!(!error.is_validation_error());
    }

    #[test]
    fn test_user_message_falls_back_to_kind_sentence() {
        let generic = NormalizedError::new(ErrorKind::Server, GENERIC_SERVER_MESSAGE);
        assert_eq!(generic.user_message(), ErrorKind::Server.default_message());

        let blank = NormalizedError::new(ErrorKind::Timeout, "  ");
        assert_eq!(blank.user_message(), ErrorKind::Timeout.default_message());

        let custom = NormalizedError::new(ErrorKind::Server, "db down");
        assert_eq!(custom.user_message(), "db down");
    }

    #[test]
    fn test_serialize_uses_camel_case_and_skips_empty() {
        let error = NormalizedError::new(ErrorKind::NotFound, "missing").with_status(404);
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["kind"], "NOT_FOUND");
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["retryable"], false);
        assert!(json.get("details").is_none());
        assert!(json.get("requestId").is_none());
    }

    #[test]
    fn test_deserialize_accepts_type_alias_and_recomputes_retryable() {
        let json = serde_json::json!({
            "type": "SERVER_ERROR",
            "message": "boom",
            "statusCode": 502,
            "retryable": false,
            "timestampUtc": "2024-01-01T00:00:00.000Z"
        });

        let error: NormalizedError = serde_json::from_value(json).unwrap();
        assert_eq!(error.kind(), ErrorKind::Server);
        assert!(error.is_retryable());
        assert_eq!(error.timestamp(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_display_is_message() {
        let error = NormalizedError::new(ErrorKind::Unknown, "something broke");
        assert_eq!(error.to_string(), "something broke");
    }
}

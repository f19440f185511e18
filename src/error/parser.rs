//! Failure normalization.
//!
//! The calling boundary tags what it caught as a [`Failure`] and the
//! [`ErrorParser`] turns it into exactly one [`NormalizedError`]. Parsing never
//! fails: unreadable bodies, malformed JSON and unrecognised shapes degrade to
//! a best-effort message.

use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::detector::SignatureDetector;
use super::normalized::{ErrorDetail, NormalizedError, GENERIC_SERVER_MESSAGE};
use super::{classify_by_status, ErrorKind};

/// Message used when an error object carries no message of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

/// Message used when a caught value has no printable form.
pub const DEFAULT_UNKNOWN_MESSAGE: &str = "An unknown error occurred.";

/// Everything a boundary may hand to the parser.
#[derive(Clone, Debug)]
pub enum Failure {
    /// Already normalized; passed through unchanged.
    Normalized(NormalizedError),
    /// A non-2xx HTTP response.
    Http(HttpFailure),
    /// A native error value (transport error, I/O error, runtime error).
    Native(NativeFailure),
    /// Anything else, as loosely-typed JSON.
    Opaque(Value),
}

/// A non-2xx HTTP response, captured after its body was read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpFailure {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase, empty when unknown.
    pub status_text: String,
    /// Value of the `content-type` header.
    pub content_type: Option<String>,
    /// Value of the `x-request-id` header.
    pub request_id_header: Option<String>,
    /// The body text, or a description of why it could not be read.
    pub body: Result<String, String>,
}

impl HttpFailure {
    /// Creates a failure with an empty body and no headers.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: String::new(),
            content_type: None,
            request_id_header: None,
            body: Ok(String::new()),
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Sets a JSON body and the matching content type.
    pub fn with_json_body(mut self, body: &Value) -> Self {
        self.content_type = Some("application/json".to_string());
        self.body = Ok(body.to_string());
        self
    }

    /// Sets a plain-text body and the matching content type.
    pub fn with_text_body(mut self, body: impl Into<String>) -> Self {
        self.content_type = Some("text/plain".to_string());
        self.body = Ok(body.into());
        self
    }

    /// Records that the body could not be read.
    pub fn with_unreadable_body(mut self, reason: impl Into<String>) -> Self {
        self.body = Err(reason.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_request_id_header(mut self, request_id: impl Into<String>) -> Self {
        self.request_id_header = Some(request_id.into());
        self
    }

    /// Captures status, headers and body from a response.
    ///
    /// This performs the one asynchronous body read parsing needs.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers();
        let content_type = header_value(headers, reqwest::header::CONTENT_TYPE.as_str());
        let request_id_header = header_value(headers, "x-request-id");
        let body = response.text().await.map_err(|e| e.to_string());

        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            request_id_header,
            body,
        }
    }

    /// True when the content type names JSON.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// A native error value described by its type name and message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeFailure {
    /// Type name of the error, e.g. `TypeError` or `TimeoutError`.
    pub name: Option<String>,
    /// The error message.
    pub message: String,
    /// A status code embedded in the error, if any.
    pub status: Option<u16>,
}

impl NativeFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<&reqwest::Error> for NativeFailure {
    fn from(error: &reqwest::Error) -> Self {
        let name = if error.is_timeout() {
            "TimeoutError"
        } else if error.is_connect() {
            "ConnectError"
        } else if error.is_request() {
            "RequestError"
        } else if error.is_decode() {
            "DecodeError"
        } else if error.is_builder() {
            "BuilderError"
        } else {
            "HttpError"
        };

        Self {
            name: Some(name.to_string()),
            message: error_chain(error),
            status: error.status().map(|s| s.as_u16()),
        }
    }
}

impl From<&std::io::Error> for NativeFailure {
    fn from(error: &std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;

        let name = match error.kind() {
            IoKind::TimedOut => "TimeoutError",
            IoKind::ConnectionRefused
            | IoKind::ConnectionReset
            | IoKind::ConnectionAborted
            | IoKind::NotConnected
            | IoKind::BrokenPipe => "NetworkError",
            _ => "IoError",
        };

        Self::new(name, error.to_string())
    }
}

/// Joins an error and its sources into one message.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl From<NormalizedError> for Failure {
    fn from(error: NormalizedError) -> Self {
        Failure::Normalized(error)
    }
}

impl From<HttpFailure> for Failure {
    fn from(failure: HttpFailure) -> Self {
        Failure::Http(failure)
    }
}

impl From<NativeFailure> for Failure {
    fn from(failure: NativeFailure) -> Self {
        Failure::Native(failure)
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        Failure::Opaque(value)
    }
}

impl From<reqwest::Error> for Failure {
    fn from(error: reqwest::Error) -> Self {
        Failure::Native(NativeFailure::from(&error))
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Failure::Native(NativeFailure::from(&error))
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::Opaque(Value::String(message.to_string()))
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Opaque(Value::String(message))
    }
}

/// Converts failures into [`NormalizedError`] values.
#[derive(Debug, Default)]
pub struct ErrorParser {
    detector: SignatureDetector,
}

impl ErrorParser {
    /// Creates a parser with the default signature patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with a custom signature detector.
    pub fn with_detector(detector: SignatureDetector) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &SignatureDetector {
        &self.detector
    }

    /// Normalizes a failure. Never fails.
    pub fn parse(&self, failure: impl Into<Failure>) -> NormalizedError {
        match failure.into() {
            Failure::Normalized(error) => error,
            Failure::Http(http) => self.parse_http(&http),
            Failure::Native(native) => self.parse_native(&native),
            Failure::Opaque(value) => self.parse_opaque(value),
        }
    }

    fn parse_http(&self, http: &HttpFailure) -> NormalizedError {
        let mut message = if http.status_text.is_empty() {
            GENERIC_SERVER_MESSAGE.to_string()
        } else {
            http.status_text.clone()
        };
        let mut details = Vec::new();
        let mut request_id = None;

        match &http.body {
            Ok(text) if http.is_json() => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(body)) => {
                    if let Some(found) = string_field(&body, &["message", "error"]) {
                        message = found;
                    }
                    details = details_field(&body);
                    request_id = string_field(&body, &["requestId"]);
                }
                Ok(Value::String(found)) if !found.is_empty() => message = found,
                Ok(_) => {}
                Err(e) => debug!(status = http.status, "error body is not valid JSON: {}", e),
            },
            Ok(text) if !text.is_empty() => message = text.clone(),
            Ok(_) => {}
            Err(reason) => warn!(
                status = http.status,
                "failed to read error response body: {}", reason
            ),
        }

        let kind = classify_by_status(http.status);
        let mut error = NormalizedError::new(kind, message)
            .with_status(http.status)
            .with_details(details)
            .stamped();
        if let Some(id) = request_id.or_else(|| http.request_id_header.clone()) {
            error = error.with_request_id(id);
        }
        error
    }

    fn parse_native(&self, native: &NativeFailure) -> NormalizedError {
        let kind = self.classify_fields(native.name.as_deref(), &native.message, native.status);
        let message = if native.message.is_empty() {
            DEFAULT_ERROR_MESSAGE.to_string()
        } else {
            native.message.clone()
        };

        let mut error = NormalizedError::new(kind, message);
        if let Some(status) = native.status {
            error = error.with_status(status);
        }
        error.stamped()
    }

    fn parse_opaque(&self, value: Value) -> NormalizedError {
        match value {
            Value::Object(object) => {
                if looks_normalized(&object) {
                    match serde_json::from_value::<NormalizedError>(Value::Object(object.clone())) {
                        Ok(error) => return error,
                        Err(e) => debug!("error-shaped object did not decode: {}", e),
                    }
                }
                self.parse_object(&object)
            }
            Value::Null => NormalizedError::new(ErrorKind::Unknown, DEFAULT_UNKNOWN_MESSAGE),
            Value::String(text) if text.is_empty() => {
                NormalizedError::new(ErrorKind::Unknown, DEFAULT_UNKNOWN_MESSAGE)
            }
            Value::String(text) => NormalizedError::new(ErrorKind::Unknown, text),
            other => NormalizedError::new(ErrorKind::Unknown, other.to_string()),
        }
    }

    fn parse_object(&self, object: &Map<String, Value>) -> NormalizedError {
        let raw_message = string_field(object, &["message", "error"]);
        let status = status_field(object, &["statusCode", "status"]);
        let name = string_field(object, &["name"]);

        let kind = self.classify_fields(
            name.as_deref(),
            raw_message.as_deref().unwrap_or_default(),
            status,
        );

        let mut error = NormalizedError::new(
            kind,
            raw_message.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        )
        .with_details(details_field(object));
        if let Some(status) = status {
            error = error.with_status(status);
        }
        if let Some(id) = string_field(object, &["requestId"]) {
            error = error.with_request_id(id);
        }
        error.stamped()
    }

    /// Signature first, then embedded status, then unknown.
    fn classify_fields(&self, name: Option<&str>, message: &str, status: Option<u16>) -> ErrorKind {
        self.detector
            .detect(name, message)
            .or_else(|| status.map(classify_by_status))
            .unwrap_or(ErrorKind::Unknown)
    }
}

fn looks_normalized(object: &Map<String, Value>) -> bool {
    (object.contains_key("kind") || object.contains_key("type")) && object.contains_key("message")
}

/// First non-empty string among `keys`.
fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First non-zero status code among `keys`, given as a number or a numeric string.
fn status_field(object: &Map<String, Value>, keys: &[&str]) -> Option<u16> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(|value| match value {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<u16>().ok(),
            _ => None,
        })
        .find(|status| *status != 0)
}

/// Details from `details` or `errors`. Entries may be detail objects or bare strings.
fn details_field(object: &Map<String, Value>) -> Vec<ErrorDetail> {
    let Some(entries) = ["details", "errors"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(message) => Some(ErrorDetail::new(message.clone())),
            Value::Object(_) => serde_json::from_value::<ErrorDetail>(entry.clone()).ok(),
            _ => None,
        })
        .collect()
}

fn default_parser() -> &'static ErrorParser {
    static PARSER: OnceLock<ErrorParser> = OnceLock::new();
    PARSER.get_or_init(ErrorParser::new)
}

/// Normalizes a failure with the default parser.
pub fn parse(failure: impl Into<Failure>) -> NormalizedError {
    default_parser().parse(failure)
}

/// Reads a non-2xx response and normalizes it with the default parser.
pub async fn parse_response(response: reqwest::Response) -> NormalizedError {
    parse(HttpFailure::from_response(response).await)
}

//! Error model and normalization.
//!
//! Every failure the storefront client sees, whether an HTTP error response, a
//! transport error or an arbitrary caught value, is converted into a single
//! [`NormalizedError`] with a closed [`ErrorKind`]. This module also carries the
//! helpers built on top of that model: validation accessors, formatting,
//! batch analysis and a bounded in-memory error log.

pub mod analysis;
pub mod classification;
pub mod detector;
pub mod helpers;
pub mod log;
pub mod normalized;
pub mod parser;

// Re-export main types for convenient access
pub use analysis::{
    group_by_kind, has_critical_errors, kind_frequency, most_frequent_kind, retryable_errors,
};
pub use classification::{classify_by_status, is_retryable, ErrorKind};
pub use detector::{SignatureDetector, SignatureMatch, SignaturePattern, SignatureTarget};
pub use helpers::{
    error_fields, field_errors, format_for_log, format_for_user, has_field_error,
    to_form_errors, to_json,
};
pub use log::{ErrorContext, ErrorLog, ErrorLogEntry, ErrorSink};
pub use normalized::{ErrorDetail, NormalizedError, DEFAULT_VALIDATION_CODE, GENERIC_SERVER_MESSAGE};
pub use parser::{
    parse, parse_response, ErrorParser, Failure, HttpFailure, NativeFailure,
    DEFAULT_ERROR_MESSAGE, DEFAULT_UNKNOWN_MESSAGE,
};

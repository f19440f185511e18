//! Validation accessors and formatting for [`NormalizedError`].

use std::collections::BTreeMap;

use super::normalized::{ErrorDetail, NormalizedError};

/// Details attached to `field`.
pub fn field_errors<'a>(error: &'a NormalizedError, field: &str) -> Vec<&'a ErrorDetail> {
    error
        .details()
        .iter()
        .filter(|detail| detail.field.as_deref() == Some(field))
        .collect()
}

pub fn has_field_error(error: &NormalizedError, field: &str) -> bool {
    error
        .details()
        .iter()
        .any(|detail| detail.field.as_deref() == Some(field))
}

/// Distinct field names, in the order they first appear.
pub fn error_fields(error: &NormalizedError) -> Vec<&str> {
    let mut fields: Vec<&str> = Vec::new();
    for field in error.details().iter().filter_map(|d| d.field.as_deref()) {
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    fields
}

/// Maps each field to the first message reported for it.
pub fn to_form_errors(error: &NormalizedError) -> BTreeMap<String, String> {
    let mut form = BTreeMap::new();
    for detail in error.details() {
        if let Some(field) = &detail.field {
            form.entry(field.clone())
                .or_insert_with(|| detail.message.clone());
        }
    }
    form
}

/// Text for display.
///
/// Validation errors list the offending fields; server errors append the
/// request id so support can trace them.
pub fn format_for_user(error: &NormalizedError) -> String {
    if error.is_validation_error() {
        let fields = error_fields(error);
        if !fields.is_empty() {
            return format!("Please check the following fields: {}", fields.join(", "));
        }
    }

    match error.request_id() {
        Some(id) if error.is_server_error() => format!("{} (ID: {})", error.user_message(), id),
        _ => error.user_message().to_string(),
    }
}

/// One-line form for logs: `[KIND] status message (request id)`.
pub fn format_for_log(error: &NormalizedError) -> String {
    let mut parts = vec![format!("[{}]", error.kind())];
    if let Some(status) = error.status_code() {
        parts.push(status.to_string());
    }
    if !error.message().is_empty() {
        parts.push(error.message().to_string());
    }
    if let Some(id) = error.request_id() {
        parts.push(format!("({})", id));
    }
    parts.join(" ")
}

/// Pretty-printed JSON.
pub fn to_json(error: &NormalizedError) -> serde_json::Result<String> {
    serde_json::to_string_pretty(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn signup_error() -> NormalizedError {
        NormalizedError::validation(
            "Validation failed",
            vec![
                ErrorDetail::new("Invalid email format").with_field("email"),
                ErrorDetail::new("Too short").with_field("password"),
                ErrorDetail::new("Must contain a digit").with_field("password"),
                ErrorDetail::new("Form expired"),
            ],
        )
    }

    #[test]
    fn test_field_errors() {
        let error = signup_error();
        assert_eq!(field_errors(&error, "password").len(), 2);
        assert!(field_errors(&error, "name").is_empty());
        assert!(has_field_error(&error, "email"));
        assert!(!has_field_error(&error, "name"));
    }

    #[test]
    fn test_error_fields_are_unique_in_first_seen_order() {
        assert_eq!(error_fields(&signup_error()), vec!["email", "password"]);
    }

    #[test]
    fn test_form_errors_keep_first_message() {
        let form = to_form_errors(&signup_error());
        assert_eq!(form.len(), 2);
        assert_eq!(form["password"], "Too short");
        assert_eq!(form["email"], "Invalid email format");
    }

    #[test]
    fn test_format_for_user() {
        assert_eq!(
            format_for_user(&signup_error()),
            "Please check the following fields: email, password"
        );

        let server = NormalizedError::server("db down", Some("r1".to_string()));
        assert_eq!(format_for_user(&server), "db down (ID: r1)");

        let missing = NormalizedError::new(ErrorKind::NotFound, "");
        assert_eq!(
            format_for_user(&missing),
            ErrorKind::NotFound.default_message()
        );
    }

    #[test]
    fn test_format_for_log() {
        let error = NormalizedError::new(ErrorKind::Server, "db down")
            .with_status(503)
            .with_request_id("r1");
        assert_eq!(format_for_log(&error), "[SERVER] 503 db down (r1)");

        let bare = NormalizedError::new(ErrorKind::Network, "offline");
        assert_eq!(format_for_log(&bare), "[NETWORK] offline");
    }

    #[test]
    fn test_to_json() {
        let error = NormalizedError::new(ErrorKind::Timeout, "slow");
        let json = to_json(&error).unwrap();
        assert!(json.contains("\"kind\": \"TIMEOUT\""));
        assert!(json.contains("\"retryable\": true"));
    }
}

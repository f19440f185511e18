//! Bounded in-memory error log.
//!
//! Components that observe failures report them to an [`ErrorSink`]. The
//! default sink, [`ErrorLog`], keeps the most recent entries in a ring buffer
//! that can be queried and exported as JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::classification::ErrorKind;
use super::normalized::NormalizedError;

/// Default number of entries an [`ErrorLog`] retains.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Where a failure happened.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_data: BTreeMap<String, Value>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_data.insert(key.into(), value.into());
        self
    }
}

/// A recorded failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub error: NormalizedError,
    pub context: ErrorContext,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ErrorLogEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(error: NormalizedError, context: ErrorContext) -> Self {
        Self {
            error,
            context,
            timestamp: Utc::now(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A destination for failure reports.
pub trait ErrorSink: Send + Sync {
    fn record(&self, entry: ErrorLogEntry);
}

/// Ring buffer of the most recent [`ErrorLogEntry`] values.
#[derive(Debug)]
pub struct ErrorLog {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorLogEntry>>,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ErrorLog {
    /// Creates a log holding at most `capacity` entries. A capacity of zero
    /// is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<ErrorLogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn entries_by_kind(&self, kind: ErrorKind) -> Vec<ErrorLogEntry> {
        self.lock()
            .iter()
            .filter(|entry| entry.error.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// All entries as a pretty-printed JSON array.
    pub fn export_json(&self) -> serde_json::Result<String> {
        let entries = self.entries();
        serde_json::to_string_pretty(&entries)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ErrorLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ErrorSink for ErrorLog {
    fn record(&self, entry: ErrorLogEntry) {
        debug!(
            kind = %entry.error.kind(),
            component = entry.context.component.as_deref().unwrap_or("-"),
            "recording error: {}",
            entry.error
        );

        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: ErrorKind, message: &str) -> ErrorLogEntry {
        ErrorLogEntry::new(
            NormalizedError::new(kind, message),
            ErrorContext::new().with_component("test"),
        )
    }

    #[test]
    fn test_records_in_order() {
        let log = ErrorLog::default();
        log.record(entry(ErrorKind::Network, "first"));
        log.record(entry(ErrorKind::Timeout, "second"));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].error.message(), "first");
        assert_eq!(entries[1].error.message(), "second");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = ErrorLog::new(3);
        for i in 0..5 {
            log.record(entry(ErrorKind::Unknown, &format!("e{}", i)));
        }

        let messages: Vec<String> = log
            .entries()
            .iter()
            .map(|e| e.error.message().to_string())
            .collect();
        assert_eq!(messages, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let log = ErrorLog::new(0);
        log.record(entry(ErrorKind::Unknown, "a"));
        log.record(entry(ErrorKind::Unknown, "b"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].error.message(), "b");
    }

    #[test]
    fn test_entries_by_kind_and_clear() {
        let log = ErrorLog::default();
        log.record(entry(ErrorKind::Network, "a"));
        log.record(entry(ErrorKind::Server, "b"));
        log.record(entry(ErrorKind::Network, "c"));

        assert_eq!(log.entries_by_kind(ErrorKind::Network).len(), 2);
        assert!(log.entries_by_kind(ErrorKind::Timeout).is_empty());

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_export_json() {
        let log = ErrorLog::default();
        log.record(
            ErrorLogEntry::new(
                NormalizedError::new(ErrorKind::NotFound, "missing").with_status(404),
                ErrorContext::new()
                    .with_component("fetch")
                    .with_action("GET /products/9999")
                    .with_data("attempt", 1),
            )
            .with_url("https://dummyjson.com/products/9999"),
        );

        let exported: Value = serde_json::from_str(&log.export_json().unwrap()).unwrap();
        let first = &exported[0];
        assert_eq!(first["error"]["kind"], "NOT_FOUND");
        assert_eq!(first["context"]["component"], "fetch");
        assert_eq!(first["context"]["additionalData"]["attempt"], 1);
        assert_eq!(first["url"], "https://dummyjson.com/products/9999");
        assert!(first["context"].get("userId").is_none());
    }
}

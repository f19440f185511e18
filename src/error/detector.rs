//! Signature detector for native error values.
//!
//! This module provides regex-based pattern matching over an error's name and
//! message to recognise transport failures (refused connections, failed
//! fetches, DNS errors) and timeouts (aborted requests, expired deadlines)
//! that carry no HTTP status.

use regex::Regex;

use super::ErrorKind;

/// Which part of a native error a pattern inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureTarget {
    /// The error's type name, e.g. `TypeError` or `TimeoutError`.
    Name,
    /// The error's message text.
    Message,
}

/// A pattern for recognising an error signature.
#[derive(Debug)]
pub struct SignaturePattern {
    /// The compiled regex pattern.
    regex: Regex,
    /// The part of the error the regex runs against.
    target: SignatureTarget,
    /// The kind to assign when this pattern matches.
    kind: ErrorKind,
    /// A human-readable description of what this pattern detects.
    description: String,
}

impl SignaturePattern {
    /// Creates a new signature pattern.
    ///
    /// # Panics
    /// Panics if the regex pattern is invalid. Use [`SignaturePattern::with_regex`]
    /// for patterns that are not compile-time constants.
    pub fn new(
        pattern: &str,
        target: SignatureTarget,
        kind: ErrorKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
            target,
            kind,
            description: description.into(),
        }
    }

    /// Creates a new signature pattern with a pre-compiled regex.
    pub fn with_regex(
        regex: Regex,
        target: SignatureTarget,
        kind: ErrorKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            regex,
            target,
            kind,
            description: description.into(),
        }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn target(&self) -> SignatureTarget {
        self.target
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Checks this pattern against an error's name and message.
    pub fn matches(&self, name: Option<&str>, message: &str) -> bool {
        match self.target {
            SignatureTarget::Name => name.is_some_and(|n| self.regex.is_match(n)),
            SignatureTarget::Message => self.regex.is_match(message),
        }
    }
}

/// The result of a successful signature match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureMatch {
    /// Kind assigned by the matching pattern.
    pub kind: ErrorKind,
    /// Description of the matching pattern.
    pub description: String,
}

/// Classifies native errors by their name and message.
///
/// Patterns are tried in order and the first match wins. The default set
/// checks network signatures before timeout signatures, so a failed fetch that
/// mentions a timeout is still reported as a network failure.
#[derive(Debug)]
pub struct SignatureDetector {
    patterns: Vec<SignaturePattern>,
}

impl Default for SignatureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureDetector {
    /// Creates a detector with the default network and timeout patterns.
    pub fn new() -> Self {
        Self {
            patterns: Self::default_patterns(),
        }
    }

    /// Creates a detector with custom patterns.
    pub fn with_patterns(patterns: Vec<SignaturePattern>) -> Self {
        Self { patterns }
    }

    fn default_patterns() -> Vec<SignaturePattern> {
        vec![
            // Network signatures
            SignaturePattern::new(
                r"^TypeError$",
                SignatureTarget::Name,
                ErrorKind::Network,
                "Fetch rejected with a TypeError",
            ),
            SignaturePattern::new(
                r"^(NetworkError|ConnectError|RequestError)$",
                SignatureTarget::Name,
                ErrorKind::Network,
                "Transport error type",
            ),
            SignaturePattern::new(
                r"(?i)fetch",
                SignatureTarget::Message,
                ErrorKind::Network,
                "Failed fetch",
            ),
            SignaturePattern::new(
                r"(?i)connection\s*(refused|reset|closed|aborted)",
                SignatureTarget::Message,
                ErrorKind::Network,
                "Connection error",
            ),
            SignaturePattern::new(
                r"(?i)\bdns\b|name\s+resolution|network\s*(error|failure|unreachable)",
                SignatureTarget::Message,
                ErrorKind::Network,
                "Network unreachable",
            ),
            // Timeout signatures
            SignaturePattern::new(
                r"^(AbortError|TimeoutError)$",
                SignatureTarget::Name,
                ErrorKind::Timeout,
                "Aborted or timed out request",
            ),
            SignaturePattern::new(
                r"(?i)time[sd]?[\s\-]?out",
                SignatureTarget::Message,
                ErrorKind::Timeout,
                "Timeout message",
            ),
            SignaturePattern::new(
                r"(?i)deadline\s*(exceeded|expired)",
                SignatureTarget::Message,
                ErrorKind::Timeout,
                "Deadline exceeded",
            ),
        ]
    }

    /// Adds a custom pattern after the existing ones.
    pub fn add_pattern(&mut self, pattern: SignaturePattern) {
        self.patterns.push(pattern);
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &[SignaturePattern] {
        &self.patterns
    }

    /// Returns the first pattern matching the given name and message.
    pub fn detect_match(&self, name: Option<&str>, message: &str) -> Option<SignatureMatch> {
        self.patterns
            .iter()
            .find(|pattern| pattern.matches(name, message))
            .map(|pattern| SignatureMatch {
                kind: pattern.kind,
                description: pattern.description.clone(),
            })
    }

    /// Returns the kind of the first matching pattern, if any.
    pub fn detect(&self, name: Option<&str>, message: &str) -> Option<ErrorKind> {
        self.detect_match(name, message).map(|m| m.kind)
    }
}

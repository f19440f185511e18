//! Aggregate views over batches of errors.

use std::collections::BTreeMap;

use super::classification::ErrorKind;
use super::normalized::NormalizedError;

/// Groups errors by kind, preserving input order within each group.
pub fn group_by_kind(errors: &[NormalizedError]) -> BTreeMap<ErrorKind, Vec<&NormalizedError>> {
    let mut groups: BTreeMap<ErrorKind, Vec<&NormalizedError>> = BTreeMap::new();
    for error in errors {
        groups.entry(error.kind()).or_default().push(error);
    }
    groups
}

/// Counts errors per kind.
pub fn kind_frequency(errors: &[NormalizedError]) -> BTreeMap<ErrorKind, usize> {
    let mut counts = BTreeMap::new();
    for error in errors {
        *counts.entry(error.kind()).or_insert(0) += 1;
    }
    counts
}

/// The most common kind. Ties go to the kind seen first.
pub fn most_frequent_kind(errors: &[NormalizedError]) -> Option<ErrorKind> {
    let counts = kind_frequency(errors);
    let mut best: Option<(ErrorKind, usize)> = None;

    for error in errors {
        let kind = error.kind();
        let count = counts.get(&kind).copied().unwrap_or_default();
        match best {
            Some((_, top)) if top >= count => {}
            _ => best = Some((kind, count)),
        }
    }

    best.map(|(kind, _)| kind)
}

/// True if any error is a server, authentication or authorization failure.
pub fn has_critical_errors(errors: &[NormalizedError]) -> bool {
    errors.iter().any(|error| error.kind().is_critical())
}

pub fn retryable_errors(errors: &[NormalizedError]) -> Vec<&NormalizedError> {
    errors.iter().filter(|error| error.is_retryable()).collect()
}

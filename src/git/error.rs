//! Git error classification
//!
//! Maps git2 errors onto short user-facing reasons and decides whether
//! retrying could help. Network trouble is transient; a missing repository,
//! bad credentials or a certificate problem will fail the same way again.

use git2::{Error, ErrorClass};

/// A classified git failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFailure {
    pub reason: String,
    pub transient: bool,
}

impl GitFailure {
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            transient: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Category {
    RepositoryNotFound,
    AuthenticationFailed,
    PermissionDenied,
    Network,
    Certificate,
    Other,
}

type Check = fn(&str, ErrorClass) -> bool;

const CLASSIFICATIONS: &[(Check, Category)] = &[
    (
        |msg, _| msg.contains("not found") || msg.contains("404"),
        Category::RepositoryNotFound,
    ),
    (
        |msg, _| msg.contains("authentication") || msg.contains("credentials"),
        Category::AuthenticationFailed,
    ),
    (
        |msg, _| msg.contains("permission denied") || msg.contains("access denied"),
        Category::PermissionDenied,
    ),
    (
        |msg, class| {
            class == ErrorClass::Http && (msg.contains("certificate") || msg.contains("ssl"))
        },
        Category::Certificate,
    ),
    (
        |msg, class| {
            class == ErrorClass::Net
                || msg.contains("connection")
                || msg.contains("network")
                || msg.contains("timed out")
                || msg.contains("timeout")
                || msg.contains("could not resolve")
                || msg.contains("early eof")
        },
        Category::Network,
    ),
];

fn categorize(msg: &str, class: ErrorClass) -> Category {
    CLASSIFICATIONS
        .iter()
        .find(|(check, _)| check(msg, class))
        .map_or(Category::Other, |(_, category)| *category)
}

/// Classify a git2 error
pub fn classify(err: &Error) -> GitFailure {
    let message = err.message().to_lowercase();
    let (reason, transient) = match categorize(&message, err.class()) {
        Category::RepositoryNotFound => ("repository not found".to_string(), false),
        Category::AuthenticationFailed => ("authentication failed".to_string(), false),
        Category::PermissionDenied => ("permission denied".to_string(), false),
        Category::Certificate => (format!("TLS error: {}", err.message()), false),
        Category::Network => (format!("network error: {}", err.message()), true),
        Category::Other => (err.message().to_string(), false),
    };
    GitFailure { reason, transient }
}

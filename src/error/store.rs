//! Registry document errors

use std::path::Path;

use super::FederationError;

/// Creates a malformed document error
pub fn malformed(path: &Path, reason: impl ToString) -> FederationError {
    FederationError::MalformedDocument {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates a document read error
pub fn read_failed(path: &Path, reason: impl ToString) -> FederationError {
    FederationError::DocumentReadFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates a document write error
pub fn write_failed(path: &Path, reason: impl ToString) -> FederationError {
    FederationError::WriteFailure {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

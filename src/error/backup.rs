//! Backup vault errors

use std::path::Path;

use super::FederationError;

/// Creates a snapshot failure error
pub fn snapshot_failed(path: &Path, reason: impl ToString) -> FederationError {
    FederationError::BackupFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates a backup not found error
pub fn not_found(name: impl Into<String>) -> FederationError {
    FederationError::BackupNotFound { name: name.into() }
}

/// Creates a generic backup operation error
pub fn operation_failed(message: impl Into<String>) -> FederationError {
    FederationError::BackupOperationFailed {
        message: message.into(),
    }
}

//! Provenance manifest errors

use std::path::Path;

use super::FederationError;

/// Creates a corrupt manifest error
pub fn corrupt(path: &Path, reason: impl ToString) -> FederationError {
    FederationError::ManifestCorrupt {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates a missing manifest error
pub fn missing(path: &Path) -> FederationError {
    FederationError::ManifestMissing {
        path: path.display().to_string(),
    }
}

/// Creates a manifest write error
pub fn write_failed(
    path: &Path,
    reason: impl ToString,
    registry_restored: bool,
) -> FederationError {
    FederationError::ManifestWriteFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
        registry_restored,
    }
}

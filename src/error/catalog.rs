//! Catalog errors

use std::path::Path;

use super::FederationError;

/// Creates a catalog not found error
pub fn not_found(path: &Path) -> FederationError {
    FederationError::CatalogNotFound {
        path: path.display().to_string(),
    }
}

/// Creates an invalid catalog error
pub fn invalid(path: impl Into<String>, reason: impl ToString) -> FederationError {
    FederationError::CatalogInvalid {
        path: path.into(),
        reason: reason.to_string(),
    }
}

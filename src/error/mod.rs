//! Error types and handling for mcp-federation
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Every variant belongs to one [`ErrorKind`], which decides the process exit
//! code and whether the registry file could have been touched:
//! - [`store`]: registry document errors
//! - [`backup`]: backup vault errors
//! - [`manifest`]: provenance manifest errors
//! - [`catalog`]: catalog loading errors
//!
//! Failures of individual acquisition actions are not errors at this level.
//! They are collected per entry by the runner (see `runner::ActionFailure`).

pub mod backup;
pub mod catalog;
pub mod manifest;
pub mod store;

use miette::Diagnostic;
use thiserror::Error;

/// Exit code for a fully successful run
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when some entries failed but a best-effort merge was persisted
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code for aborts that happened before anything was modified
pub const EXIT_ABORTED: i32 = 2;
/// Exit code when saving the document or the manifest failed
pub const EXIT_PERSISTENCE: i32 = 3;
/// Exit code for internal invariant violations
pub const EXIT_INVARIANT: i32 = 4;
/// Exit code after a user interrupt (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;

/// Error classification used for exit codes and user-facing reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Aborted before the registry document was touched
    PreMutation,
    /// Merge was computed but could not be committed
    Persistence,
    /// Programming error, should never happen
    Invariant,
    /// User interrupted the action phase
    Interrupted,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::PreMutation => EXIT_ABORTED,
            ErrorKind::Persistence => EXIT_PERSISTENCE,
            ErrorKind::Invariant => EXIT_INVARIANT,
            ErrorKind::Interrupted => EXIT_INTERRUPTED,
        }
    }
}

/// Main error type for mcp-federation operations
#[derive(Error, Diagnostic, Debug)]
pub enum FederationError {
    // Settings
    #[error("Configuration invalid: {message}")]
    #[diagnostic(
        code(mcp_federation::config::invalid),
        help("Pass the path explicitly with --config / --state-dir or set MCP_FEDERATION_HOME")
    )]
    ConfigurationInvalid { message: String },

    // Prerequisites
    #[error("Missing required programs: {programs}")]
    #[diagnostic(
        code(mcp_federation::prereq::missing),
        help("Install the listed programs and make sure they are on PATH")
    )]
    PrerequisiteMissing { programs: String },

    // Registry document
    #[error("Registry document is malformed: {path}: {reason}")]
    #[diagnostic(
        code(mcp_federation::store::malformed),
        help("Fix the file by hand or run `mcp-federation restore` to go back to a backup")
    )]
    MalformedDocument { path: String, reason: String },

    #[error("Failed to read registry document: {path}: {reason}")]
    #[diagnostic(code(mcp_federation::store::read_failed))]
    DocumentReadFailed { path: String, reason: String },

    #[error("Failed to write registry document: {path}: {reason}")]
    #[diagnostic(
        code(mcp_federation::store::write_failed),
        help("Check file permissions and free disk space")
    )]
    WriteFailure { path: String, reason: String },

    // Backups
    #[error("Failed to back up registry document to {path}: {reason}")]
    #[diagnostic(
        code(mcp_federation::backup::snapshot_failed),
        help("Nothing was modified. Check that the state directory is writable")
    )]
    BackupFailed { path: String, reason: String },

    #[error("Backup not found: {name}")]
    #[diagnostic(
        code(mcp_federation::backup::not_found),
        help("Run `mcp-federation backups list` to see available backups")
    )]
    BackupNotFound { name: String },

    #[error("Backup operation failed: {message}")]
    #[diagnostic(code(mcp_federation::backup::operation_failed))]
    BackupOperationFailed { message: String },

    // Manifest
    #[error("Installation manifest is corrupt: {path}: {reason}")]
    #[diagnostic(
        code(mcp_federation::manifest::corrupt),
        help("Restore the manifest from a copy or remove it and use `uninstall --force`")
    )]
    ManifestCorrupt { path: String, reason: String },

    #[error("No installation manifest found at {path}; refusing to guess which entries to remove")]
    #[diagnostic(
        code(mcp_federation::manifest::missing),
        help("Use `uninstall --force` to remove the reference entry set instead")
    )]
    ManifestMissing { path: String },

    #[error("Failed to write installation manifest: {path}: {reason}")]
    #[diagnostic(code(mcp_federation::manifest::write_failed))]
    ManifestWriteFailed {
        path: String,
        reason: String,
        registry_restored: bool,
    },

    // Catalog
    #[error("Catalog not found: {path}")]
    #[diagnostic(code(mcp_federation::catalog::not_found))]
    CatalogNotFound { path: String },

    #[error("Invalid catalog {path}: {reason}")]
    #[diagnostic(
        code(mcp_federation::catalog::invalid),
        help("Each entry needs a unique, non-empty name and a command")
    )]
    CatalogInvalid { path: String, reason: String },

    // Run control
    #[error("Interrupted during the action phase")]
    #[diagnostic(
        code(mcp_federation::run::interrupted),
        help("The registry document was not modified. Re-run install to finish")
    )]
    Interrupted,

    #[error("Invariant violation: {message}")]
    #[diagnostic(
        code(mcp_federation::invariant),
        help("This is a bug. The run was stopped before anything else was written")
    )]
    InvariantViolation { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(mcp_federation::io))]
    IoError { message: String },
}

impl FederationError {
    /// Classify this error for exit codes and reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            FederationError::WriteFailure { .. } | FederationError::ManifestWriteFailed { .. } => {
                ErrorKind::Persistence
            }
            FederationError::InvariantViolation { .. } => ErrorKind::Invariant,
            FederationError::Interrupted => ErrorKind::Interrupted,
            _ => ErrorKind::PreMutation,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Phase of the run that failed
    pub fn phase(&self) -> &'static str {
        match self {
            FederationError::ConfigurationInvalid { .. } => "configuration",
            FederationError::PrerequisiteMissing { .. } => "prerequisite check",
            FederationError::MalformedDocument { .. }
            | FederationError::DocumentReadFailed { .. } => "loading the registry document",
            FederationError::BackupFailed { .. } => "backup",
            FederationError::BackupNotFound { .. }
            | FederationError::BackupOperationFailed { .. } => "backup management",
            FederationError::ManifestCorrupt { .. } | FederationError::ManifestMissing { .. } => {
                "loading the installation manifest"
            }
            FederationError::CatalogNotFound { .. } | FederationError::CatalogInvalid { .. } => {
                "loading the catalog"
            }
            FederationError::Interrupted => "acquisition actions",
            FederationError::WriteFailure { .. } => "saving the registry document",
            FederationError::ManifestWriteFailed { .. } => "writing the installation manifest",
            FederationError::InvariantViolation { .. } => "merge",
            FederationError::IoError { .. } => "I/O",
        }
    }

    /// One line telling the user whether the registry document was changed
    pub fn registry_statement(&self) -> &'static str {
        match self {
            FederationError::WriteFailure { .. } => {
                "The merge was computed but not committed; the registry file is unchanged."
            }
            FederationError::ManifestWriteFailed {
                registry_restored: true,
                ..
            } => "The registry file was restored to its previous content.",
            FederationError::ManifestWriteFailed {
                registry_restored: false,
                ..
            } => "The registry file was updated but could not be rolled back; restore it from the latest backup.",
            _ => "The registry file was not modified.",
        }
    }
}

/// Creates an invariant violation error
pub fn invariant(message: impl Into<String>) -> FederationError {
    FederationError::InvariantViolation {
        message: message.into(),
    }
}

impl From<std::io::Error> for FederationError {
    fn from(err: std::io::Error) -> Self {
        FederationError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<inquire::InquireError> for FederationError {
    fn from(err: inquire::InquireError) -> Self {
        FederationError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, FederationError>;

//! High-level operations behind the CLI commands
//!
//! - install: the install state machine
//! - uninstall: manifest-driven (or forced) removal
//! - restore: put a backup back and reconcile the manifest
//! - status / validate: read-only reports
//!
//! Reports are rendered by the command layer.

pub mod install;
pub mod restore;
pub mod status;
pub mod uninstall;
pub mod validate;

pub use install::{InstallOperation, InstallOptions, InstallReport};
pub use restore::{RestoreOperation, RestoreReport};
pub use status::StatusReport;
pub use uninstall::{UninstallOperation, UninstallOptions, UninstallReport};
pub use validate::ValidateReport;

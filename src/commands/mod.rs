//! Command implementations for the mcp-federation CLI
//!
//! Each command resolves what it needs, runs an operation and renders the
//! report. Commands return the process exit code for runs that completed;
//! errors carry their own.

pub mod backups;
pub mod completions;
pub mod install;
pub mod restore;
pub mod status;
pub mod uninstall;
pub mod validate;
pub mod version;

//! Install operation
//!
//! Runs the install state machine: prerequisites, backup, acquisition
//! actions, merge, save, manifest, validation. The report carries what
//! happened to every desired entry.

pub mod orchestrator;
pub mod report;

pub use orchestrator::{InstallOperation, InstallOptions};
pub use report::InstallReport;

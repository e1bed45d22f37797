//! Result of an install run

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::{EXIT_PARTIAL, EXIT_SUCCESS};
use crate::merge::Disposition;
use crate::runner::ActionFailure;

/// An entry whose acquisition did not succeed and was left out of the merge
#[derive(Debug, Clone, PartialEq)]
pub struct FailedEntry {
    pub name: String,
    pub attempts: u32,
    pub failure: ActionFailure,
}

#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub dry_run: bool,
    pub catalog: String,
    /// Disposition of every desired name, in catalog order
    pub plan: Vec<(String, Disposition)>,
    pub inserted: BTreeSet<String>,
    pub retained: BTreeSet<String>,
    pub preexisting: BTreeSet<String>,
    pub failed: Vec<FailedEntry>,
    /// Inserted entries registered with placeholder credentials
    pub missing_env: Vec<(String, Vec<String>)>,
    pub warnings: Vec<String>,
    pub backup: Option<PathBuf>,
    pub baseline: Option<PathBuf>,
    pub registry_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl InstallReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_partial() {
            EXIT_PARTIAL
        } else {
            EXIT_SUCCESS
        }
    }

    pub fn failed_names(&self) -> BTreeSet<String> {
        self.failed.iter().map(|f| f.name.clone()).collect()
    }
}

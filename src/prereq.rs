//! Prerequisite check for acquisition actions
//!
//! Every program an action will spawn must be on PATH before anything is
//! backed up or modified.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::catalog::DesiredEntry;
use crate::error::{FederationError, Result};

/// Locates executables
pub trait Toolchain {
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Looks programs up on the real PATH
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let path = Path::new(program);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }
        which::which(program).ok()
    }
}

/// Programs the given entries' actions need
pub fn required_programs<'a>(
    entries: impl IntoIterator<Item = &'a DesiredEntry>,
) -> BTreeSet<String> {
    entries
        .into_iter()
        .filter_map(|e| e.acquisition.as_ref())
        .filter_map(|a| a.program())
        .map(str::to_string)
        .collect()
}

/// Fail with every missing program listed
pub fn check<'a>(
    entries: impl IntoIterator<Item = &'a DesiredEntry>,
    toolchain: &dyn Toolchain,
) -> Result<()> {
    let mut missing = Vec::new();
    for program in required_programs(entries) {
        match toolchain.locate(&program) {
            Some(found) => {
                tracing::debug!(program = %program, path = %found.display(), "found program");
            }
            None => missing.push(program),
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FederationError::PrerequisiteMissing {
            programs: missing.join(", "),
        })
    }
}

//! Executes one attempt of an acquisition
//!
//! The runner owns retries and scheduling; an executor performs a single
//! attempt. `SystemExecutor` is the real one, dispatching on the
//! acquisition kind.

use std::fs;
use std::path::{Component, Path};
use std::time::Duration;

use super::failure::ActionFailure;
use super::process::{self, CommandSpec};
use crate::catalog::{Acquisition, AcquisitionKind};
use crate::git;

pub trait ActionExecutor: Send + Sync {
    fn execute(&self, acquisition: &Acquisition) -> Result<(), ActionFailure>;
}

/// Reject descriptors that can never succeed
pub fn validate(acquisition: &Acquisition) -> Result<(), ActionFailure> {
    let invalid = |msg: String| Err(ActionFailure::InvalidDescriptor(msg));

    match acquisition.kind {
        AcquisitionKind::RegistryPackage | AcquisitionKind::VersionControlFetch
            if acquisition.target.trim().is_empty() =>
        {
            return invalid(format!("{} without a target", acquisition.kind.as_str()));
        }
        AcquisitionKind::LocalTemplate if acquisition.files.is_empty() => {
            return invalid("local_template without files".to_string());
        }
        _ => {}
    }

    if let Some(directory) = &acquisition.directory {
        if escapes(directory) {
            return invalid(format!(
                "directory '{directory}' must be relative and stay inside the servers directory"
            ));
        }
    }

    for (path, _) in &acquisition.files {
        if escapes(path) {
            return invalid(format!(
                "template path '{path}' must be relative and stay inside the entry directory"
            ));
        }
    }

    if acquisition.argv.first().is_some_and(|p| p.trim().is_empty()) {
        return invalid("empty program name in argv_template".to_string());
    }
    Ok(())
}

/// Empty, absolute, or climbing out through `..`
fn escapes(path: &str) -> bool {
    path.is_empty()
        || Path::new(path).components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        })
}

pub struct SystemExecutor {
    timeout: Duration,
}

impl SystemExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run_argv(&self, acquisition: &Acquisition) -> Result<(), ActionFailure> {
        if acquisition.argv.is_empty() {
            return Ok(());
        }
        process::run(CommandSpec {
            argv: &acquisition.argv,
            cwd: &acquisition.workdir,
            env: &acquisition.env,
            timeout: self.timeout,
        })
    }

    fn fetch(&self, acquisition: &Acquisition) -> Result<(), ActionFailure> {
        if let Some(parent) = acquisition.workdir.parent() {
            create_dir(parent)?;
        }
        let outcome = git::fetch_into(
            &acquisition.target,
            &acquisition.workdir,
            acquisition.branch.as_deref(),
        )
        .map_err(|f| ActionFailure::Fetch {
            url: acquisition.target.clone(),
            reason: f.reason,
            transient: f.transient,
        })?;
        tracing::debug!(entry = %acquisition.entry, ?outcome, "repository ready");
        Ok(())
    }

    fn write_template(&self, acquisition: &Acquisition) -> Result<(), ActionFailure> {
        create_dir(&acquisition.workdir)?;
        for (relative, contents) in &acquisition.files {
            let path = acquisition.workdir.join(relative);
            if let Some(parent) = path.parent() {
                create_dir(parent)?;
            }
            fs::write(&path, contents).map_err(|e| ActionFailure::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        tracing::debug!(
            entry = %acquisition.entry,
            files = acquisition.files.len(),
            "template written"
        );
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), ActionFailure> {
    fs::create_dir_all(dir).map_err(|e| ActionFailure::Io {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })
}

impl ActionExecutor for SystemExecutor {
    fn execute(&self, acquisition: &Acquisition) -> Result<(), ActionFailure> {
        validate(acquisition)?;
        match acquisition.kind {
            AcquisitionKind::RegistryPackage => {
                if !acquisition.argv.is_empty() {
                    create_dir(&acquisition.workdir)?;
                }
            }
            AcquisitionKind::VersionControlFetch => self.fetch(acquisition)?,
            AcquisitionKind::LocalTemplate => self.write_template(acquisition)?,
        }
        self.run_argv(acquisition)
    }
}

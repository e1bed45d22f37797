//! Install command implementation
//!
//! The installation process:
//! 1. Resolve the catalog against settings and environment
//! 2. Check prerequisites for the entries that need acquiring
//! 3. Back up the registry document
//! 4. Run acquisition actions on the worker pool (Ctrl-C stops new ones)
//! 5. Merge the successful entries, save once, write the manifest
//! 6. Validate and print the summary

use crate::cancel::CancelToken;
use crate::catalog::Catalog;
use crate::cli::InstallArgs;
use crate::config::Settings;
use crate::error::Result;
use crate::operations::{InstallOperation, InstallOptions};
use crate::prereq::SystemToolchain;
use crate::runner::SystemExecutor;
use crate::ui::{ActionProgressBar, display};

impl From<&InstallArgs> for InstallOptions {
    fn from(args: &InstallArgs) -> Self {
        Self {
            dry_run: args.dry_run,
        }
    }
}

pub fn run(settings: &Settings, catalog: &Catalog, args: &InstallArgs) -> Result<i32> {
    tracing::debug!(
        catalog = catalog.source(),
        registry = %settings.registry_path.display(),
        "install"
    );

    let executor = SystemExecutor::new(settings.action_timeout);
    let progress = ActionProgressBar::new();
    let mut operation = InstallOperation::new(
        settings,
        catalog,
        &executor,
        &SystemToolchain,
        InstallOptions::from(args),
    )
    .with_progress(&progress)
    .with_cancel(CancelToken::from_interrupts());

    let report = operation.execute().inspect_err(|e| {
        tracing::debug!(phase = ?operation.phase(), error = %e, "install stopped");
    })?;

    display::display_install(&report);
    Ok(report.exit_code())
}

//! Uninstall command implementation

use crate::catalog::Catalog;
use crate::cli::UninstallArgs;
use crate::config::Settings;
use crate::error::{EXIT_SUCCESS, Result};
use crate::operations::uninstall::confirm_uninstall;
use crate::operations::{UninstallOperation, UninstallOptions};
use crate::ui::display;

pub fn run(settings: &Settings, catalog: &Catalog, args: &UninstallArgs) -> Result<i32> {
    let reference_set = catalog.names();
    let operation = UninstallOperation::new(
        settings,
        &reference_set,
        UninstallOptions { force: args.force },
    );

    let plan = operation.plan()?;
    if plan.is_forced() {
        tracing::warn!(
            entries = plan.targets.len(),
            "removing the catalog's entries without a manifest"
        );
    }
    if !plan.is_empty() && !args.yes && !confirm_uninstall(&plan)? {
        println!("Uninstall cancelled.");
        return Ok(EXIT_SUCCESS);
    }

    let report = operation.apply(plan)?;
    display::display_uninstall(&report);
    Ok(EXIT_SUCCESS)
}

//! Restore command implementation

use inquire::Confirm;

use crate::cli::RestoreArgs;
use crate::config::Settings;
use crate::error::{EXIT_SUCCESS, Result};
use crate::operations::RestoreOperation;
use crate::ui::display;

pub fn run(settings: &Settings, args: &RestoreArgs) -> Result<i32> {
    let operation = RestoreOperation::new(settings);
    let plan = operation.plan(args.backup.as_deref())?;

    if !args.yes {
        let question = format!(
            "Replace {} with {} ({} entries)?",
            settings.registry_path.display(),
            plan.record.name,
            plan.entries
        );
        let proceed = Confirm::new(&question)
            .with_default(false)
            .with_help_message("The current document is backed up first")
            .prompt()?;
        if !proceed {
            println!("Restore cancelled.");
            return Ok(EXIT_SUCCESS);
        }
    }

    let report = operation.apply(plan)?;
    display::display_restore(&report);
    Ok(EXIT_SUCCESS)
}

//! Confirmation prompt for uninstall
//!
//! Shows exactly which entries will be removed before asking.

use console::Style;
use inquire::Confirm;

use super::{RemovalSource, UninstallPlan};
use crate::error::Result;

/// Print what the plan will do and ask the user to go ahead
pub fn confirm_uninstall(plan: &UninstallPlan) -> Result<bool> {
    let heading = Style::new().bold();
    match plan.source {
        RemovalSource::Manifest => {
            println!("\n{}", heading.apply_to("Entries installed by mcp-federation:"));
        }
        RemovalSource::ReferenceSet => {
            println!(
                "\n{}",
                Style::new()
                    .bold()
                    .yellow()
                    .apply_to("No installation manifest. Forced removal of every catalog entry found:")
            );
        }
    }
    for name in &plan.targets {
        let marker = if plan.modified.contains(name) {
            " (edited since install)"
        } else {
            ""
        };
        println!("  - {name}{marker}");
    }
    if !plan.preexisting.is_empty() {
        println!(
            "{} {}",
            heading.apply_to("Kept (registered before install):"),
            plan.preexisting.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    println!();

    let proceed = Confirm::new("Remove these entries?")
        .with_default(false)
        .with_help_message("A backup is taken first; `mcp-federation restore` undoes this")
        .prompt()?;
    Ok(proceed)
}

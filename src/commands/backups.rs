//! Backups command implementation

use inquire::Confirm;

use crate::backup::BackupVault;
use crate::cli::BackupsCommand;
use crate::config::Settings;
use crate::error::{EXIT_SUCCESS, Result};
use crate::ui::display;

pub fn run(settings: &Settings, command: &BackupsCommand) -> Result<i32> {
    let vault = BackupVault::new(settings.backup_dir(), &settings.registry_path);
    match command {
        BackupsCommand::List => display::display_backups(&vault.list()?),
        BackupsCommand::Clean { keep, yes } => clean(&vault, *keep, *yes)?,
    }
    Ok(EXIT_SUCCESS)
}

fn clean(vault: &BackupVault, keep: usize, yes: bool) -> Result<()> {
    let doomed = vault.prune_candidates(keep)?;
    if doomed.is_empty() {
        println!("Nothing to clean in {}.", vault.dir().display());
        return Ok(());
    }

    if !yes {
        for record in &doomed {
            println!("  - {}", record.name);
        }
        let proceed = Confirm::new(&format!("Delete {} backup(s)?", doomed.len()))
            .with_default(false)
            .with_help_message("The baseline backup is always kept")
            .prompt()?;
        if !proceed {
            println!("Nothing deleted.");
            return Ok(());
        }
    }

    let deleted = vault.prune(keep)?;
    println!("Deleted {} backup(s), kept the newest {keep}.", deleted.len());
    Ok(())
}

//! Summaries printed after each command
//!
//! stdout carries only these summaries; diagnostics go to stderr.

use std::collections::BTreeSet;

use console::Style;

use crate::backup::BackupRecord;
use crate::merge::Disposition;
use crate::operations::restore::ManifestChange;
use crate::operations::status::TrackedEntry;
use crate::operations::uninstall::RemovalSource;
use crate::operations::{
    InstallReport, RestoreReport, StatusReport, UninstallReport, ValidateReport,
};

fn heading(text: &str) {
    println!("{}", Style::new().bold().apply_to(text));
}

fn list(label: &str, names: &BTreeSet<String>) {
    if names.is_empty() {
        return;
    }
    println!(
        "{} {}",
        Style::new().bold().apply_to(label),
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    );
}

/// Dry-run plan: one line per desired name
pub fn display_plan(report: &InstallReport) {
    heading(&format!("Install plan ({})", report.catalog));
    for (name, disposition) in &report.plan {
        let style = match disposition {
            Disposition::Insert => Style::new().green(),
            Disposition::Retain => Style::new().cyan(),
            Disposition::Foreign => Style::new().dim(),
        };
        println!("  {:<28} {}", name, style.apply_to(disposition.label()));
    }
    println!(
        "\n{}",
        Style::new()
            .dim()
            .apply_to("Dry run: nothing was acquired, backed up or written.")
    );
}

pub fn display_install(report: &InstallReport) {
    if report.dry_run {
        display_plan(report);
        return;
    }

    heading(&format!("Installed {}", report.catalog));
    list("Added:", &report.inserted);
    list("Already installed:", &report.retained);
    list("Left alone (registered before):", &report.preexisting);

    if report.inserted.is_empty() && report.failed.is_empty() {
        println!("Nothing new to add.");
    }

    if !report.failed.is_empty() {
        println!(
            "\n{}",
            Style::new().red().bold().apply_to(format!(
                "{} entr(ies) failed and were not registered:",
                report.failed.len()
            ))
        );
        for failed in &report.failed {
            println!(
                "  {} {} after {} attempt(s): {}",
                Style::new().red().apply_to("✗"),
                failed.name,
                failed.attempts,
                failed.failure
            );
        }
        println!("The other entries were installed. Re-run install to retry the failed ones.");
    }

    if !report.missing_env.is_empty() {
        println!(
            "\n{}",
            Style::new()
                .yellow()
                .apply_to("Registered with placeholder credentials:")
        );
        for (name, vars) in &report.missing_env {
            println!("  {name}: set {}", vars.join(", "));
        }
    }

    for warning in &report.warnings {
        println!("{} {warning}", Style::new().yellow().apply_to("warning:"));
    }

    println!();
    println!("Registry: {}", report.registry_path.display());
    println!("Manifest: {}", report.manifest_path.display());
    if let Some(backup) = &report.backup {
        println!("Backup:   {}", backup.display());
    }
    if let Some(baseline) = &report.baseline {
        println!("Baseline: {}", baseline.display());
    }
}

pub fn display_uninstall(report: &UninstallReport) {
    match report.source {
        RemovalSource::Manifest => heading("Uninstalled (from the installation manifest)"),
        RemovalSource::ReferenceSet => println!(
            "{}",
            Style::new()
                .yellow()
                .bold()
                .apply_to("Forced uninstall: removed catalog entries without a manifest")
        ),
    }

    if report.removed.is_empty() {
        println!("No registered entries to remove.");
    }
    list("Removed:", &report.removed);
    list("Already gone:", &report.absent);
    list("Kept (registered before install):", &report.preexisting);
    if !report.modified.is_empty() {
        println!(
            "{} {}",
            Style::new().yellow().apply_to("Edited since install, removed anyway:"),
            report.modified.join(", ")
        );
    }
    if let Some(backup) = &report.backup {
        println!("Backup: {}", backup.display());
    }
    if report.manifest_removed {
        println!("Installation manifest removed.");
    }
}

pub fn display_restore(report: &RestoreReport) {
    heading(&format!(
        "Restored {} ({} entries)",
        report.restored_from.display(),
        report.entries
    ));
    if let Some(backup) = &report.backup {
        println!("Previous document saved to {}", backup.display());
    }
    match report.manifest {
        ManifestChange::Updated => println!("Installation manifest updated to match."),
        ManifestChange::Removed => {
            println!("Installation manifest removed: no installed entries remain.");
        }
        ManifestChange::Unchanged | ManifestChange::Absent => {}
    }
}

pub fn display_backups(records: &[BackupRecord]) {
    if records.is_empty() {
        println!("No backups.");
        return;
    }
    heading("Backups (newest first)");
    for record in records {
        let tag = if record.baseline { " [baseline]" } else { "" };
        println!(
            "  {}  {:>8} B  {}{}",
            record.modified_display(),
            record.size,
            record.name,
            Style::new().cyan().apply_to(tag)
        );
    }
}

fn tracked(label: &str, entries: &[TrackedEntry]) {
    if entries.is_empty() {
        return;
    }
    heading(label);
    for entry in entries {
        let state = match (entry.registered, entry.modified) {
            (false, _) => Style::new().red().apply_to("not registered"),
            (true, true) => Style::new().yellow().apply_to("registered, edited"),
            (true, false) => Style::new().green().apply_to("registered"),
        };
        println!("  {:<28} {state}", entry.name);
    }
}

pub fn display_status(report: &StatusReport) {
    match report.registered {
        Some(count) => println!(
            "Registry: {} ({count} entries)",
            report.registry_path.display()
        ),
        None => println!("Registry: {} (missing)", report.registry_path.display()),
    }

    match &report.manifest {
        Some(manifest) => {
            println!(
                "Manifest: {} (version {}, installed {})",
                report.manifest_path.display(),
                manifest.version,
                manifest.installation_date.format("%Y-%m-%d %H:%M:%S")
            );
            tracked("Installed by mcp-federation:", &report.installed);
            tracked("Registered before install:", &report.preexisting);
        }
        None => println!("Manifest: none (nothing recorded as installed)"),
    }

    match report.backups.first() {
        Some(latest) => println!(
            "Backups:  {} (latest {})",
            report.backups.len(),
            latest.name
        ),
        None => println!("Backups:  none"),
    }
}

pub fn display_validate(report: &ValidateReport) {
    for name in &report.registered {
        println!("  {} {name}", Style::new().green().apply_to("✓"));
    }
    for name in &report.missing {
        println!("  {} {name} is not registered", Style::new().red().apply_to("✗"));
    }
    for (name, command) in &report.unresolved {
        println!(
            "{} {name}: command `{command}` not found on PATH",
            Style::new().yellow().apply_to("warning:")
        );
    }
    if report.missing.is_empty() {
        println!("All {} entries registered.", report.registered.len());
    } else {
        println!(
            "{} of {} entries missing.",
            report.missing.len(),
            report.missing.len() + report.registered.len()
        );
    }
}

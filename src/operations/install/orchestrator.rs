//! Install state machine
//!
//! `Start -> PrereqsChecked -> BackedUp -> ActionsRun -> Merged -> Persisted
//! -> ManifestWritten -> Validated -> Done`. Any error ends the run in the
//! phase it happened in; the error kind says whether the registry document
//! was touched.
//!
//! The registry is written exactly once, after every action outcome is
//! known. Entries whose action failed are left out of that write and
//! reported; they never stop the others.

use std::collections::BTreeSet;

use crate::backup::{BackupVault, SnapshotLabel};
use crate::cancel::CancelToken;
use crate::catalog::{Acquisition, Catalog, DesiredEntry, ResolveContext};
use crate::config::Settings;
use crate::error::{FederationError, Result};
use crate::manifest::{Manifest, ManifestStore};
use crate::merge::{self, Disposition};
use crate::prereq::{self, Toolchain};
use crate::runner::{ActionExecutor, ActionOutcome, ActionProgress, ActionRunner, NoProgress};
use crate::store::{ConfigStore, Document};
use crate::transaction::RegistryTransaction;

use super::report::{FailedEntry, InstallReport};

/// Steps of an install run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Start,
    PrereqsChecked,
    BackedUp,
    ActionsRun,
    Merged,
    Persisted,
    ManifestWritten,
    Validated,
    Done,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Compute and report the plan without running anything
    pub dry_run: bool,
}

type EnvLookup<'a> = Box<dyn Fn(&str) -> Option<String> + 'a>;

pub struct InstallOperation<'a> {
    settings: &'a Settings,
    catalog: &'a Catalog,
    executor: &'a dyn ActionExecutor,
    toolchain: &'a dyn Toolchain,
    progress: &'a dyn ActionProgress,
    cancel: CancelToken,
    env: EnvLookup<'a>,
    options: InstallOptions,
    phase: Phase,
}

impl<'a> InstallOperation<'a> {
    pub fn new(
        settings: &'a Settings,
        catalog: &'a Catalog,
        executor: &'a dyn ActionExecutor,
        toolchain: &'a dyn Toolchain,
        options: InstallOptions,
    ) -> Self {
        Self {
            settings,
            catalog,
            executor,
            toolchain,
            progress: &NoProgress,
            cancel: CancelToken::new(),
            env: Box::new(|key| std::env::var(key).ok()),
            options,
            phase: Phase::Start,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ActionProgress) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Environment lookup used for `env_requirements`
    #[cfg(test)]
    #[must_use]
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Last phase reached
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, phase: Phase) {
        tracing::info!(from = ?self.phase, to = ?phase, "install phase");
        self.phase = phase;
    }

    pub fn execute(&mut self) -> Result<InstallReport> {
        let settings = self.settings;
        let store = ConfigStore::new(&settings.registry_path, &settings.registry_key);
        let manifests = ManifestStore::new(settings.manifest_path());
        let vault = BackupVault::new(settings.backup_dir(), &settings.registry_path);

        let desired = self
            .catalog
            .resolve(&ResolveContext::from_settings(settings), &*self.env);

        let original = store.load()?;
        let prior = manifests.load()?;
        let owned: BTreeSet<String> = prior
            .as_ref()
            .map(|m| m.installed_by_tool.clone())
            .unwrap_or_default();
        let existing = original
            .clone()
            .unwrap_or_else(|| Document::empty(&settings.registry_key));

        let plan = merge::plan(&existing, desired.iter().map(|d| d.name.as_str()), &owned);
        let mut report = InstallReport {
            dry_run: self.options.dry_run,
            catalog: format!("{} {}", self.catalog.name, self.catalog.version),
            registry_path: settings.registry_path.clone(),
            manifest_path: manifests.path().to_path_buf(),
            ..InstallReport::default()
        };
        if self.options.dry_run {
            report.plan = plan;
            return Ok(report);
        }

        // Entries someone else registered are neither acquired nor checked
        let selected: Vec<&DesiredEntry> = desired
            .iter()
            .zip(&plan)
            .filter(|(_, (_, disposition))| *disposition != Disposition::Foreign)
            .map(|(entry, _)| entry)
            .collect();
        report.plan = plan;

        prereq::check(selected.iter().copied(), self.toolchain)?;
        self.advance(Phase::PrereqsChecked);

        if let Some(document) = &original {
            report.baseline = vault.baseline(document)?.map(|r| r.path);
            let record = vault.snapshot(SnapshotLabel::PreInstall, document)?;
            report.backup = Some(record.path);
        }
        self.advance(Phase::BackedUp);

        report.failed = self.run_actions(&selected)?;
        self.advance(Phase::ActionsRun);

        let failed = report.failed_names();
        let outcome = merge::merge(
            &existing,
            desired
                .iter()
                .filter(|d| !failed.contains(&d.name))
                .map(|d| (d.name.clone(), d.to_value())),
            &owned,
        )?;
        self.advance(Phase::Merged);

        let mut transaction = RegistryTransaction::begin(&store)?;
        if outcome.inserted.is_empty() {
            tracing::info!("no new entries, registry document left as is");
        } else {
            transaction.save(&outcome.document)?;
        }
        self.advance(Phase::Persisted);

        let manifest = Manifest::accumulate(
            prior.as_ref(),
            &outcome.inserted,
            &outcome.preexisting,
            &outcome.document,
            self.catalog.names(),
        )
        .and_then(|manifest| manifests.write(&manifest));
        if let Err(err) = manifest {
            let restored = match transaction.rollback() {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("could not restore the registry document: {e}");
                    false
                }
            };
            transaction.commit();
            return Err(match err {
                FederationError::ManifestWriteFailed { path, reason, .. } => {
                    FederationError::ManifestWriteFailed {
                        path,
                        reason,
                        registry_restored: restored,
                    }
                }
                other => other,
            });
        }
        transaction.commit();
        self.advance(Phase::ManifestWritten);

        report.warnings = validate(&store, &outcome.document);
        self.advance(Phase::Validated);

        report.missing_env = desired
            .iter()
            .filter(|d| outcome.inserted.contains(&d.name) && !d.missing_env.is_empty())
            .map(|d| (d.name.clone(), d.missing_env.clone()))
            .collect();
        report.inserted = outcome.inserted;
        report.retained = outcome.retained;
        report.preexisting = outcome.preexisting;

        self.advance(Phase::Done);
        Ok(report)
    }

    /// Run the selected entries' actions and collect failures
    fn run_actions(&self, selected: &[&DesiredEntry]) -> Result<Vec<FailedEntry>> {
        let acquisitions: Vec<&Acquisition> = selected
            .iter()
            .filter_map(|d| d.acquisition.as_ref())
            .collect();

        let runner = ActionRunner::new(
            self.executor,
            self.settings.retry,
            self.settings.jobs,
            self.cancel.clone(),
        )
        .with_progress(self.progress);
        let outcomes = runner.perform_all(&acquisitions);

        if runner.is_cancelled() {
            tracing::warn!("interrupted, discarding action results");
            return Err(FederationError::Interrupted);
        }

        Ok(outcomes
            .into_iter()
            .filter_map(|(name, outcome)| match outcome {
                ActionOutcome::Failed { attempts, failure } => Some(FailedEntry {
                    name,
                    attempts,
                    failure,
                }),
                ActionOutcome::Succeeded { .. } | ActionOutcome::NotStarted => None,
            })
            .collect())
    }
}

/// Re-read the saved document and compare it with what was written
fn validate(store: &ConfigStore, expected: &Document) -> Vec<String> {
    let mut warnings = Vec::new();
    let reloaded = match store.load() {
        Ok(Some(document)) => document,
        Ok(None) if expected.is_empty() => return warnings,
        Ok(None) => {
            warnings.push(format!(
                "{} is missing after install",
                store.path().display()
            ));
            return warnings;
        }
        Err(e) => {
            warnings.push(format!("could not re-read the registry document: {e}"));
            return warnings;
        }
    };

    if reloaded.len() < expected.len() {
        warnings.push(format!(
            "expected at least {} registered entries, found {}",
            expected.len(),
            reloaded.len()
        ));
    }
    for name in expected.names() {
        if !reloaded.contains(&name) {
            warnings.push(format!("entry '{name}' is not registered"));
        }
    }
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    warnings
}

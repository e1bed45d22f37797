//! Uninstall operation
//!
//! Mirror of install: load manifest, back up, remove exactly the
//! tool-installed names, save, delete the manifest. Without a manifest
//! nothing is removed unless the caller forces removal of the catalog's
//! reference set, which is reported as such.
//!
//! Planning and applying are separate so the command can show the plan and
//! ask before anything is written.

pub mod confirmation;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::backup::{BackupVault, SnapshotLabel};
use crate::config::Settings;
use crate::error::{self, FederationError, Result};
use crate::manifest::ManifestStore;
use crate::merge;
use crate::store::ConfigStore;
use crate::transaction::RegistryTransaction;

pub use confirmation::confirm_uninstall;

#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Fall back to the reference set when there is no manifest
    pub force: bool,
}

/// Where the names to remove came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalSource {
    Manifest,
    /// Forced removal without a manifest
    ReferenceSet,
}

#[derive(Debug, Clone)]
pub struct UninstallPlan {
    pub source: RemovalSource,
    /// Registered names that will be removed
    pub targets: BTreeSet<String>,
    /// Names the manifest owns that are no longer registered
    pub absent: BTreeSet<String>,
    /// Names recorded as preexisting; never removed
    pub preexisting: BTreeSet<String>,
    /// Targets whose value changed since install
    pub modified: Vec<String>,
}

impl UninstallPlan {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn is_forced(&self) -> bool {
        self.source == RemovalSource::ReferenceSet
    }
}

#[derive(Debug, Clone)]
pub struct UninstallReport {
    pub source: RemovalSource,
    pub removed: BTreeSet<String>,
    pub absent: BTreeSet<String>,
    pub preexisting: BTreeSet<String>,
    pub modified: Vec<String>,
    pub backup: Option<PathBuf>,
    pub manifest_removed: bool,
}

pub struct UninstallOperation<'a> {
    settings: &'a Settings,
    reference_set: &'a [String],
    options: UninstallOptions,
}

impl<'a> UninstallOperation<'a> {
    /// `reference_set` is only used for forced removal without a manifest
    pub fn new(
        settings: &'a Settings,
        reference_set: &'a [String],
        options: UninstallOptions,
    ) -> Self {
        Self {
            settings,
            reference_set,
            options,
        }
    }

    fn store(&self) -> ConfigStore {
        ConfigStore::new(&self.settings.registry_path, &self.settings.registry_key)
    }

    fn manifests(&self) -> ManifestStore {
        ManifestStore::new(self.settings.manifest_path())
    }

    /// Work out what would be removed; writes nothing
    pub fn plan(&self) -> Result<UninstallPlan> {
        let manifests = self.manifests();
        let manifest = manifests.load()?;
        let live = self.store().load_or_empty()?;

        let (source, owned, preexisting, modified) = match &manifest {
            Some(manifest) => (
                RemovalSource::Manifest,
                manifest.installed_by_tool.clone(),
                manifest.preexisting.clone(),
                manifest.modified_since_install(&live),
            ),
            None if self.options.force => {
                tracing::warn!("no manifest, forcing removal of the reference set");
                (
                    RemovalSource::ReferenceSet,
                    self.reference_set.iter().cloned().collect(),
                    BTreeSet::new(),
                    Vec::new(),
                )
            }
            None => return Err(error::manifest::missing(manifests.path())),
        };

        let (targets, absent): (BTreeSet<String>, BTreeSet<String>) =
            owned.into_iter().partition(|name| live.contains(name));
        Ok(UninstallPlan {
            source,
            targets,
            absent,
            preexisting,
            modified,
        })
    }

    /// Back up, remove the planned names, save, and clean up the manifest
    pub fn apply(&self, plan: UninstallPlan) -> Result<UninstallReport> {
        let store = self.store();
        let manifests = self.manifests();
        let vault = BackupVault::new(self.settings.backup_dir(), &self.settings.registry_path);

        // The document may have changed while the plan was shown
        let current = store.load()?;
        let mut transaction = RegistryTransaction::begin(&store)?;
        let mut backup = None;
        let mut removed = BTreeSet::new();
        let mut absent = plan.absent;

        if let Some(document) = current.as_ref().filter(|_| !plan.targets.is_empty()) {
            let (present, gone): (BTreeSet<String>, BTreeSet<String>) = plan
                .targets
                .iter()
                .cloned()
                .partition(|name| document.contains(name));
            for name in &gone {
                tracing::info!(entry = %name, "already removed since planning");
            }
            absent.extend(gone);

            if !present.is_empty() {
                vault.baseline(document)?;
                backup = Some(vault.snapshot(SnapshotLabel::PreUninstall, document)?.path);

                let outcome = merge::remove(document, &present);
                if outcome.removed != present {
                    return Err(error::invariant("removal missed a registered entry"));
                }
                transaction.save(&outcome.document)?;
                removed = outcome.removed;
            }
        } else {
            absent.extend(plan.targets);
        }

        let mut manifest_removed = false;
        if plan.source == RemovalSource::Manifest {
            match manifests.remove() {
                Ok(was_present) => manifest_removed = was_present,
                Err(err) => {
                    let restored = transaction.rollback().is_ok();
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
            }
        }
        transaction.commit();

        for name in &removed {
            tracing::info!(entry = %name, "removed registry entry");
        }
        Ok(UninstallReport {
            source: plan.source,
            removed,
            absent,
            preexisting: plan.preexisting,
            modified: plan.modified,
            backup,
            manifest_removed,
        })
    }

    /// Plan and apply without asking
    pub fn execute(&self) -> Result<UninstallReport> {
        let plan = self.plan()?;
        self.apply(plan)
    }
}

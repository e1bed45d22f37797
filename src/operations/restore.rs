//! Restore the registry document from a backup
//!
//! The backup must parse as a registry document before anything is
//! written. The current document is snapshotted first so a restore can be
//! undone the same way. Afterwards the manifest is reconciled with the
//! restored registry: owned names that are gone stop being owned, and a
//! manifest with nothing left to own is deleted.

use std::path::PathBuf;

use crate::backup::{BackupRecord, BackupVault, SnapshotLabel};
use crate::config::Settings;
use crate::error::{self, FederationError, Result};
use crate::manifest::ManifestStore;
use crate::store::{ConfigStore, Document};
use crate::transaction::RegistryTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestChange {
    Unchanged,
    Updated,
    Removed,
    /// There was no manifest to reconcile
    Absent,
}

#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub record: BackupRecord,
    /// Entries in the backup
    pub entries: usize,
    document: Document,
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub restored_from: PathBuf,
    pub entries: usize,
    /// Snapshot of the document that was replaced
    pub backup: Option<PathBuf>,
    pub manifest: ManifestChange,
}

pub struct RestoreOperation<'a> {
    settings: &'a Settings,
}

impl<'a> RestoreOperation<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    fn vault(&self) -> BackupVault {
        BackupVault::new(self.settings.backup_dir(), &self.settings.registry_path)
    }

    /// Pick and read the backup to restore; `None` means the latest one
    pub fn plan(&self, name: Option<&str>) -> Result<RestorePlan> {
        let vault = self.vault();
        let record = match name {
            Some(name) => vault.find(name)?,
            None => vault
                .latest()?
                .ok_or_else(|| error::backup::not_found("(latest): no backups exist"))?,
        };
        let document = vault.read(&record, &self.settings.registry_key)?;
        Ok(RestorePlan {
            record,
            entries: document.len(),
            document,
        })
    }

    pub fn apply(&self, plan: RestorePlan) -> Result<RestoreReport> {
        let store = ConfigStore::new(&self.settings.registry_path, &self.settings.registry_key);
        let manifests = ManifestStore::new(self.settings.manifest_path());
        let vault = self.vault();

        let current = store.load()?;
        let manifest = manifests.load()?;

        let backup = match &current {
            Some(document) => {
                vault.baseline(document)?;
                Some(vault.snapshot(SnapshotLabel::PreRestore, document)?.path)
            }
            None => None,
        };

        let mut transaction = RegistryTransaction::begin(&store)?;
        transaction.save(&plan.document)?;
        tracing::info!(from = %plan.record.name, "registry document restored");

        let change = match manifest {
            None => Ok(ManifestChange::Absent),
            Some(mut manifest) => {
                let before = manifest.clone();
                manifest.reconcile(&plan.document);
                if manifest.installed_by_tool.is_empty() {
                    manifests.remove().map(|_| ManifestChange::Removed)
                } else if manifest == before {
                    Ok(ManifestChange::Unchanged)
                } else {
                    manifests.write(&manifest).map(|()| ManifestChange::Updated)
                }
            }
        };

        let change = match change {
            Ok(change) => change,
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
        };
        transaction.commit();

        Ok(RestoreReport {
            restored_from: plan.record.path,
            entries: plan.entries,
            backup,
            manifest: change,
        })
    }
}

//! Snapshot of what is installed, read-only

use std::path::PathBuf;

use crate::backup::{BackupRecord, BackupVault};
use crate::config::Settings;
use crate::error::Result;
use crate::manifest::{Manifest, ManifestStore};
use crate::store::{ConfigStore, Document};

/// A manifest name and whether it is still registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntry {
    pub name: String,
    pub registered: bool,
    /// Value differs from the one recorded at install
    pub modified: bool,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub registry_path: PathBuf,
    /// Registered entry count, `None` when the document does not exist
    pub registered: Option<usize>,
    pub manifest_path: PathBuf,
    pub manifest: Option<Manifest>,
    pub installed: Vec<TrackedEntry>,
    pub preexisting: Vec<TrackedEntry>,
    pub backups: Vec<BackupRecord>,
}

pub fn status(settings: &Settings) -> Result<StatusReport> {
    let store = ConfigStore::new(&settings.registry_path, &settings.registry_key);
    let manifests = ManifestStore::new(settings.manifest_path());
    let vault = BackupVault::new(settings.backup_dir(), &settings.registry_path);

    let document = store.load()?;
    let manifest = manifests.load()?;
    let live = document
        .clone()
        .unwrap_or_else(|| Document::empty(&settings.registry_key));

    let (installed, preexisting) = match &manifest {
        Some(m) => {
            let modified = m.modified_since_install(&live);
            let track = |names: &std::collections::BTreeSet<String>| {
                names
                    .iter()
                    .map(|name| TrackedEntry {
                        name: name.clone(),
                        registered: live.contains(name),
                        modified: modified.contains(name),
                    })
                    .collect::<Vec<_>>()
            };
            (track(&m.installed_by_tool), track(&m.preexisting))
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(StatusReport {
        registry_path: settings.registry_path.clone(),
        registered: document.as_ref().map(Document::len),
        manifest_path: manifests.path().to_path_buf(),
        manifest,
        installed,
        preexisting,
        backups: vault.list()?,
    })
}

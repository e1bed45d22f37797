//! Installation provenance manifest
//!
//! The manifest records which registry entries this tool inserted and which
//! were already there. It is the only source of truth for uninstall and is
//! always re-read from disk, never recomputed.
//!
//! Successive installs accumulate: names the previous manifest owned that
//! are still registered stay owned, and `preexisting` keeps every name ever
//! found registered by someone else while it remains live. The file itself
//! is replaced atomically on each write.

mod serialization;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{self, Result, invariant};
use crate::store::Document;

/// Version stamped into manifests written by this build
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,

    #[serde(
        serialize_with = "serialization::serialize_date",
        deserialize_with = "serialization::deserialize_date"
    )]
    pub installation_date: DateTime<FixedOffset>,

    #[serde(alias = "installed_by_us", default)]
    pub installed_by_tool: BTreeSet<String>,

    #[serde(alias = "already_existed", default)]
    pub preexisting: BTreeSet<String>,

    /// Catalog names used by the run that wrote this manifest
    #[serde(
        alias = "claude_desktop_mcps",
        default,
        deserialize_with = "serialization::deserialize_catalog"
    )]
    pub catalog: Vec<String>,

    /// blake3 of each tool-installed entry value at install time
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fingerprints: BTreeMap<String, String>,
}

impl Manifest {
    /// Build a manifest, rejecting overlapping classifications
    pub fn record(
        preexisting: BTreeSet<String>,
        installed: BTreeSet<String>,
        version: impl Into<String>,
        catalog: Vec<String>,
    ) -> Result<Self> {
        let manifest = Self {
            version: version.into(),
            installation_date: Local::now().fixed_offset(),
            installed_by_tool: installed,
            preexisting,
            catalog,
            fingerprints: BTreeMap::new(),
        };
        manifest.check_disjoint()?;
        Ok(manifest)
    }

    /// Fold this run's merge result into the previous manifest
    ///
    /// `inserted` are the names this run added; `found` are desired names
    /// that were already registered and not owned by a previous run.
    pub fn accumulate(
        prior: Option<&Manifest>,
        inserted: &BTreeSet<String>,
        found: &BTreeSet<String>,
        live: &Document,
        catalog: Vec<String>,
    ) -> Result<Self> {
        let live_names = live.names();

        let mut installed = inserted.clone();
        let mut preexisting = found.clone();
        if let Some(prior) = prior {
            installed.extend(prior.installed_by_tool.intersection(&live_names).cloned());
            preexisting.extend(prior.preexisting.iter().cloned());
        }
        let preexisting: BTreeSet<String> = preexisting
            .intersection(&live_names)
            .filter(|name| !installed.contains(*name))
            .cloned()
            .collect();

        let mut manifest = Self::record(preexisting, installed, TOOL_VERSION, catalog)?;

        for name in &manifest.installed_by_tool {
            let kept = prior
                .filter(|_| !inserted.contains(name))
                .and_then(|p| p.fingerprints.get(name).cloned());
            let print = kept.or_else(|| live.entry(name).map(fingerprint));
            if let Some(print) = print {
                manifest.fingerprints.insert(name.clone(), print);
            }
        }
        Ok(manifest)
    }

    /// Reject a manifest whose two classifications overlap
    pub fn check_disjoint(&self) -> Result<()> {
        let overlap: Vec<&String> = self
            .installed_by_tool
            .intersection(&self.preexisting)
            .collect();
        if overlap.is_empty() {
            Ok(())
        } else {
            Err(invariant(format!(
                "names classified as both installed and preexisting: {}",
                overlap
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    /// Tool-owned names whose registered value differs from the recorded one
    pub fn modified_since_install(&self, live: &Document) -> Vec<String> {
        self.installed_by_tool
            .iter()
            .filter(|name| match (self.fingerprints.get(*name), live.entry(name)) {
                (Some(recorded), Some(value)) => *recorded != fingerprint(value),
                _ => false,
            })
            .cloned()
            .collect()
    }

    /// Drop owned names that are no longer registered
    pub fn reconcile(&mut self, live: &Document) {
        let live_names = live.names();
        self.installed_by_tool.retain(|n| live_names.contains(n));
        self.preexisting.retain(|n| live_names.contains(n));
        self.fingerprints
            .retain(|n, _| self.installed_by_tool.contains(n));
    }
}

/// Content fingerprint of one registry entry
pub fn fingerprint(value: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

/// Reads and writes the manifest file inside the state directory
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Manifest>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(error::manifest::corrupt(&self.path, e)),
        };
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| error::manifest::corrupt(&self.path, e))?;
        Ok(Some(manifest))
    }

    /// Atomically replace the manifest file
    pub fn write(&self, manifest: &Manifest) -> Result<()> {
        manifest.check_disjoint()?;

        let fail = |e: &dyn std::fmt::Display| error::manifest::write_failed(&self.path, e, false);
        let json = serde_json::to_string_pretty(manifest).map_err(|e| fail(&e))?;
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| fail(&e))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| fail(&e))?;
        temp.write_all(json.as_bytes())
            .and_then(|()| temp.write_all(b"\n"))
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| fail(&e))?;
        temp.persist(&self.path).map_err(|e| fail(&e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            installed = manifest.installed_by_tool.len(),
            preexisting = manifest.preexisting.len(),
            "manifest written"
        );
        Ok(())
    }

    /// Delete the manifest and the state directory if nothing else is left in it
    ///
    /// Returns whether a manifest was removed.
    pub fn remove(&self) -> Result<bool> {
        let removed = match fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(error::manifest::write_failed(&self.path, e, true)),
        };
        if let Some(parent) = self.path.parent() {
            // Fails harmlessly when backups or other files remain
            if fs::remove_dir(parent).is_ok() {
                tracing::debug!(dir = %parent.display(), "removed empty state directory");
            }
        }
        Ok(removed)
    }
}

//! Backup vault for the registry document
//!
//! Every mutating run snapshots the document first. Snapshots are named
//! `<stem>_<label>_<YYYYmmdd_HHMMSS>.json`, created with create-new semantics
//! and marked read-only. The vault never deletes anything on its own; the
//! only removal path is [`BackupVault::prune`], which the `backups clean`
//! command calls after the user confirms.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::error::{self, Result};
use crate::store::Document;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const BASELINE_LABEL: &str = "baseline";
const MAX_COLLISIONS: u32 = 100;

/// Why a snapshot was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLabel {
    PreInstall,
    PreUninstall,
    PreRestore,
}

impl SnapshotLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotLabel::PreInstall => "pre_install",
            SnapshotLabel::PreUninstall => "pre_uninstall",
            SnapshotLabel::PreRestore => "pre_restore",
        }
    }
}

/// One file in the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
    pub baseline: bool,
}

impl BackupRecord {
    fn from_path(path: PathBuf, baseline_name: &str) -> Option<Self> {
        let meta = fs::metadata(&path).ok()?;
        let name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            baseline: name == baseline_name,
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: meta.len(),
            name,
            path,
        })
    }

    /// Modification time formatted for display
    pub fn modified_display(&self) -> String {
        let time: DateTime<Local> = self.modified.into();
        time.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct BackupVault {
    dir: PathBuf,
    stem: String,
}

impl BackupVault {
    /// Vault in `dir` for backups of the document at `document_path`
    pub fn new(dir: impl Into<PathBuf>, document_path: &Path) -> Self {
        let stem = document_path
            .file_stem()
            .map_or_else(|| "registry".to_string(), |s| s.to_string_lossy().into_owned());
        Self {
            dir: dir.into(),
            stem,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn baseline_name(&self) -> String {
        format!("{}_{BASELINE_LABEL}.json", self.stem)
    }

    /// Copy the document into a new timestamped backup
    pub fn snapshot(&self, label: SnapshotLabel, document: &Document) -> Result<BackupRecord> {
        self.snapshot_at(label, document, Local::now())
    }

    fn snapshot_at(
        &self,
        label: SnapshotLabel,
        document: &Document,
        now: DateTime<Local>,
    ) -> Result<BackupRecord> {
        let base = format!(
            "{}_{}_{}",
            self.stem,
            label.as_str(),
            now.format(TIMESTAMP_FORMAT)
        );
        let contents = document.to_json_pretty();

        for n in 0..MAX_COLLISIONS {
            let name = if n == 0 {
                format!("{base}.json")
            } else {
                format!("{base}_{n}.json")
            };
            if let Some(record) = self.write_new(&name, contents.as_bytes())? {
                tracing::info!(backup = %record.path.display(), "registry document backed up");
                return Ok(record);
            }
        }

        Err(error::backup::snapshot_failed(
            &self.dir.join(format!("{base}.json")),
            "too many backups with the same timestamp",
        ))
    }

    /// Write the one-time copy of the document as first seen
    ///
    /// Returns `None` when the baseline already exists.
    pub fn baseline(&self, document: &Document) -> Result<Option<BackupRecord>> {
        let name = self.baseline_name();
        let record = self.write_new(&name, document.to_json_pretty().as_bytes())?;
        if let Some(ref record) = record {
            tracing::info!(backup = %record.path.display(), "baseline backup written");
        }
        Ok(record)
    }

    /// Create `name` with create-new semantics; `None` when it already exists
    fn write_new(&self, name: &str, contents: &[u8]) -> Result<Option<BackupRecord>> {
        let path = self.dir.join(name);
        fs::create_dir_all(&self.dir).map_err(|e| error::backup::snapshot_failed(&path, e))?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(error::backup::snapshot_failed(&path, e)),
        };
        file.write_all(contents)
            .and_then(|()| file.sync_all())
            .map_err(|e| error::backup::snapshot_failed(&path, e))?;
        drop(file);

        let mut perms = fs::metadata(&path)
            .map_err(|e| error::backup::snapshot_failed(&path, e))?
            .permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).map_err(|e| error::backup::snapshot_failed(&path, e))?;

        BackupRecord::from_path(path.clone(), &self.baseline_name())
            .map(Some)
            .ok_or_else(|| error::backup::snapshot_failed(&path, "backup vanished after write"))
    }

    /// All backups, newest first
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(error::backup::operation_failed(format!(
                    "failed to read {}: {e}",
                    self.dir.display()
                )));
            }
        };

        let prefix = format!("{}_", self.stem);
        let baseline_name = self.baseline_name();
        let mut records: Vec<BackupRecord> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.file_name().is_some_and(|n| {
                        let n = n.to_string_lossy();
                        n.starts_with(&prefix) && n.ends_with(".json")
                    })
            })
            .filter_map(|path| BackupRecord::from_path(path, &baseline_name))
            .collect();

        records.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(records)
    }

    /// Most recently created timestamped backup, falling back to the baseline
    pub fn latest(&self) -> Result<Option<BackupRecord>> {
        let records = self.list()?;
        let latest = records.iter().find(|r| !r.baseline).cloned();
        Ok(latest.or_else(|| records.into_iter().next()))
    }

    /// Find a backup by file name, with or without the `.json` extension
    pub fn find(&self, name: &str) -> Result<BackupRecord> {
        let wanted = if Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            name.to_string()
        } else {
            format!("{name}.json")
        };
        self.list()?
            .into_iter()
            .find(|r| r.name == wanted)
            .ok_or_else(|| error::backup::not_found(name))
    }

    /// Records `prune` would delete, keeping the newest `keep` and the baseline
    pub fn prune_candidates(&self, keep: usize) -> Result<Vec<BackupRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| !r.baseline)
            .skip(keep)
            .collect())
    }

    /// Delete all but the newest `keep` timestamped backups
    pub fn prune(&self, keep: usize) -> Result<Vec<BackupRecord>> {
        let doomed = self.prune_candidates(keep)?;
        for record in &doomed {
            remove_read_only(&record.path).map_err(|e| {
                error::backup::operation_failed(format!(
                    "failed to delete {}: {e}",
                    record.path.display()
                ))
            })?;
            tracing::debug!(backup = %record.name, "deleted backup");
        }
        Ok(doomed)
    }

    /// Parse a backup back into a document
    pub fn read(&self, record: &BackupRecord, registry_key: &str) -> Result<Document> {
        let text = fs::read_to_string(&record.path)
            .map_err(|e| error::store::read_failed(&record.path, e))?;
        Document::parse(&text, registry_key)
            .map_err(|reason| error::store::malformed(&record.path, reason))
    }
}

#[cfg(windows)]
#[allow(clippy::permissions_set_readonly_false)]
fn remove_read_only(path: &Path) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(false);
    fs::set_permissions(path, perms)?;
    fs::remove_file(path)
}

#[cfg(not(windows))]
fn remove_read_only(path: &Path) -> std::io::Result<()> {
    fs::remove_file(path)
}

//! Registry document storage
//!
//! `ConfigStore` is the only component that reads or writes the registry
//! document on disk. Writes go to a temporary file in the same directory
//! which is then renamed over the target, so a crash mid-write leaves
//! either the old or the new document, never a truncated one.

pub mod document;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{self, Result};

pub use document::Document;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    registry_key: String,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, registry_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            registry_key: registry_key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, `None` when the file does not exist
    ///
    /// A file that exists but does not parse is `MalformedDocument` and is
    /// never replaced. A whitespace-only file holds nothing and reads as empty.
    pub fn load(&self) -> Result<Option<Document>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(error::store::read_failed(&self.path, e)),
        };

        if text.trim().is_empty() {
            tracing::debug!(path = %self.path.display(), "registry document is empty");
            return Ok(Some(Document::empty(&self.registry_key)));
        }

        let document = Document::parse(&text, &self.registry_key)
            .map_err(|reason| error::store::malformed(&self.path, reason))?;
        tracing::debug!(
            path = %self.path.display(),
            entries = document.len(),
            other_keys = document.foreign_keys().count(),
            "loaded registry document"
        );
        Ok(Some(document))
    }

    /// Load the document, or an empty one when the file does not exist
    pub fn load_or_empty(&self) -> Result<Document> {
        Ok(self
            .load()?
            .unwrap_or_else(|| Document::empty(&self.registry_key)))
    }

    /// The file's bytes as they are on disk, `None` when it does not exist
    pub fn read_raw(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(error::store::read_failed(&self.path, e)),
        }
    }

    /// Atomically replace the document on disk
    pub fn save(&self, document: &Document) -> Result<()> {
        self.write_atomic(document.to_json_pretty().as_bytes())?;
        tracing::debug!(
            path = %self.path.display(),
            entries = document.len(),
            "saved registry document"
        );
        Ok(())
    }

    /// Atomically put back bytes captured by `read_raw`, formatting and all
    pub fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        self.write_atomic(bytes)?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "restored registry bytes"
        );
        Ok(())
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| error::store::write_failed(&self.path, e))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| error::store::write_failed(&self.path, e))?;
        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| error::store::write_failed(&self.path, e))?;

        // Keep the permissions of the file being replaced
        if let Ok(meta) = fs::metadata(&self.path) {
            let _ = fs::set_permissions(temp.path(), meta.permissions());
        }

        temp.persist(&self.path)
            .map_err(|e| error::store::write_failed(&self.path, e.error))?;
        Ok(())
    }

    /// Remove the document file; used to roll back a run that created it
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(error::store::write_failed(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FederationError;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> ConfigStore {
        ConfigStore::new(temp.path().join("claude_desktop_config.json"), "mcpServers")
    }

    #[test]
    fn test_load_absent() {
        let temp = TempDir::new().unwrap();
        assert!(store_in(&temp).load().unwrap().is_none());
    }

    #[test]
    fn test_load_malformed_is_fatal_and_file_untouched() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, FederationError::MalformedDocument { .. }));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_load_whitespace_file_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::write(store.path(), "  \n").unwrap();
        let doc = store.load().unwrap().unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_unknown_keys() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let original = Document::from_value(
            json!({
                "globalShortcut": "Ctrl+Space",
                "mcpServers": {
                    "x": {
                        "command": "node",
                        "args": ["x.js"],
                        "disabled": true,
                        "custom": {"a": [1, 2]}
                    }
                },
                "nested": {"deep": {"n": 1.5}}
            }),
            "mcpServers",
        )
        .unwrap();

        store.save(&original).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, original);

        // Saving the loaded document again is byte-stable
        let first = fs::read_to_string(store.path()).unwrap();
        store.save(&loaded).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), first);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("Claude/config.json"), "mcpServers");
        store.save(&Document::empty("mcpServers")).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.save(&Document::empty("mcpServers")).unwrap();
        let count = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_save_under_regular_file_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let store = ConfigStore::new(blocker.join("config.json"), "mcpServers");
        let err = store.save(&Document::empty("mcpServers")).unwrap_err();

        assert!(matches!(err, FederationError::WriteFailure { .. }));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
    }

    #[test]
    fn test_save_over_directory_fails() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir(store.path()).unwrap();

        let err = store.save(&Document::empty("mcpServers")).unwrap_err();

        assert!(matches!(err, FederationError::WriteFailure { .. }));
        assert!(store.path().is_dir());
    }

    #[test]
    fn test_raw_bytes_survive_unchanged() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert!(store.read_raw().unwrap().is_none());

        let compact = b"{\"theme\":\"dark\",    \"mcpServers\": {\"x\": {\"command\": \"x\"}}}";
        fs::write(store.path(), compact).unwrap();
        let raw = store.read_raw().unwrap().unwrap();

        store.save(&store.load().unwrap().unwrap()).unwrap();
        assert_ne!(fs::read(store.path()).unwrap(), compact.to_vec());

        store.write_raw(&raw).unwrap();
        assert_eq!(fs::read(store.path()).unwrap(), compact.to_vec());
    }
}

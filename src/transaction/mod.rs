//! Registry write transaction
//!
//! Remembers the registry file's exact bytes as they were before a run and
//! puts them back if the run fails after saving. A save through the transaction is the
//! only registry write of a run; the manifest write follows it, and a
//! failure there rolls the registry back so the two never disagree.
//!
//! Dropping an uncommitted transaction that has written rolls back
//! automatically.

use crate::error::Result;
use crate::store::{ConfigStore, Document};

#[derive(Debug)]
pub struct RegistryTransaction<'a> {
    store: &'a ConfigStore,

    /// File contents before the run; `None` if the file did not exist
    original: Option<Vec<u8>>,

    written: bool,

    committed: bool,
}

impl<'a> RegistryTransaction<'a> {
    /// Capture the file as it is now
    pub fn begin(store: &'a ConfigStore) -> Result<Self> {
        let original = store.read_raw()?;
        Ok(Self {
            store,
            original,
            written: false,
            committed: false,
        })
    }

    /// Atomically replace the registry document
    pub fn save(&mut self, document: &Document) -> Result<()> {
        self.store.save(document)?;
        self.written = true;
        Ok(())
    }

    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Put the original bytes back
    ///
    /// A run that found no document leaves none behind.
    pub fn rollback(&mut self) -> Result<()> {
        if self.committed || !self.written {
            return Ok(());
        }

        match &self.original {
            Some(bytes) => self.store.write_raw(bytes)?,
            None => self.store.remove()?,
        }
        self.written = false;
        tracing::info!(path = %self.store.path().display(), "registry document rolled back");
        Ok(())
    }
}

impl Drop for RegistryTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && self.written {
            if let Err(e) = self.rollback() {
                tracing::warn!("rollback failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> ConfigStore {
        ConfigStore::new(temp.path().join("config.json"), "mcpServers")
    }

    fn document(names: &[&str]) -> Document {
        let mut doc = Document::empty("mcpServers");
        for name in names {
            doc.insert_new(name, json!({"command": "node", "args": []}))
                .unwrap();
        }
        doc
    }

    #[test]
    fn test_commit_keeps_written_document() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store.save(&document(&["x"])).unwrap();

        let mut tx = RegistryTransaction::begin(&store).unwrap();
        tx.save(&document(&["x", "a"])).unwrap();
        tx.commit();

        assert_eq!(store.load().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_rollback_restores_original() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(
            store.path(),
            "{\n  \"theme\": \"dark\",\n  \"mcpServers\": {}\n}\n",
        )
        .unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let mut tx = RegistryTransaction::begin(&store).unwrap();
        tx.save(&document(&["a"])).unwrap();
        tx.rollback().unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_rollback_removes_created_document() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        {
            let mut tx = RegistryTransaction::begin(&store).unwrap();
            tx.save(&document(&["a"])).unwrap();
            assert!(store.path().exists());
            // Dropped without commit
        }

        assert!(!store.path().exists());
    }

    #[test]
    fn test_rollback_without_write_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store.save(&document(&["x"])).unwrap();

        let mut tx = RegistryTransaction::begin(&store).unwrap();
        tx.rollback().unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn test_rollback_keeps_original_formatting() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let compact = r#"{"theme":"dark",    "mcpServers": {"x": {"command": "x"}}}"#;
        fs::write(store.path(), compact).unwrap();

        let mut tx = RegistryTransaction::begin(&store).unwrap();
        tx.save(&document(&["x", "a"])).unwrap();
        assert_ne!(fs::read_to_string(store.path()).unwrap(), compact);
        tx.rollback().unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), compact);
    }

    #[test]
    fn test_drop_restores_file_without_trailing_newline() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.path(), "{\"mcpServers\":{}}").unwrap();

        {
            let mut tx = RegistryTransaction::begin(&store).unwrap();
            tx.save(&document(&["a"])).unwrap();
        }

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{\"mcpServers\":{}}");
    }
}

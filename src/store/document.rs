//! In-memory form of the registry document
//!
//! The document is an arbitrary JSON object owned by another application.
//! Only the nested registry mapping is interpreted; every other key, and
//! every key inside an entry, is carried through untouched.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{Result, invariant};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Map<String, Value>,
    registry_key: String,
}

impl Document {
    /// An empty document, used when the file does not exist yet
    pub fn empty(registry_key: impl Into<String>) -> Self {
        Self {
            root: Map::new(),
            registry_key: registry_key.into(),
        }
    }

    /// Parse document text, returning the reason on failure
    pub fn parse(text: &str, registry_key: &str) -> std::result::Result<Self, String> {
        let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Self::from_value(value, registry_key)
    }

    /// Wrap a JSON value, checking the top-level and registry shapes
    pub fn from_value(value: Value, registry_key: &str) -> std::result::Result<Self, String> {
        let Value::Object(root) = value else {
            return Err("top-level value is not an object".to_string());
        };
        if let Some(registry) = root.get(registry_key) {
            if !registry.is_object() {
                return Err(format!("'{registry_key}' is not an object"));
            }
        }
        Ok(Self {
            root,
            registry_key: registry_key.to_string(),
        })
    }

    fn registry(&self) -> Option<&Map<String, Value>> {
        self.root.get(&self.registry_key).and_then(Value::as_object)
    }

    fn registry_mut(&mut self) -> Result<&mut Map<String, Value>> {
        let slot = self
            .root
            .entry(self.registry_key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        slot.as_object_mut()
            .ok_or_else(|| invariant("registry mapping is not an object"))
    }

    /// Names of all registered entries
    pub fn names(&self) -> BTreeSet<String> {
        self.registry()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn entry(&self, name: &str) -> Option<&Value> {
        self.registry().and_then(|r| r.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Number of registered entries
    pub fn len(&self) -> usize {
        self.registry().map_or(0, Map::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an entry that must not already exist
    ///
    /// Overwriting is never allowed; an occupied name is an invariant violation.
    pub fn insert_new(&mut self, name: &str, value: Value) -> Result<()> {
        let registry = self.registry_mut()?;
        if registry.contains_key(name) {
            return Err(invariant(format!(
                "attempted to overwrite existing registry entry '{name}'"
            )));
        }
        registry.insert(name.to_string(), value);
        Ok(())
    }

    /// Remove an entry, keeping the order of the remaining ones
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let key = self.registry_key.clone();
        self.root
            .get_mut(&key)
            .and_then(Value::as_object_mut)
            .and_then(|r| r.shift_remove(name))
    }

    /// Top-level keys other than the registry
    pub fn foreign_keys(&self) -> impl Iterator<Item = &String> {
        self.root.keys().filter(move |k| **k != self.registry_key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Serialized form written to disk
    pub fn to_json_pretty(&self) -> String {
        let mut text =
            serde_json::to_string_pretty(&self.root).unwrap_or_else(|_| String::from("{}"));
        text.push('\n');
        text
    }
}

//! Post-install validation
//!
//! Re-reads the registry and checks it against the catalog: every catalog
//! name should be registered, and every registered catalog entry's command
//! should resolve on PATH.

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::error::{EXIT_PARTIAL, EXIT_SUCCESS, Result};
use crate::prereq::Toolchain;
use crate::store::ConfigStore;

#[derive(Debug, Clone, Default)]
pub struct ValidateReport {
    pub registered: Vec<String>,
    pub missing: Vec<String>,
    /// Registered entries whose command was not found, as (name, command)
    pub unresolved: Vec<(String, String)>,
}

impl ValidateReport {
    pub fn exit_code(&self) -> i32 {
        if self.missing.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_PARTIAL
        }
    }
}

pub fn validate(
    settings: &Settings,
    catalog: &Catalog,
    toolchain: &dyn Toolchain,
) -> Result<ValidateReport> {
    let store = ConfigStore::new(&settings.registry_path, &settings.registry_key);
    let document = store.load_or_empty()?;
    let mut report = ValidateReport::default();

    for name in catalog.names() {
        let Some(value) = document.entry(&name) else {
            tracing::debug!(entry = %name, "not registered");
            report.missing.push(name);
            continue;
        };
        let command = value
            .get("command")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if command.is_empty() || toolchain.locate(command).is_none() {
            tracing::warn!(entry = %name, command, "command does not resolve");
            report.unresolved.push((name.clone(), command.to_string()));
        }
        report.registered.push(name);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RetryPolicy;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    struct OnlyNode;

    impl Toolchain for OnlyNode {
        fn locate(&self, program: &str) -> Option<PathBuf> {
            (program == "node").then(|| PathBuf::from("/usr/bin/node"))
        }
    }

    #[test]
    fn test_validate_reports_missing_and_unresolved() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            registry_path: temp.path().join("config.json"),
            registry_key: "mcpServers".to_string(),
            state_dir: temp.path().join("state"),
            servers_dir: temp.path().join("servers"),
            home_dir: temp.path().to_path_buf(),
            retry: RetryPolicy::default(),
            action_timeout: Duration::from_secs(5),
            jobs: 1,
        };
        fs::write(
            &settings.registry_path,
            r#"{"mcpServers": {"a": {"command": "node"}, "b": {"command": "uvx"}}}"#,
        )
        .unwrap();
        let catalog = Catalog::from_yaml(
            "name: t\nversion: '1'\nentries:\n  - {name: a, entry: {command: node}}\n  - {name: b, entry: {command: uvx}}\n  - {name: c, entry: {command: node}}\n",
            "test",
        )
        .unwrap();

        let report = validate(&settings, &catalog, &OnlyNode).unwrap();

        assert_eq!(report.registered, vec!["a", "b"]);
        assert_eq!(report.missing, vec!["c"]);
        assert_eq!(report.unresolved, vec![("b".to_string(), "uvx".to_string())]);
        assert_eq!(report.exit_code(), EXIT_PARTIAL);
    }
}

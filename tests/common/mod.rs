//! Common test utilities for mcp-federation integration tests

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Two entries acquired with `true`, one with a required variable
#[allow(dead_code)]
pub const CATALOG: &str = r#"
name: test-federation
version: "1.0"
entries:
  - name: alpha
    entry:
      command: node
      args: ["{servers_dir}/alpha/index.js"]
    acquisition:
      kind: registry_package
      target: alpha-pkg
      argv_template: ["true"]
  - name: beta
    entry:
      command: npx
      args: ["-y", "beta"]
    acquisition:
      kind: registry_package
      target: beta-pkg
      argv_template: ["true"]
  - name: gamma
    entry:
      command: python3
      args: ["{dir}/server.py"]
    acquisition:
      kind: local_template
      files:
        server.py: "print('{name}')\n"
      env_requirements: [GAMMA_TOKEN]
"#;

/// A catalog whose second entry always fails to acquire
#[allow(dead_code)]
pub const FAILING_CATALOG: &str = r#"
name: test-federation
version: "1.0"
entries:
  - name: alpha
    entry:
      command: node
      args: ["alpha.js"]
    acquisition:
      kind: registry_package
      target: alpha-pkg
      argv_template: ["true"]
  - name: broken
    entry:
      command: node
      args: ["broken.js"]
    acquisition:
      kind: registry_package
      target: broken-pkg
      argv_template: ["sh", "-c", "exit 1"]
"#;

/// A temporary home with a registry document, state dir and servers dir
#[allow(dead_code)]
pub struct TestWorkspace {
    pub temp: TempDir,
    /// Temporary home directory
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        let workspace = Self { temp, path };
        workspace.write_catalog(CATALOG);
        workspace
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join("claude_desktop_config.json")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.path.join(".mcp-federation")
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.path.join("mcp-servers")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.path.join("catalog.yaml")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.state_dir().join("installation_manifest.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.state_dir().join("backups")
    }

    pub fn write_catalog(&self, yaml: &str) {
        std::fs::write(self.catalog_path(), yaml).expect("Failed to write catalog");
    }

    /// Write the registry document verbatim
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_path(), content).expect("Failed to write config");
    }

    /// Write a registry document with the given `mcpServers` mapping
    pub fn write_servers(&self, servers: serde_json::Value) {
        let doc = serde_json::json!({ "globalShortcut": "Ctrl+Space", "mcpServers": servers });
        self.write_config(&serde_json::to_string_pretty(&doc).expect("Failed to serialize"));
    }

    pub fn read_config(&self) -> String {
        std::fs::read_to_string(self.config_path()).expect("Failed to read config")
    }

    pub fn config_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.read_config()).expect("Config is not JSON")
    }

    /// Names registered under `mcpServers`, sorted
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config_json()["mcpServers"]
            .as_object()
            .map(|servers| servers.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn manifest_json(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.manifest_path()).expect("Failed to read manifest");
        serde_json::from_str(&text).expect("Manifest is not JSON")
    }

    /// Sorted names from a manifest array field
    pub fn manifest_names(&self, field: &str) -> Vec<String> {
        let mut names: Vec<String> = self.manifest_json()[field]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn backups(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.backup_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// The binary pointed at this workspace, with environment overrides cleared
    pub fn cmd(&self) -> Command {
        let mut cmd = mcp_federation_cmd();
        cmd.env("HOME", &self.path)
            .env_remove("MCP_FEDERATION_CONFIG")
            .env_remove("MCP_FEDERATION_HOME")
            .env_remove("MCP_FEDERATION_SERVERS_DIR")
            .env_remove("GAMMA_TOKEN")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config_path())
            .arg("--state-dir")
            .arg(self.state_dir())
            .arg("--servers-dir")
            .arg(self.servers_dir())
            .arg("--catalog")
            .arg(self.catalog_path());
        cmd
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(deprecated)]
pub fn mcp_federation_cmd() -> Command {
    Command::cargo_bin("mcp-federation").expect("binary built")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_creation() {
        let workspace = TestWorkspace::new();
        assert!(workspace.path.exists());
        assert!(workspace.catalog_path().exists());
        assert!(!workspace.config_path().exists());
    }

    #[test]
    fn test_workspace_registered_names() {
        let workspace = TestWorkspace::new();
        workspace.write_servers(serde_json::json!({"b": {"command": "x"}, "a": {"command": "y"}}));
        assert_eq!(workspace.registered(), vec!["a", "b"]);
    }
}

//! Install command integration tests

mod common;

use predicates::prelude::*;
use serde_json::json;

#[test]
fn test_install_into_absent_document() {
    let workspace = common::TestWorkspace::new();

    workspace
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Added:"))
        .stdout(predicate::str::contains("alpha, beta, gamma"));

    assert_eq!(workspace.registered(), vec!["alpha", "beta", "gamma"]);
    assert_eq!(
        workspace.manifest_names("installed_by_tool"),
        vec!["alpha", "beta", "gamma"]
    );
    assert!(workspace.manifest_names("preexisting").is_empty());
    assert!(
        workspace.backups().is_empty(),
        "nothing to back up when the document did not exist"
    );
    assert!(workspace.servers_dir().join("gamma/server.py").exists());
}

#[test]
fn test_no_subcommand_runs_install() {
    let workspace = common::TestWorkspace::new();
    workspace.write_servers(json!({}));

    workspace.cmd().assert().success();

    assert_eq!(workspace.registered(), vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_existing_entry_is_never_overwritten() {
    let workspace = common::TestWorkspace::new();
    workspace.write_servers(json!({
        "alpha": {"command": "my-own-alpha", "args": ["--custom"]},
        "unrelated": {"command": "other"}
    }));

    workspace
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Left alone (registered before): alpha"));

    let config = workspace.config_json();
    assert_eq!(config["mcpServers"]["alpha"]["command"], "my-own-alpha");
    assert_eq!(config["mcpServers"]["alpha"]["args"], json!(["--custom"]));
    assert_eq!(config["mcpServers"]["unrelated"]["command"], "other");
    assert_eq!(config["globalShortcut"], "Ctrl+Space");

    assert_eq!(workspace.manifest_names("installed_by_tool"), vec!["beta", "gamma"]);
    assert_eq!(workspace.manifest_names("preexisting"), vec!["alpha"]);
}

#[test]
fn test_install_backs_up_existing_document() {
    let workspace = common::TestWorkspace::new();
    workspace.write_servers(json!({"unrelated": {"command": "other"}}));
    let before = workspace.read_config();

    workspace.cmd().arg("install").assert().success();

    let backups = workspace.backups();
    assert!(backups.iter().any(|name| name.ends_with("_baseline.json")));
    let snapshot = backups
        .iter()
        .find(|name| name.contains("_pre_install_"))
        .expect("pre-install snapshot");
    let saved = std::fs::read_to_string(workspace.backup_dir().join(snapshot)).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
    let before: serde_json::Value = serde_json::from_str(&before).unwrap();
    assert_eq!(saved, before);
}

#[test]
fn test_reinstall_is_idempotent() {
    let workspace = common::TestWorkspace::new();

    workspace.cmd().arg("install").assert().success();
    let first = workspace.config_json();

    workspace
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing new to add."));

    assert_eq!(workspace.config_json(), first);
    assert_eq!(
        workspace.manifest_names("installed_by_tool"),
        vec!["alpha", "beta", "gamma"]
    );
}

#[test]
fn test_missing_credential_registers_placeholder() {
    let workspace = common::TestWorkspace::new();

    workspace
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("gamma: set GAMMA_TOKEN"));

    assert_eq!(
        workspace.config_json()["mcpServers"]["gamma"]["env"]["GAMMA_TOKEN"],
        "YOUR_GAMMA_TOKEN"
    );
}

#[test]
fn test_credential_from_environment() {
    let workspace = common::TestWorkspace::new();

    workspace
        .cmd()
        .env("GAMMA_TOKEN", "secret-value")
        .arg("install")
        .assert()
        .success();

    assert_eq!(
        workspace.config_json()["mcpServers"]["gamma"]["env"]["GAMMA_TOKEN"],
        "secret-value"
    );
}

#[cfg(unix)]
#[test]
fn test_failed_acquisition_is_partial() {
    let workspace = common::TestWorkspace::new();
    workspace.write_catalog(common::FAILING_CATALOG);

    workspace
        .cmd()
        .args(["install", "--retry-delay", "0"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("broken after 3 attempt(s)"));

    assert_eq!(workspace.registered(), vec!["alpha"]);
    assert_eq!(workspace.manifest_names("installed_by_tool"), vec!["alpha"]);
}

#[cfg(unix)]
#[test]
fn test_max_attempts_option() {
    let workspace = common::TestWorkspace::new();
    workspace.write_catalog(common::FAILING_CATALOG);

    workspace
        .cmd()
        .args(["install", "--retry-delay", "0", "--max-attempts", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("broken after 1 attempt(s)"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let workspace = common::TestWorkspace::new();
    workspace.write_servers(json!({"alpha": {"command": "mine"}}));
    let before = workspace.read_config();

    workspace
        .cmd()
        .args(["install", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Install plan"))
        .stdout(predicate::str::contains("Dry run"));

    assert_eq!(workspace.read_config(), before);
    assert!(!workspace.state_dir().exists());
    assert!(!workspace.servers_dir().exists());
}

#[test]
fn test_malformed_document_aborts() {
    let workspace = common::TestWorkspace::new();
    workspace.write_config("{ \"mcpServers\": { broken");

    workspace
        .cmd()
        .arg("install")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("registry file was not modified"));

    assert_eq!(workspace.read_config(), "{ \"mcpServers\": { broken");
    assert!(!workspace.manifest_path().exists());
}

#[test]
fn test_missing_prerequisite_aborts_before_backup() {
    let workspace = common::TestWorkspace::new();
    workspace.write_catalog(
        r#"
name: test-federation
version: "1.0"
entries:
  - name: alpha
    entry:
      command: node
    acquisition:
      kind: registry_package
      target: alpha-pkg
      argv_template: ["no-such-package-manager-7d3a", "install", "{target}"]
"#,
    );
    workspace.write_servers(json!({}));

    workspace
        .cmd()
        .arg("install")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no-such-package-manager-7d3a"));

    assert!(workspace.backups().is_empty());
    assert!(workspace.registered().is_empty());
}

#[test]
fn test_invalid_catalog_aborts() {
    let workspace = common::TestWorkspace::new();
    workspace.write_catalog("name: x\nversion: \"1\"\nentries:\n  - name: a\n    entry:\n      command: \"\"\n");

    workspace.cmd().arg("install").assert().code(2);

    assert!(!workspace.config_path().exists());
}

#[test]
fn test_template_directory_outside_servers_dir_is_rejected() {
    let workspace = common::TestWorkspace::new();
    workspace.write_catalog(
        r#"
name: test-federation
version: "1.0"
entries:
  - name: alpha
    entry:
      command: node
    acquisition:
      kind: local_template
      directory: ../escaped
      files:
        pwn.txt: hi
"#,
    );

    workspace
        .cmd()
        .args(["install", "--retry-delay", "0"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("alpha after 1 attempt(s)"));

    assert!(!workspace.path.join("escaped").exists());
    assert!(workspace.registered().is_empty());
}

#[test]
fn test_backup_failure_aborts_without_touching_registry() {
    let workspace = common::TestWorkspace::new();
    workspace.write_servers(json!({"mine": {"command": "x"}}));
    let before = workspace.read_config();
    std::fs::create_dir_all(workspace.state_dir()).unwrap();
    std::fs::write(workspace.backup_dir(), "not a directory").unwrap();

    workspace.cmd().arg("install").assert().code(2);

    assert_eq!(workspace.read_config(), before);
    assert!(!workspace.manifest_path().exists());
}

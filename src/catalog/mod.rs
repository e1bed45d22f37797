//! Desired entry catalog
//!
//! The catalog is versioned data, not code: the builtin set ships as
//! `federation.yaml` and any other file can be passed with `--catalog`.
//! Resolving a catalog expands path placeholders and pulls required
//! environment variables, producing the desired entry set for one run.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::error::{self, Result};

const BUILTIN_CATALOG: &str = include_str!("federation.yaml");
const BUILTIN_SOURCE: &str = "<builtin>";

/// Registration value for one entry
///
/// Keys other than the four known ones are carried through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionKind {
    RegistryPackage,
    VersionControlFetch,
    LocalTemplate,
}

impl AcquisitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AcquisitionKind::RegistryPackage => "registry_package",
            AcquisitionKind::VersionControlFetch => "version_control_fetch",
            AcquisitionKind::LocalTemplate => "local_template",
        }
    }
}

/// What must happen before an entry is safe to register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionDescriptor {
    pub kind: AcquisitionKind,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub argv_template: Vec<String>,
    #[serde(default)]
    pub env_requirements: Vec<String>,
    /// Branch for `version_control_fetch`
    #[serde(default)]
    pub branch: Option<String>,
    /// Directory under the servers directory, defaults to the entry name
    #[serde(default)]
    pub directory: Option<String>,
    /// Relative path to contents, for `local_template`
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub entry: RegistryEntry,
    #[serde(default)]
    pub acquisition: Option<AcquisitionDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    pub version: String,
    pub entries: Vec<CatalogEntry>,
    #[serde(skip)]
    source: String,
}

impl Catalog {
    /// The catalog shipped with this build
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG, BUILTIN_SOURCE)
    }

    /// Load a catalog file (YAML, or JSON which YAML accepts)
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(error::catalog::not_found(path));
        }
        let text = fs::read_to_string(path)
            .map_err(|e| error::catalog::invalid(path.display().to_string(), e))?;
        Self::from_yaml(&text, &path.display().to_string())
    }

    /// Catalog given on the command line, or the builtin one
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_yaml(text: &str, source: &str) -> Result<Self> {
        let mut catalog: Catalog =
            serde_yaml::from_str(text).map_err(|e| error::catalog::invalid(source, e))?;
        catalog.source = source.to_string();
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.name.trim().is_empty() {
                return Err(error::catalog::invalid(&self.source, "entry with empty name"));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(error::catalog::invalid(
                    &self.source,
                    format!("duplicate entry '{}'", entry.name),
                ));
            }
            if entry.entry.command.trim().is_empty() {
                return Err(error::catalog::invalid(
                    &self.source,
                    format!("entry '{}' has no command", entry.name),
                ));
            }
        }
        Ok(())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Entry names in catalog order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Expand placeholders and environment requirements for one run
    pub fn resolve<F>(&self, ctx: &ResolveContext, env: F) -> Vec<DesiredEntry>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.entries
            .iter()
            .map(|entry| resolve_entry(entry, ctx, &env))
            .collect()
    }
}

/// Paths substituted into catalog placeholders
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub home: PathBuf,
    pub servers_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ResolveContext {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            home: settings.home_dir.clone(),
            servers_dir: settings.servers_dir.clone(),
            state_dir: settings.state_dir.clone(),
        }
    }
}

/// A fully resolved acquisition, ready for the runner
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub entry: String,
    pub kind: AcquisitionKind,
    pub target: String,
    pub argv: Vec<String>,
    /// Variables forwarded to subprocesses
    pub env: Vec<(String, String)>,
    /// Where commands run and where fetches and templates land
    pub workdir: PathBuf,
    /// Relative directory under the servers directory, unchecked until run
    pub directory: Option<String>,
    pub branch: Option<String>,
    pub files: Vec<(String, String)>,
}

impl Acquisition {
    /// Program the action will spawn, if any
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

/// One member of the desired entry set
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredEntry {
    pub name: String,
    pub entry: RegistryEntry,
    pub acquisition: Option<Acquisition>,
    /// Required variables that were not set; a placeholder was registered
    pub missing_env: Vec<String>,
}

impl DesiredEntry {
    /// Registry value to insert
    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.entry).unwrap_or(Value::Null)
    }
}

/// Substitute `{key}` tokens; unknown braces are left alone
fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        let token = format!("{{{key}}}");
        if out.contains(&token) {
            out = out.replace(&token, value);
        }
    }
    out
}

fn resolve_entry<F>(entry: &CatalogEntry, ctx: &ResolveContext, env: &F) -> DesiredEntry
where
    F: Fn(&str) -> Option<String>,
{
    let home = ctx.home.display().to_string();
    let servers_dir = ctx.servers_dir.display().to_string();
    let state_dir = ctx.state_dir.display().to_string();

    let descriptor = entry.acquisition.as_ref();
    let directory = descriptor
        .filter(|d| d.kind != AcquisitionKind::RegistryPackage)
        .map(|d| d.directory.clone().unwrap_or_else(|| entry.name.clone()));
    let workdir = match &directory {
        Some(directory) => ctx.servers_dir.join(directory),
        None => ctx.servers_dir.clone(),
    };
    let dir = workdir.display().to_string();
    let target = descriptor.map(|d| d.target.clone()).unwrap_or_default();

    let vars: [(&str, &str); 6] = [
        ("home", &home),
        ("servers_dir", &servers_dir),
        ("state_dir", &state_dir),
        ("dir", &dir),
        ("target", &target),
        ("name", &entry.name),
    ];

    let mut registry = entry.entry.clone();
    registry.command = expand(&registry.command, &vars);
    registry.args = registry.args.iter().map(|a| expand(a, &vars)).collect();
    registry.cwd = registry.cwd.as_deref().map(|c| expand(c, &vars));
    if let Some(env_map) = registry.env.as_mut() {
        for value in env_map.values_mut() {
            *value = expand(value, &vars);
        }
    }

    let mut missing_env = Vec::new();
    let mut forwarded = Vec::new();
    for var in descriptor.map(|d| d.env_requirements.as_slice()).unwrap_or(&[]) {
        let env_map = registry.env.get_or_insert_with(BTreeMap::new);
        match env(var).filter(|v| !v.is_empty()) {
            Some(value) => {
                env_map.insert(var.clone(), value.clone());
                forwarded.push((var.clone(), value));
            }
            None => {
                env_map
                    .entry(var.clone())
                    .or_insert_with(|| format!("YOUR_{var}"));
                missing_env.push(var.clone());
            }
        }
    }

    let acquisition = descriptor.map(|d| Acquisition {
        entry: entry.name.clone(),
        kind: d.kind,
        target: d.target.clone(),
        argv: d.argv_template.iter().map(|a| expand(a, &vars)).collect(),
        env: forwarded,
        workdir: workdir.clone(),
        directory: directory.clone(),
        branch: d.branch.clone(),
        files: d
            .files
            .iter()
            .map(|(path, contents)| (path.clone(), expand(contents, &vars)))
            .collect(),
    });

    DesiredEntry {
        name: entry.name.clone(),
        entry: registry,
        acquisition,
        missing_env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ResolveContext {
        ResolveContext {
            home: PathBuf::from("/home/u"),
            servers_dir: PathBuf::from("/home/u/mcp-servers"),
            state_dir: PathBuf::from("/home/u/.mcp-federation"),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.entries.len(), 15);
        assert_eq!(catalog.source(), "<builtin>");
        assert!(catalog.names().contains(&"expert-role-prompt".to_string()));
    }

    #[test]
    fn test_builtin_yaml_aliases_share_template() {
        let catalog = Catalog::builtin().unwrap();
        let rag = catalog.entries.iter().find(|e| e.name == "rag-context").unwrap();
        let acq = rag.acquisition.as_ref().unwrap();
        assert_eq!(acq.kind, AcquisitionKind::LocalTemplate);
        assert!(acq.files.contains_key("server.py"));
    }

    #[test]
    fn test_resolve_expands_placeholders() {
        let catalog = Catalog::builtin().unwrap();
        let desired = catalog.resolve(&ctx(), no_env);

        let fs_entry = desired.iter().find(|d| d.name == "filesystem").unwrap();
        assert_eq!(fs_entry.entry.args.last().unwrap(), "/home/u");
        let acq = fs_entry.acquisition.as_ref().unwrap();
        assert_eq!(
            acq.argv,
            vec!["npm", "cache", "add", "@modelcontextprotocol/server-filesystem"]
        );
        assert_eq!(acq.workdir, PathBuf::from("/home/u/mcp-servers"));

        let rag = desired.iter().find(|d| d.name == "rag-context").unwrap();
        assert_eq!(rag.entry.args, vec!["/home/u/mcp-servers/rag-context/server.py"]);
        let server_py = &rag.acquisition.as_ref().unwrap().files;
        assert!(
            server_py
                .iter()
                .any(|(p, c)| p == "server.py" && c.contains("Server(\"rag-context\")"))
        );
    }

    #[test]
    fn test_env_requirement_forwarded_when_set() {
        let catalog = Catalog::builtin().unwrap();
        let desired = catalog.resolve(&ctx(), |key| {
            (key == "GITHUB_PERSONAL_ACCESS_TOKEN").then(|| "ghp_secret".to_string())
        });
        let gh = desired.iter().find(|d| d.name == "github-manager").unwrap();

        assert!(gh.missing_env.is_empty());
        assert_eq!(
            gh.entry.env.as_ref().unwrap()["GITHUB_PERSONAL_ACCESS_TOKEN"],
            "ghp_secret"
        );
        assert_eq!(
            gh.acquisition.as_ref().unwrap().env,
            vec![(
                "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
                "ghp_secret".to_string()
            )]
        );
    }

    #[test]
    fn test_env_requirement_missing_keeps_placeholder() {
        let catalog = Catalog::from_yaml(
            r#"
name: t
version: "1"
entries:
  - name: svc
    entry: { command: svc }
    acquisition:
      kind: registry_package
      target: svc
      env_requirements: [SVC_TOKEN]
  - name: gh
    entry:
      command: npx
      env: { GH: YOUR_GITHUB_TOKEN }
    acquisition:
      kind: registry_package
      env_requirements: [GH]
"#,
            "inline",
        )
        .unwrap();
        let desired = catalog.resolve(&ctx(), no_env);

        assert_eq!(desired[0].missing_env, vec!["SVC_TOKEN".to_string()]);
        assert_eq!(desired[0].entry.env.as_ref().unwrap()["SVC_TOKEN"], "YOUR_SVC_TOKEN");
        assert_eq!(desired[1].entry.env.as_ref().unwrap()["GH"], "YOUR_GITHUB_TOKEN");
    }

    #[test]
    fn test_unknown_entry_keys_survive() {
        let catalog = Catalog::from_yaml(
            r#"
name: t
version: "1"
entries:
  - name: x
    entry:
      command: run
      args: [a]
      disabled: false
      transport: { type: stdio }
"#,
            "inline",
        )
        .unwrap();
        let desired = catalog.resolve(&ctx(), no_env);
        assert_eq!(
            desired[0].to_value(),
            json!({
                "command": "run",
                "args": ["a"],
                "disabled": false,
                "transport": {"type": "stdio"}
            })
        );
        assert!(desired[0].acquisition.is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Catalog::from_yaml(
            "name: t\nversion: '1'\nentries:\n  - {name: a, entry: {command: x}}\n  - {name: a, entry: {command: y}}\n",
            "dup.yaml",
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate entry 'a'"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Catalog::from_yaml(
            "name: t\nversion: '1'\nentries:\n  - name: a\n    entry: {command: x}\n    acquisition: {kind: carrier_pigeon}\n",
            "bad.yaml",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::error::FederationError::CatalogInvalid { .. }
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::FederationError::CatalogNotFound { .. }
        ));
    }

    #[test]
    fn test_expand_leaves_unknown_braces() {
        let out = expand("{dir}/x {unknown} ${js}", &[("dir", "/d")]);
        assert_eq!(out, "/d/x {unknown} ${js}");
    }
}

//! Runtime settings resolved once at startup
//!
//! Every path the engine touches is decided here and passed explicitly to the
//! store, the vault and the runner. Resolution order for each value is the
//! command-line flag, then the environment variable, then the platform default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FederationError, Result};
use crate::runner::RetryPolicy;

/// Environment variable overriding the registry document path
pub const CONFIG_ENV: &str = "MCP_FEDERATION_CONFIG";
/// Environment variable overriding the state directory
pub const HOME_ENV: &str = "MCP_FEDERATION_HOME";
/// Environment variable overriding the servers directory
pub const SERVERS_DIR_ENV: &str = "MCP_FEDERATION_SERVERS_DIR";

/// Key of the nested registry mapping inside the document
pub const REGISTRY_KEY: &str = "mcpServers";

const DESKTOP_APP_DIR: &str = "Claude";
const DESKTOP_CONFIG_FILE: &str = "claude_desktop_config.json";
const STATE_DIR: &str = ".mcp-federation";
const SERVERS_DIR: &str = "mcp-servers";
const MANIFEST_FILE: &str = "installation_manifest.json";
const BACKUPS_DIR: &str = "backups";

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_JOBS: usize = 4;

/// Values supplied on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub config: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub servers_dir: Option<PathBuf>,
    pub max_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub registry_path: PathBuf,
    pub registry_key: String,
    pub state_dir: PathBuf,
    pub servers_dir: PathBuf,
    pub home_dir: PathBuf,
    pub retry: RetryPolicy,
    pub action_timeout: Duration,
    pub jobs: usize,
}

impl Settings {
    /// Resolve settings from overrides and the process environment
    pub fn resolve(overrides: &SettingsOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Resolve settings with an explicit environment lookup and home directory
    pub fn resolve_with<F>(
        overrides: &SettingsOverrides,
        env: F,
        home: Option<PathBuf>,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let require_home = |what: &str| {
            home.clone().ok_or_else(|| FederationError::ConfigurationInvalid {
                message: format!("could not determine home directory for the {what}"),
            })
        };

        let registry_path = match overrides.config.clone().or_else(|| from_env(CONFIG_ENV)) {
            Some(path) => path,
            None => default_registry_path(home.as_deref()).ok_or_else(|| {
                FederationError::ConfigurationInvalid {
                    message: "could not determine the desktop app configuration directory"
                        .to_string(),
                }
            })?,
        };

        let state_dir = match overrides.state_dir.clone().or_else(|| from_env(HOME_ENV)) {
            Some(path) => path,
            None => require_home("state directory")?.join(STATE_DIR),
        };

        let servers_dir = match overrides
            .servers_dir
            .clone()
            .or_else(|| from_env(SERVERS_DIR_ENV))
        {
            Some(path) => path,
            None => require_home("servers directory")?.join(SERVERS_DIR),
        };

        let mut retry = RetryPolicy::default();
        if let Some(attempts) = overrides.max_attempts {
            retry.max_attempts = attempts.max(1);
        }
        if let Some(secs) = overrides.retry_delay_secs {
            retry.base_delay = Duration::from_secs(secs);
        }

        Ok(Self {
            registry_path,
            registry_key: REGISTRY_KEY.to_string(),
            home_dir: home.unwrap_or_else(|| state_dir.clone()),
            state_dir,
            servers_dir,
            retry,
            // Never below one second
            action_timeout: Duration::from_secs(
                overrides.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1),
            ),
            jobs: overrides.jobs.unwrap_or(DEFAULT_JOBS).max(1),
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.state_dir.join(MANIFEST_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.state_dir.join(BACKUPS_DIR)
    }
}

/// Platform location of the desktop app's configuration document
///
/// `dirs::config_dir` is `%APPDATA%` on Windows, `~/Library/Application Support`
/// on macOS and `$XDG_CONFIG_HOME` (or `~/.config`) elsewhere.
fn default_registry_path(home: Option<&Path>) -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| home.map(|h| h.join(".config")))
        .map(|dir| dir.join(DESKTOP_APP_DIR).join(DESKTOP_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_derive_from_home() {
        let overrides = SettingsOverrides {
            config: Some(PathBuf::from("/cfg/registry.json")),
            ..Default::default()
        };
        let settings =
            Settings::resolve_with(&overrides, env_of(&[]), Some(PathBuf::from("/home/u")))
                .unwrap();

        assert_eq!(settings.state_dir, PathBuf::from("/home/u/.mcp-federation"));
        assert_eq!(settings.servers_dir, PathBuf::from("/home/u/mcp-servers"));
        assert_eq!(
            settings.manifest_path(),
            PathBuf::from("/home/u/.mcp-federation/installation_manifest.json")
        );
        assert_eq!(
            settings.backup_dir(),
            PathBuf::from("/home/u/.mcp-federation/backups")
        );
        assert_eq!(settings.registry_key, "mcpServers");
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.jobs, 4);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let settings = Settings::resolve_with(
            &SettingsOverrides::default(),
            env_of(&[
                (CONFIG_ENV, "/env/config.json"),
                (HOME_ENV, "/env/state"),
                (SERVERS_DIR_ENV, "/env/servers"),
            ]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();

        assert_eq!(settings.registry_path, PathBuf::from("/env/config.json"));
        assert_eq!(settings.state_dir, PathBuf::from("/env/state"));
        assert_eq!(settings.servers_dir, PathBuf::from("/env/servers"));
    }

    #[test]
    fn test_flags_override_env() {
        let overrides = SettingsOverrides {
            config: Some(PathBuf::from("/flag/config.json")),
            state_dir: Some(PathBuf::from("/flag/state")),
            max_attempts: Some(0),
            retry_delay_secs: Some(5),
            jobs: Some(0),
            ..Default::default()
        };
        let settings = Settings::resolve_with(
            &overrides,
            env_of(&[(CONFIG_ENV, "/env/config.json"), (HOME_ENV, "/env/state")]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();

        assert_eq!(settings.registry_path, PathBuf::from("/flag/config.json"));
        assert_eq!(settings.state_dir, PathBuf::from("/flag/state"));
        assert_eq!(settings.retry.max_attempts, 1);
        assert_eq!(settings.retry.base_delay, Duration::from_secs(5));
        assert_eq!(settings.jobs, 1);
    }

    #[test]
    fn test_zero_timeout_is_raised_to_one_second() {
        let overrides = SettingsOverrides {
            config: Some(PathBuf::from("/cfg.json")),
            timeout_secs: Some(0),
            ..Default::default()
        };
        let settings =
            Settings::resolve_with(&overrides, env_of(&[]), Some(PathBuf::from("/home/u")))
                .unwrap();
        assert_eq!(settings.action_timeout, Duration::from_secs(1));

        let defaults = Settings::resolve_with(
            &SettingsOverrides::default(),
            env_of(&[]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(defaults.action_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_missing_home_is_configuration_error() {
        let overrides = SettingsOverrides {
            config: Some(PathBuf::from("/cfg.json")),
            ..Default::default()
        };
        let err = Settings::resolve_with(&overrides, env_of(&[]), None).unwrap_err();
        assert!(matches!(err, FederationError::ConfigurationInvalid { .. }));
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let overrides = SettingsOverrides {
            config: Some(PathBuf::from("/cfg.json")),
            ..Default::default()
        };
        let settings = Settings::resolve_with(
            &overrides,
            env_of(&[(HOME_ENV, "")]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(settings.state_dir, PathBuf::from("/home/u/.mcp-federation"));
    }

    #[test]
    #[serial]
    fn test_resolve_reads_process_environment() {
        let original = std::env::var(HOME_ENV).ok();
        unsafe {
            std::env::set_var(HOME_ENV, "/from/process/env");
        }

        let overrides = SettingsOverrides {
            config: Some(PathBuf::from("/cfg.json")),
            servers_dir: Some(PathBuf::from("/srv")),
            ..Default::default()
        };
        let settings = Settings::resolve(&overrides);

        unsafe {
            match original {
                Some(value) => std::env::set_var(HOME_ENV, value),
                None => std::env::remove_var(HOME_ENV),
            }
        }

        assert_eq!(
            settings.unwrap().state_dir,
            PathBuf::from("/from/process/env")
        );
    }
}

//! Shared configuration for cresctl.
//!
//! TOML profiles layered with `CRESCTL_` environment variables, and
//! translation to `cresctl_core::CoordinatorConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cresctl_core::{CoordinatorConfig, DEFAULT_POLL_INTERVAL};

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CRESCTL_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds; 0 disables periodic polling.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

/// A named device profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Device host, `host:port` or URL (e.g. "192.168.1.50").
    pub host: String,

    pub timeout: Option<u64>,

    pub poll_interval: Option<u64>,

    // Instance lists; unset means the stock hardware layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwm_outputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switches: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwm_switches: Option<Vec<String>>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }
}

impl Config {
    /// Resolve a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `CRESCTL_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "cresctl", "cresctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("cresctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CRESCTL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile, filling unset values from
/// the global defaults.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }
    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut cfg = CoordinatorConfig::new(profile.host.trim())
        .with_timeout(Duration::from_secs(timeout))
        .with_poll_interval(Duration::from_secs(
            profile.poll_interval.unwrap_or(defaults.poll_interval),
        ));

    if let Some(ref v) = profile.outputs {
        cfg.outputs.clone_from(v);
    }
    if let Some(ref v) = profile.pwm_outputs {
        cfg.pwm_outputs.clone_from(v);
    }
    if let Some(ref v) = profile.inputs {
        cfg.inputs.clone_from(v);
    }
    if let Some(ref v) = profile.switches {
        cfg.switches.clone_from(v);
    }
    if let Some(ref v) = profile.pwm_switches {
        cfg.pwm_switches.clone_from(v);
    }
    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults, Defaults::default());
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn defaults_carry_only_consumed_settings() {
        let rendered = toml::to_string(&Defaults::default()).unwrap();
        assert_eq!(rendered, "timeout = 5\npoll_interval = 30\n");
    }

    #[test]
    fn save_then_load_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut tent = Profile::new("192.168.1.50");
        tent.poll_interval = Some(10);
        tent.switches = Some(vec!["12v".into()]);
        cfg.profiles.insert("tent".into(), tent.clone());
        cfg.default_profile = Some("tent".into());
        save_config_to(&path, &cfg).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let (name, profile) = loaded.profile(None).unwrap();
        assert_eq!(name, "tent");
        assert_eq!(profile, &tent);
    }

    #[test]
    fn toml_profile_translates_to_coordinator_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "veg"

[defaults]
timeout = 3

[profiles.veg]
host = "10.0.0.7"
poll_interval = 0
outputs = ["a", "b"]
pwm_outputs = []
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        let (_, profile) = cfg.profile(None).unwrap();
        let coordinator = profile_to_coordinator_config(profile, &cfg.defaults).unwrap();

        assert_eq!(coordinator.address, "10.0.0.7");
        assert_eq!(coordinator.timeout, Duration::from_secs(3));
        assert!(coordinator.poll_interval.is_zero());
        assert_eq!(coordinator.outputs, ["a", "b"]);
        assert!(coordinator.pwm_outputs.is_empty());
        assert_eq!(coordinator.inputs, ["a", "b"]);
    }

    #[test]
    fn unknown_profile_and_empty_host_are_rejected() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        assert!(matches!(
            profile_to_coordinator_config(&Profile::new("  "), &Defaults::default()),
            Err(ConfigError::Validation { .. })
        ));
    }
}

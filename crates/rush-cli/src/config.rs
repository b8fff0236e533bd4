//! Configuration Vault – reads/writes `~/.rush/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rush_params::StoreConfig;

/// Persisted user configuration stored in `~/.rush/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Context namespace that relative namespaces resolve against.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Milliseconds to wait before each registry query.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// TOML parameter documents loaded into the registry at start-up.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params_files: Vec<PathBuf>,

    /// Namespaces loaded into the store at start-up.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub autoload: Vec<String>,
}

fn default_namespace() -> String {
    "/".to_string()
}
fn default_grace_period_ms() -> u64 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            grace_period_ms: default_grace_period_ms(),
            params_files: Vec::new(),
            autoload: Vec::new(),
        }
    }
}

impl Config {
    /// The [`StoreConfig`] described by this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_grace_period(Duration::from_millis(self.grace_period_ms))
    }
}

/// Return the path to `~/.rush/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rush").join("config.toml")
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Defaults with `RUSH_*` overrides applied, for when no config file can be
/// used (missing or unparsable).
pub fn defaults_with_env_overrides() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply `RUSH_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `RUSH_NAMESPACE` | `namespace` |
/// | `RUSH_GRACE_PERIOD_MS` | `grace_period_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("RUSH_NAMESPACE") {
        cfg.namespace = v;
    }
    if let Ok(v) = std::env::var("RUSH_GRACE_PERIOD_MS")
        && let Ok(ms) = v.parse::<u64>() {
            cfg.grace_period_ms = ms;
        }
}

/// Save the config to `path`, creating its parent directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

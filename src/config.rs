use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::merge::EvictionKind;

static DEFAULT_CONFIG_NAME: &str = "purgetools";

/// Settings for the whole toolkit. Built once at process start and handed to
/// each stage by reference.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub merge: MergeConfig,
    pub purge: PurgeConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// MPI launcher. When unset the indexing tool runs directly.
    pub launcher: Option<PathBuf>,
    pub launcher_args: Vec<String>,
    pub romio: Option<String>,
    pub dwalk: PathBuf,
    pub distribution: String,
    pub ignore_paths: Vec<String>,
    pub ignore_missing: bool,
    pub output_dir: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            launcher: None,
            launcher_args: vec![
                "--allow-run-as-root".to_string(),
                "--oversubscribe".to_string(),
            ],
            romio: None,
            dwalk: PathBuf::from("dwalk"),
            distribution: "size:0,1K,1M,100M,1G,1T".to_string(),
            ignore_paths: Vec::new(),
            ignore_missing: false,
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeConfig {
    pub cache_limit: usize,
    pub eviction: EvictionKind,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            cache_limit: 100,
            eviction: EvictionKind::Insertion,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PurgeConfig {
    pub stage_path: Option<PathBuf>,
    pub check_ctime: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            stage_path: None,
            check_ctime: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub notify_path: Option<PathBuf>,
    /// Octal permission string applied to published ledgers.
    pub mode: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            notify_path: None,
            mode: "0400".to_string(),
        }
    }
}

impl NotifyConfig {
    pub fn mode_bits(&self) -> Result<u32> {
        u32::from_str_radix(self.mode.trim_start_matches("0o"), 8)
            .map_err(|e| Error::Config(format!("invalid notify mode '{}': {}", self.mode, e)))
    }
}

/// Read `purgetools.toml` (or `$PURGETOOLS_CONFIG`) and `PURGETOOLS__*` overrides.
pub fn load_configuration() -> std::result::Result<AppConfig, ConfigError> {
    let name = env::var("PURGETOOLS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_NAME.to_string());
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(&name).required(false))
        .add_source(
            Environment::with_prefix("PURGETOOLS")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Split a comma separated list, dropping empty entries.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

//! Configuration loading for nrs.
//!
//! Configuration is layered from up to three TOML files, lowest priority
//! first: the user file (`~/.config/nrs/config.toml`), the project file
//! (`.nrsrc.toml` next to `package.json`) and an explicit `--config` file.
//! Tables are merged key by key. `exclude.patterns` lists are concatenated
//! instead of replaced.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::Deserialize;
use toml::{Table, Value};

use crate::app_state::SortMode;
use crate::error::{Error, Result};
use crate::history::default_history_path;
use crate::runner::RunnerKind;

/// Default path for the user configuration file
const DEFAULT_USER_CONFIG_PATH: &str = "~/.config/nrs/config.toml";

/// File name of the per-project configuration file
pub const PROJECT_CONFIG_FILE_NAME: &str = ".nrsrc.toml";

/// Default shell to use for command execution
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Keys whose arrays are appended when layers are merged.
const APPENDED_KEYS: [&str; 1] = ["exclude.patterns"];

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Minimal,
    #[serde(rename = "none")]
    Plain,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    pub runner: Option<RunnerKind>,
    pub default_sort: SortMode,
    pub show_lifecycle: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub search_descriptions: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            search_descriptions: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub path: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            enabled: true,
            path: None,
        }
    }
}

impl HistoryConfig {
    /// The history file path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
            None => default_history_path(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ExcludeConfig {
    pub patterns: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppearanceConfig {
    pub theme: Theme,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Alternative names accepted by `--script`.
    pub aliases: IndexMap<String, String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub filter: FilterConfig,
    pub history: HistoryConfig,
    pub exclude: ExcludeConfig,
    pub appearance: AppearanceConfig,
    pub scripts: ScriptsConfig,
}

impl Config {
    /// Resolves a configured alias, or returns `name` unchanged.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.scripts
            .aliases
            .get(name)
            .map_or(name, String::as_str)
    }
}

pub fn get_user_config_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_USER_CONFIG_PATH).to_string())
}

pub fn get_project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_CONFIG_FILE_NAME)
}

fn read_table(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io_error("config", &path.display().to_string(), e))?;
    content
        .parse::<Table>()
        .map_err(|e| Error::config_error(&path.display().to_string(), e.message()))
}

fn merge_tables(base: &mut Table, overlay: Table, prefix: &str) {
    for (key, value) in overlay {
        let key_path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        let merged = match (base.remove(&key), value) {
            (Some(Value::Table(mut existing)), Value::Table(incoming)) => {
                merge_tables(&mut existing, incoming, &key_path);
                Value::Table(existing)
            }
            (Some(Value::Array(mut existing)), Value::Array(incoming))
                if APPENDED_KEYS.contains(&key_path.as_str()) =>
            {
                existing.extend(incoming);
                Value::Array(existing)
            }
            (_, value) => value,
        };

        base.insert(key, merged);
    }
}

/// Loads and merges configuration from explicit file locations.
///
/// Missing `user` or project files are skipped. Files that fail to parse are
/// skipped with a warning, as is a merged result that doesn't fit the schema.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `explicit` is given but doesn't exist.
pub fn load_config_from(
    user: Option<&Path>,
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<Config> {
    if let Some(explicit) = explicit {
        if !explicit.is_file() {
            return Err(Error::InvalidConfig(explicit.display().to_string()));
        }
    }

    let project = get_project_config_path(project_dir);
    let layers = [user, Some(project.as_path()), explicit];

    let mut merged = Table::new();
    for path in layers.into_iter().flatten() {
        if !path.is_file() {
            continue;
        }
        match read_table(path) {
            Ok(table) => {
                debug!("Loaded config from `{}`", path.display());
                merge_tables(&mut merged, table, "");
            }
            Err(e) => warn!("{e}; ignoring this file"),
        }
    }

    let decoded: std::result::Result<Config, _> = Value::Table(merged).try_into();
    match decoded {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(
                "{}; using default configuration",
                Error::config_error("merged configuration", e.to_string())
            );
            Ok(Config::default())
        }
    }
}

/// Loads configuration for a project. With `no_config` every file is skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `explicit` is given but doesn't exist.
pub fn load_config(project_dir: &Path, explicit: Option<&Path>, no_config: bool) -> Result<Config> {
    if no_config {
        debug!("Configuration files disabled");
        return Ok(Config::default());
    }

    let user = get_user_config_path();
    load_config_from(Some(user.as_path()), project_dir, explicit)
}

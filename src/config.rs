//! Settings loading and environment projection

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::naming::constant_case;

pub const SETTINGS_FILE: &str = "rns.toml";
const APP_DIR_NAME: &str = "rn-scaffold";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub workspace: WorkspaceSettings,
    pub app: AppConfig,
}

/// Knobs for the creation flow. Not exposed to the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Scratch directory the generator runs in.
    pub scratch_location: PathBuf,
    pub generator_package: String,
    /// Nominal time the generator takes, for progress simulation.
    pub generation_horizon_ms: u64,
    /// Percentage points the generator step is worth.
    pub generation_increase: f64,
    pub tick_interval_ms: u64,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            scratch_location: PathBuf::from("./tmp"),
            generator_package: "@react-native-community/cli@latest".to_string(),
            generation_horizon_ms: 60_000,
            generation_increase: 68.0,
            tick_interval_ms: 500,
        }
    }
}

impl WorkspaceSettings {
    pub fn generation_horizon(&self) -> Duration {
        Duration::from_millis(self.generation_horizon_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Orchestration configuration shared with the app through its environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub apps_location: PathBuf,
    /// Any other keys, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            apps_location: PathBuf::from("./src/react-apps"),
            extra: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Every config key as an upper snake case environment variable.
    pub fn environment(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(
            constant_case("appsLocation"),
            self.apps_location.display().to_string(),
        );
        for (key, value) in &self.extra {
            env.insert(constant_case(key), env_value(value));
        }
        env
    }
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Settings {
    /// Load settings from `explicit`, or the first settings file found in
    /// `cwd` or the user config directory. Falls back to defaults.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = cwd.join(SETTINGS_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(global) = global_settings_path() {
            if global.exists() {
                return Self::from_file(&global);
            }
        }

        tracing::debug!("no settings file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

pub fn global_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
}

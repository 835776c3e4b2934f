//! Settings file (`config.toml` in the data directory).
//!
//! Three sections: `[database]` picks the file and the busy timeout,
//! `[calendar]` sets the slot used for day-only due dates, and `[log]`
//! holds the default tracing filter for the CLI.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::calendar::DueSlot;
use crate::error::ConfigError;

const SLOT_START_FORMAT: &str = "%H:%M";

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// File name inside the data directory, or an absolute path.
    #[serde(default = "default_db_file")]
    pub file: String,
    /// How long a writer waits for a competing writer before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Calendar configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Start of the slot given to day-only due dates, `HH:MM`.
    #[serde(default = "default_slot_start")]
    pub default_start: String,
    #[serde(default = "default_slot_minutes")]
    pub default_duration_minutes: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_db_file() -> String {
    "chronoboard.db".to_string()
}
fn default_busy_timeout_ms() -> u64 {
    5_000
}
fn default_slot_start() -> String {
    "07:00".to_string()
}
fn default_slot_minutes() -> u32 {
    30
}
fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file: default_db_file(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            default_start: default_slot_start(),
            default_duration_minutes: default_slot_minutes(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl DatabaseConfig {
    /// Relative names resolve against the data directory.
    pub fn path(&self) -> Result<PathBuf, ConfigError> {
        let file = Path::new(&self.file);
        if file.is_absolute() {
            Ok(file.to_path_buf())
        } else {
            Ok(data_dir()?.join(file))
        }
    }

    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout_ms)
    }
}

impl CalendarConfig {
    /// Fails when `default_start` is not `HH:MM`.
    pub fn due_slot(&self) -> Result<DueSlot, ConfigError> {
        let start = NaiveTime::parse_from_str(self.default_start.trim(), SLOT_START_FORMAT).map_err(|e| {
            ConfigError::InvalidValue {
                key: "calendar.default_start".to_string(),
                message: format!("expected HH:MM, got '{}': {e}", self.default_start),
            }
        })?;
        Ok(DueSlot::new(start, self.default_duration_minutes))
    }
}

/// `calendar.default_start` becomes `/calendar/default_start`.
fn pointer(key: &str) -> Option<String> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return None;
    }
    Some(format!("/{}", key.replace('.', "/")))
}

/// Replace a leaf in place, keeping the JSON type it already had.
fn assign(slot: &mut serde_json::Value, raw: &str) -> Result<(), String> {
    use serde_json::Value;
    *slot = match slot {
        Value::Bool(_) => Value::Bool(raw.parse().map_err(|_| format!("'{raw}' is not true/false"))?),
        Value::Number(_) => Value::from(raw.parse::<u64>().map_err(|_| format!("'{raw}' is not a whole number"))?),
        Value::String(_) => Value::String(raw.to_string()),
        _ => return Err("not a settable value".to_string()),
    };
    Ok(())
}

impl Config {
    /// `<data dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Read the settings file, creating it with defaults on first use.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        if !path.exists() {
            let fresh = Self::default();
            fresh.save_to(path)?;
            tracing::info!(path = %path.display(), "wrote default settings");
            return Ok(fresh);
        }
        let text = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        toml::from_str(&text).map_err(|e| load_failed(e.to_string()))
    }

    /// Like [`Config::load`], but falls back to defaults and logs why.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "settings unavailable, using built-in values");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let text = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| save_failed(e.to_string()))
    }

    /// Read one leaf by dotted key. Sections and unknown keys yield `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        let tree = serde_json::to_value(self).ok()?;
        match tree.pointer(&pointer(key)?)? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Object(_) => None,
            leaf => Some(leaf.to_string()),
        }
    }

    /// Change one leaf in memory. The result must still deserialize and
    /// yield a usable calendar slot, otherwise `self` is left untouched.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut tree = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let path = pointer(key).ok_or_else(unknown)?;
        let leaf = tree
            .pointer_mut(&path)
            .filter(|leaf| !leaf.is_object())
            .ok_or_else(unknown)?;
        assign(leaf, value).map_err(invalid)?;

        let candidate: Config = serde_json::from_value(tree).map_err(|e| invalid(e.to_string()))?;
        candidate.calendar.due_slot()?;
        *self = candidate;
        Ok(())
    }

    /// [`Config::apply`] followed by [`Config::save`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }
}

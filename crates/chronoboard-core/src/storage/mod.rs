mod config;
pub mod database;
pub mod event_store;
pub mod migrations;
pub mod task_store;

pub use config::{CalendarConfig, Config, DatabaseConfig, LogConfig};
pub use database::Database;
pub use event_store::{EventScan, EventStore};
pub use task_store::TaskStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable that overrides the data directory outright.
pub const DATA_DIR_ENV: &str = "CHRONOBOARD_DATA_DIR";

/// Returns `~/.config/chronoboard[-dev]/` based on CHRONOBOARD_ENV.
///
/// Set CHRONOBOARD_ENV=dev to use the development data directory, or
/// CHRONOBOARD_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("CHRONOBOARD_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("chronoboard-dev")
            } else {
                base_dir.join("chronoboard")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

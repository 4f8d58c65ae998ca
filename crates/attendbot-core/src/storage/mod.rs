mod config;
pub mod snapshot;

pub use config::Config;
pub use snapshot::{JsonFileSnapshot, PersistedSession, SnapshotPersistence, StateSnapshot};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/attendbot[-dev]/` based on ATTENDBOT_ENV.
///
/// Set ATTENDBOT_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the config directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ATTENDBOT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("attendbot-dev")
    } else {
        base_dir.join("attendbot")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}

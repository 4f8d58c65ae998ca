//! TOML-based application configuration.
//!
//! Stores the operational knobs of the attendance core:
//! - daily rest quota
//! - shared break-slot cap
//! - office UTC offset
//! - reaper cadence and stale-break ceiling
//!
//! Configuration is stored at `~/.config/attendbot/config.toml`.

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::clock::offset_from_hours;
use crate::error::ConfigError;

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/attendbot/config.toml`.
/// Every field has a serde default so partial files load cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Daily rest quota shared across break categories, in minutes.
    #[serde(default = "default_quota_minutes")]
    pub quota_minutes: u32,
    /// Concurrent users allowed per break category.
    #[serde(default = "default_max_break_slots")]
    pub max_break_slots: usize,
    /// Office zone as whole hours east of UTC.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Cadence of the background stale-break reaper.
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// Absolute ceiling on a single break before the reaper closes it.
    #[serde(default = "default_break_ceiling_hours")]
    pub break_ceiling_hours: i64,
}

fn default_quota_minutes() -> u32 {
    60
}
fn default_max_break_slots() -> usize {
    4
}
fn default_utc_offset_hours() -> i32 {
    7
}
fn default_reaper_interval_secs() -> u64 {
    30
}
fn default_break_ceiling_hours() -> i64 {
    6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quota_minutes: default_quota_minutes(),
            max_break_slots: default_max_break_slots(),
            utc_offset_hours: default_utc_offset_hours(),
            reaper_interval_secs: default_reaper_interval_secs(),
            break_ceiling_hours: default_break_ceiling_hours(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default file when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn quota(&self) -> Duration {
        Duration::minutes(i64::from(self.quota_minutes))
    }

    /// Falls back to UTC when the configured offset is out of range.
    pub fn offset(&self) -> FixedOffset {
        offset_from_hours(self.utc_offset_hours).unwrap_or_else(|| Utc.fix())
    }

    pub fn reaper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reaper_interval_secs)
    }

    pub fn break_ceiling(&self) -> Duration {
        Duration::hours(self.break_ceiling_hours)
    }

    /// Where the best-effort state snapshot lives.
    pub fn snapshot_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("sessions.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.quota_minutes, 60);
        assert_eq!(parsed.max_break_slots, 4);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("max_break_slots = 2\n").unwrap();
        assert_eq!(parsed.max_break_slots, 2);
        assert_eq!(parsed.quota_minutes, 60);
        assert_eq!(parsed.reaper_interval_secs, 30);
        assert_eq!(parsed.break_ceiling_hours, 6);
    }

    #[test]
    fn derived_values() {
        let cfg = Config::default();
        assert_eq!(cfg.quota(), Duration::hours(1));
        assert_eq!(cfg.break_ceiling(), Duration::hours(6));
        assert_eq!(cfg.offset().local_minus_utc(), 7 * 3600);
        assert_eq!(cfg.reaper_interval(), std::time::Duration::from_secs(30));
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let cfg = Config {
            utc_offset_hours: 99,
            ..Config::default()
        };
        assert_eq!(cfg.offset().local_minus_utc(), 0);
    }
}

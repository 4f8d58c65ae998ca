//! Shared wiring for CLI commands.

use std::sync::Arc;

use attendbot_core::clock::SystemClock;
use attendbot_core::storage::{self, Config};
use attendbot_core::{BreakCategory, JsonFileSnapshot, JsonlSink, SessionManager};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Build a manager wired to the on-disk snapshot and summary log.
/// Construction restores the last snapshot and reconciles stale breaks.
pub fn open_manager() -> Result<SessionManager, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let snapshot = JsonFileSnapshot::new(Config::snapshot_path()?);
    let sink = JsonlSink::new(summaries_path()?);
    let clock = SystemClock::new(config.offset());
    Ok(SessionManager::new(
        &config,
        Box::new(snapshot),
        Arc::new(clock),
        Box::new(sink),
    ))
}

/// Where clock-out summaries are appended, one JSON line each.
pub fn summaries_path() -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    Ok(storage::data_dir()?.join("summaries.jsonl"))
}

pub fn parse_category(s: &str) -> Result<BreakCategory, String> {
    match s.to_ascii_lowercase().as_str() {
        "restroom" | "wc" => Ok(BreakCategory::Restroom),
        "smoking" | "smoke" => Ok(BreakCategory::Smoking),
        other => Err(format!(
            "unknown break category '{other}' (expected restroom or smoking)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_aliases_parse() {
        assert_eq!(parse_category("restroom"), Ok(BreakCategory::Restroom));
        assert_eq!(parse_category("WC"), Ok(BreakCategory::Restroom));
        assert_eq!(parse_category("smoking"), Ok(BreakCategory::Smoking));
        assert_eq!(parse_category("smoke"), Ok(BreakCategory::Smoking));
        assert!(parse_category("coffee").is_err());
    }
}

use clap::Subcommand;

use attendbot_core::Config;

use crate::common::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "quota_minutes", "max_break_slots")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match get(&config, &key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            set(&mut config, &key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

fn get(config: &Config, key: &str) -> Option<String> {
    match key {
        "quota_minutes" => Some(config.quota_minutes.to_string()),
        "max_break_slots" => Some(config.max_break_slots.to_string()),
        "utc_offset_hours" => Some(config.utc_offset_hours.to_string()),
        "reaper_interval_secs" => Some(config.reaper_interval_secs.to_string()),
        "break_ceiling_hours" => Some(config.break_ceiling_hours.to_string()),
        _ => None,
    }
}

fn set(config: &mut Config, key: &str, value: &str) -> CliResult {
    match key {
        "quota_minutes" => config.quota_minutes = value.parse()?,
        "max_break_slots" => config.max_break_slots = value.parse()?,
        "utc_offset_hours" => config.utc_offset_hours = value.parse()?,
        "reaper_interval_secs" => config.reaper_interval_secs = value.parse()?,
        "break_ceiling_hours" => config.break_ceiling_hours = value.parse()?,
        _ => return Err(format!("unknown key: {key}").into()),
    }
    Ok(())
}

use std::fs;
use std::io::ErrorKind;

use chrono::NaiveDate;
use clap::Subcommand;

use attendbot_core::summary::{AttendanceSummary, SummaryLog};

use crate::common::{open_manager, summaries_path, CliResult};

#[derive(Subcommand)]
pub enum StatusAction {
    /// Print a user's session as JSON
    Info {
        /// Sender user id
        #[arg(long)]
        user: i64,
    },
    /// Show break occupancy per category
    Capacity {
        /// Print as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
    /// Render the attendance report for a date (default today)
    Report {
        /// Date as YYYY-MM-DD
        date: Option<NaiveDate>,
    },
}

pub fn run(action: StatusAction) -> CliResult {
    match action {
        StatusAction::Info { user } => {
            let manager = open_manager()?;
            match manager.session_info(user) {
                Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
                None => println!("no session for user {user}"),
            }
        }
        StatusAction::Capacity { json } => {
            let mut manager = open_manager()?;
            let view = manager.capacity_snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", view.render());
            }
        }
        StatusAction::Report { date } => {
            let manager = open_manager()?;
            let date = date.unwrap_or_else(|| manager.now().date_naive());
            println!("{}", load_summary_log()?.render_report(date));
        }
    }
    Ok(())
}

/// Rebuild the summary log from the JSONL file so reports survive
/// process restarts. Malformed lines are skipped.
fn load_summary_log() -> Result<SummaryLog, Box<dyn std::error::Error>> {
    let mut log = SummaryLog::default();
    let content = match fs::read_to_string(summaries_path()?) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(log),
        Err(e) => return Err(e.into()),
    };
    for line in content.lines() {
        if let Ok(summary) = serde_json::from_str::<AttendanceSummary>(line) {
            log.push(summary);
        }
    }
    Ok(log)
}

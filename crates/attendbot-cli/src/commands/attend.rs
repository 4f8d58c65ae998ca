use clap::Subcommand;

use attendbot_core::{Command, CommandEvent};

use crate::common::{open_manager, CliResult};

#[derive(Subcommand)]
pub enum AttendAction {
    /// Clock in (replaces any existing session for the user)
    ClockIn {
        /// Sender user id
        #[arg(long)]
        user: i64,
        /// Display name recorded on the session
        #[arg(long)]
        name: String,
    },
    /// Clock out and print the day summary
    ClockOut {
        /// Sender user id
        #[arg(long)]
        user: i64,
    },
}

pub fn run(action: AttendAction) -> CliResult {
    let mut manager = open_manager()?;
    let at = manager.now();
    let (command, user_id, display_name) = match action {
        AttendAction::ClockIn { user, name } => (Command::ClockIn, user, name),
        AttendAction::ClockOut { user } => (Command::ClockOut, user, String::new()),
    };
    let reply = manager.handle(CommandEvent {
        command,
        user_id,
        display_name,
        at,
    });
    println!("{reply}");
    Ok(())
}

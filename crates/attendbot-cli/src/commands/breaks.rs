use clap::Subcommand;

use attendbot_core::{BreakCategory, Command, CommandEvent};

use crate::common::{open_manager, parse_category, CliResult};

#[derive(Subcommand)]
pub enum BreakAction {
    /// Start a break in the given category
    Start {
        /// Sender user id
        #[arg(long)]
        user: i64,
        /// Break category: restroom (wc) or smoking (smoke)
        #[arg(value_parser = parse_category)]
        category: BreakCategory,
    },
    /// End the running break
    End {
        /// Sender user id
        #[arg(long)]
        user: i64,
    },
}

pub fn run(action: BreakAction) -> CliResult {
    let mut manager = open_manager()?;
    let at = manager.now();
    let (command, user_id) = match action {
        BreakAction::Start { user, category } => (Command::StartBreak(category), user),
        BreakAction::End { user } => (Command::EndBreak, user),
    };
    let reply = manager.handle(CommandEvent {
        command,
        user_id,
        display_name: String::new(),
        at,
    });
    println!("{reply}");
    Ok(())
}

use clap::Subcommand;

use attendbot_core::session::fmt_hms;

use crate::common::{open_manager, CliResult};

#[derive(Subcommand)]
pub enum AdminAction {
    /// Zero a user's break counters without closing the session
    ResetActivity {
        /// Sender user id
        #[arg(long)]
        user: i64,
    },
    /// Delete a user's session entirely
    ResetSession {
        /// Sender user id
        #[arg(long)]
        user: i64,
    },
    /// Wipe every session and all break capacity
    ResetAll,
    /// Force-close running breaks and empty both occupant sets
    ClearCapacity,
    /// Run one stale-break reconciliation pass
    Reap,
}

pub fn run(action: AdminAction) -> CliResult {
    let mut manager = open_manager()?;
    match action {
        AdminAction::ResetActivity { user } => match manager.reset_activity(user) {
            Ok(reply) => println!("{reply}"),
            Err(e) => println!("{e}"),
        },
        AdminAction::ResetSession { user } => match manager.reset_session(user) {
            Ok(reply) => println!("{reply}"),
            Err(e) => println!("{e}"),
        },
        AdminAction::ResetAll => println!("{}", manager.admin_reset_all()),
        AdminAction::ClearCapacity => println!("{}", manager.clear_capacity()),
        AdminAction::Reap => {
            let reaped = manager.reap_now();
            if reaped.is_empty() {
                println!("nothing to reap");
            } else {
                for r in reaped {
                    println!(
                        "closed {} break for {} after {}",
                        r.category,
                        r.display_name,
                        fmt_hms(r.elapsed)
                    );
                }
            }
        }
    }
    Ok(())
}

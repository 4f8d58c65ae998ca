use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "attendbot-cli", version, about = "Attendbot CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clock in and out
    Attend {
        #[command(subcommand)]
        action: commands::attend::AttendAction,
    },
    /// Break start/end
    Break {
        #[command(subcommand)]
        action: commands::breaks::BreakAction,
    },
    /// Session, capacity and report queries
    Status {
        #[command(subcommand)]
        action: commands::status::StatusAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Administrative resets and maintenance
    Admin {
        #[command(subcommand)]
        action: commands::admin::AdminAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Attend { action } => commands::attend::run(action),
        Commands::Break { action } => commands::breaks::run(action),
        Commands::Status { action } => commands::status::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Admin { action } => commands::admin::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "attendbot-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

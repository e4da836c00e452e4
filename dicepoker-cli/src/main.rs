mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use dicepoker_core::LedgerError;
use dicepoker_game::GameError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dicepoker")]
#[command(about = "DicePoker - two-player dice wagering against a shared ledger")]
#[command(version)]
struct Cli {
    /// Data directory for the local ledger, audit log and config.json
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a remote ledger at this URL instead of the local one
    #[arg(long, global = true)]
    ledger_url: Option<String>,

    /// Per-request ledger timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session management commands
    #[command(subcommand)]
    Session(commands::SessionCommands),

    /// Show a session as a player or spectator would see it
    Status {
        /// Session ID
        session: String,
        /// View the table as this player
        #[arg(short, long)]
        player: Option<String>,
    },

    /// Play a session interactively
    Play {
        /// Session ID
        session: String,
        /// Your player address
        #[arg(short, long)]
        player: String,
    },

    /// Show the action audit log
    Log {
        /// Only show actions of this session
        #[arg(short, long)]
        session: Option<String>,
        /// Maximum number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "dicepoker={},dicepoker_game={},dicepoker_core={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    tokio::fs::create_dir_all(&data_dir).await?;

    let config = CliConfig::load(&data_dir)?.with_overrides(cli.ledger_url, cli.timeout_secs);

    // Execute command
    let result = match cli.command {
        Commands::Session(cmd) => commands::handle_session_command(cmd, &config).await,
        Commands::Status { session, player } => {
            commands::show_status(&config, &session, player.as_deref()).await
        }
        Commands::Play { session, player } => {
            commands::play_session(&config, &session, &player).await
        }
        Commands::Log { session, limit } => {
            commands::show_log(&config, session.as_deref(), limit).await
        }
    };

    if let Err(e) = result {
        if let Some(LedgerError::SessionNotFound(id)) = e.downcast_ref::<LedgerError>() {
            eprintln!("Error: Session '{}' not found", id);
            eprintln!("Use 'dicepoker session list' to see available sessions");
        } else if let Some(GameError::LedgerUnavailable(reason)) = e.downcast_ref::<GameError>() {
            eprintln!("Error: Ledger unavailable: {}", reason);
            eprintln!("Check --ledger-url or try again later");
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

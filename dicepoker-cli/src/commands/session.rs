use crate::commands::status::format_amount;
use crate::config::CliConfig;
use anyhow::{bail, Result};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dicepoker_core::{Amount, LedgerBackend, LocalLedger, PlayerAddress};
use dicepoker_game::GamePhase;

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Create a new session on the local ledger
    New,
    /// List sessions on the local ledger
    List,
}

pub async fn handle_session_command(cmd: SessionCommands, config: &CliConfig) -> Result<()> {
    let LedgerBackend::Local { db_path } = &config.ledger.backend else {
        bail!("Sessions can only be managed on the local ledger");
    };
    let ledger = LocalLedger::open(db_path).await?;

    match cmd {
        SessionCommands::New => {
            let id = ledger.create_session().await?;

            println!("Created session {}", id);
            println!();
            println!("Both players can now join with:");
            println!("dicepoker play {} --player <address>", id);
        }

        SessionCommands::List => {
            let sessions = ledger.list_sessions().await?;

            if sessions.is_empty() {
                println!("No sessions found.");
                println!("Create one with: dicepoker session new");
                return Ok(());
            }

            let denomination = config.denomination()?;
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Session", "Phase", "P1", "P2", "Pot", "Updated"]);

            for record in sessions {
                let phase = GamePhase::try_from(record.phase)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|_| format!("unknown ({})", record.phase));
                let [p1, p2] = record.players.clone().map(|p| {
                    let address = PlayerAddress::new(&p);
                    if address.is_empty_slot() {
                        "empty".to_string()
                    } else {
                        address.to_string()
                    }
                });
                let pot = Amount::from_sat(record.bets[0].saturating_add(record.bets[1]));

                table.add_row(vec![
                    record.id.to_string(),
                    phase,
                    p1,
                    p2,
                    format_amount(pot, denomination),
                    record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }

            println!("Sessions:");
            println!("{}", table);
        }
    }

    Ok(())
}

use crate::commands::parse_session;
use crate::commands::status::{format_amount, print_view};
use crate::config::CliConfig;
use anyhow::Result;
use dialoguer::Input;
use dicepoker_core::{AuditStore, Denomination, PlayerAddress, Storage};
use dicepoker_game::{
    render, ActionMenu, GameError, GameEvent, GameOrchestrator, OrchestratorConfig, Outcome,
    Participant, TableView,
};
use std::sync::Arc;

/// Terminal participant: numbered menu typed as text so any input can be
/// checked against the menu.
pub struct DialoguerParticipant {
    denomination: Denomination,
}

impl DialoguerParticipant {
    pub fn new(denomination: Denomination) -> Self {
        Self { denomination }
    }

    fn prompt(&self, prompt: &str) -> dicepoker_game::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| GameError::participant(e.to_string()))
    }
}

impl Participant for DialoguerParticipant {
    fn choose(&mut self, view: &TableView, menu: &ActionMenu) -> dicepoker_game::Result<String> {
        println!();
        print_view(view, self.denomination);
        for (i, entry) in menu.entries().iter().enumerate() {
            println!("  {}. {}", i + 1, entry.label);
        }
        self.prompt("Choose an action")
    }

    fn enter_amount(&mut self, prompt: &str) -> dicepoker_game::Result<String> {
        self.prompt(prompt)
    }

    fn notify(&mut self, event: &GameEvent) {
        match event {
            GameEvent::LedgerUnavailable(reason) => {
                eprintln!("Ledger unavailable: {}. Retrying...", reason)
            }
            GameEvent::MalformedSnapshot(reason) => {
                eprintln!("Ledger returned an invalid state: {}", reason)
            }
            GameEvent::InvalidSelection(reason) | GameEvent::InvalidAmount(reason) => {
                println!("{}", reason)
            }
            GameEvent::NothingToCall => println!("Nothing to call."),
            GameEvent::Calling(amount) => {
                println!("Calling {}", format_amount(*amount, self.denomination))
            }
            GameEvent::Submitted { action, amount } => match amount {
                Some(amount) => println!(
                    "Submitted {} of {}, waiting for confirmation...",
                    action,
                    format_amount(*amount, self.denomination)
                ),
                None => println!("Submitted {}, waiting for confirmation...", action),
            },
            GameEvent::Confirmed(confirmation) => {
                println!("{} confirmed.", confirmation.action)
            }
            GameEvent::Rejected(reason) => println!("Rejected: {}", reason),
            GameEvent::Hands([p1, p2]) => {
                println!("P1: {}", render(p1));
                println!("P2: {}", render(p2));
            }
            GameEvent::Outcome(outcome) => {
                println!();
                println!("------ GAME OVER ------");
                for (i, (hand, sum)) in outcome.hands.iter().zip(outcome.sums).enumerate() {
                    let faces: Vec<String> = hand.iter().map(u8::to_string).collect();
                    println!("P{}: {} (total {})", i + 1, faces.join(", "), sum);
                }
                match outcome.result {
                    Outcome::Winner(seat) => println!("Winner: {}", seat),
                    Outcome::Tie => println!("It's a tie!"),
                }
            }
            GameEvent::Exiting => println!("Bye."),
        }
    }
}

pub async fn play_session(config: &CliConfig, session: &str, player: &str) -> Result<()> {
    let session_id = parse_session(session)?;
    let viewer = PlayerAddress::new(player);
    if viewer.is_empty_slot() {
        anyhow::bail!("'{}' is not a usable player address", player);
    }

    let denomination = config.denomination()?;
    let ledger = dicepoker_core::connect(&config.ledger).await?;
    let audit = AuditStore::new(Arc::new(Storage::new(&config.db_path()).await?));

    let mut orchestrator = GameOrchestrator::new(ledger, session_id, viewer)
        .with_config(OrchestratorConfig {
            denomination,
            ..OrchestratorConfig::from(&config.ledger)
        })
        .with_audit(Arc::new(audit));

    tracing::info!("Playing session {} as {}", session_id, player);
    let mut participant = DialoguerParticipant::new(denomination);
    orchestrator.run(&mut participant).await?;
    Ok(())
}

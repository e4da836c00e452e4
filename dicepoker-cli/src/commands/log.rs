use crate::commands::parse_session;
use crate::config::CliConfig;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use dicepoker_core::{AuditOutcome, AuditStore, Storage};
use std::sync::Arc;

pub async fn show_log(config: &CliConfig, session: Option<&str>, limit: usize) -> Result<()> {
    let session = session.map(parse_session).transpose()?;
    let storage = Arc::new(Storage::new(&config.db_path()).await?);
    let audit = AuditStore::new(storage);

    let entries = audit.list(session.as_ref(), limit).await?;
    if entries.is_empty() {
        println!("No actions recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Time", "Session", "Player", "Action", "Params", "Result", "ms",
    ]);

    for entry in entries {
        let result = match &entry.outcome {
            AuditOutcome::Confirmed(_) => "confirmed".to_string(),
            AuditOutcome::Failed(reason) => format!("failed: {}", reason),
        };
        let session = entry.session.to_string();

        table.add_row(vec![
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            session[..8].to_string(),
            entry.actor.to_string(),
            entry.action.to_string(),
            entry.params.to_string(),
            result,
            entry.duration_ms.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

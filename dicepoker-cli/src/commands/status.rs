use crate::commands::parse_session;
use crate::config::CliConfig;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use dicepoker_core::{Amount, Denomination, Ledger, PlayerAddress};
use dicepoker_game::{render, GameSession, TableView};

pub async fn show_status(config: &CliConfig, session: &str, player: Option<&str>) -> Result<()> {
    let session_id = parse_session(session)?;
    let denomination = config.denomination()?;
    let ledger = dicepoker_core::connect(&config.ledger).await?;

    let raw = ledger.read_state(&session_id).await?;
    let game = GameSession::load(&raw)?;
    let viewer = player
        .map(PlayerAddress::new)
        .unwrap_or_else(PlayerAddress::empty_slot);
    let view = TableView::build(&game, &viewer);

    println!("Session: {}", session_id);
    print_view(&view, denomination);
    Ok(())
}

pub(crate) fn print_view(view: &TableView, denomination: Denomination) {
    println!("Phase: {}", view.phase);
    println!(
        "Current bet level: {}",
        format_amount(view.current_bet_level, denomination)
    );
    match view.turn {
        Some(seat) => println!("Turn: {}", seat),
        None => println!("Turn: -"),
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Seat", "Player", "Bet", "Dice"]);

    for seat in &view.seats {
        let player = match &seat.address {
            Some(address) if seat.is_viewer => format!("{} (you)", address),
            Some(address) => address.to_string(),
            None => "empty".to_string(),
        };
        table.add_row(vec![
            seat.seat.to_string(),
            player,
            format_amount(seat.bet, denomination),
            render(&seat.hand),
        ]);
    }

    println!("{}", table);
}

pub(crate) fn format_amount(amount: Amount, denomination: Denomination) -> String {
    amount.display_in(denomination).show_denomination().to_string()
}

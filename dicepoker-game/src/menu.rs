use crate::error::{GameError, Result};
use crate::phase::GamePhase;
use crate::session::GameSession;
use crate::turn::{legal_action_kinds, ActionKind};
use dicepoker_core::PlayerAddress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub action: ActionKind,
    pub label: String,
}

/// Numbered options for one viewer. Phase-gated entries come first in
/// `ActionKind` order, then `ShowHands` and `Exit`, so numbering stays
/// stable across polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMenu {
    entries: Vec<MenuEntry>,
}

impl ActionMenu {
    pub fn build(session: &GameSession, viewer: &PlayerAddress) -> Self {
        let ctx = session.turn_context(viewer);

        let entries = legal_action_kinds(session.phase, &ctx)
            .into_iter()
            .chain([ActionKind::ShowHands, ActionKind::Exit])
            .map(|action| MenuEntry {
                action,
                label: label(action, session.phase).to_string(),
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, action: ActionKind) -> bool {
        self.entries.iter().any(|entry| entry.action == action)
    }

    /// 1-based position of `action`, as the participant would type it.
    pub fn number_of(&self, action: ActionKind) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.action == action)
            .map(|i| i + 1)
    }

    /// Parse a typed selection.
    pub fn select(&self, input: &str) -> Result<&MenuEntry> {
        let invalid = || GameError::InvalidSelection {
            input: input.trim().to_string(),
            max: self.entries.len(),
        };

        let choice: usize = input.trim().parse().map_err(|_| invalid())?;
        choice
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or_else(invalid)
    }
}

fn label(action: ActionKind, phase: GamePhase) -> &'static str {
    match action {
        ActionKind::Join => "Join Game",
        ActionKind::Bet => match phase {
            GamePhase::P1Bet1 | GamePhase::P1Bet2 => "Place Bet",
            _ => "Raise",
        },
        ActionKind::Call => "Call",
        ActionKind::Fold => "Fold",
        ActionKind::RevealFirstTranche => "Reveal 3 dice",
        ActionKind::RevealLastTranche => "Reveal 2 dice & finish",
        ActionKind::Reset => "Reset Game",
        ActionKind::ShowHands => "Show Hands",
        ActionKind::Exit => "Exit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::raw;
    use chrono::TimeDelta;
    use dicepoker_core::EMPTY_ADDRESS;

    fn actions(menu: &ActionMenu) -> Vec<ActionKind> {
        menu.entries().iter().map(|e| e.action).collect()
    }

    #[test]
    fn test_newcomer_sees_join_first() {
        let mut snapshot = raw(0);
        snapshot.players[1] = EMPTY_ADDRESS.to_string();
        let session = GameSession::load(&snapshot).unwrap();

        let menu = ActionMenu::build(&session, &PlayerAddress::new("0xCAFE"));
        assert_eq!(
            actions(&menu),
            vec![ActionKind::Join, ActionKind::ShowHands, ActionKind::Exit]
        );

        // A seated player cannot join twice.
        let menu = ActionMenu::build(&session, &PlayerAddress::new("0xA11CE"));
        assert_eq!(actions(&menu), vec![ActionKind::ShowHands, ActionKind::Exit]);
    }

    #[test]
    fn test_betting_menu_order_and_labels() {
        let session = GameSession::load(&raw(1)).unwrap();
        let menu = ActionMenu::build(&session, &PlayerAddress::new("0xa11ce"));
        assert_eq!(
            actions(&menu),
            vec![
                ActionKind::Bet,
                ActionKind::Call,
                ActionKind::Fold,
                ActionKind::ShowHands,
                ActionKind::Exit
            ]
        );
        assert_eq!(menu.entries()[0].label, "Place Bet");

        let session = GameSession::load(&raw(2)).unwrap();
        let menu = ActionMenu::build(&session, &PlayerAddress::new("0xb0b"));
        assert_eq!(menu.entries()[0].label, "Raise");

        // Off-turn player only gets the universal entries.
        let menu = ActionMenu::build(&session, &PlayerAddress::new("0xa11ce"));
        assert_eq!(actions(&menu), vec![ActionKind::ShowHands, ActionKind::Exit]);
    }

    #[test]
    fn test_reset_precedes_universal_entries() {
        let mut snapshot = raw(15);
        snapshot.last_terminal_at = Some(snapshot.observed_at - TimeDelta::seconds(5));
        let session = GameSession::load(&snapshot).unwrap();

        let menu = ActionMenu::build(&session, &PlayerAddress::new("0xCAFE"));
        assert_eq!(
            actions(&menu),
            vec![ActionKind::Reset, ActionKind::ShowHands, ActionKind::Exit]
        );
        assert_eq!(menu.number_of(ActionKind::Exit), Some(3));
    }

    #[test]
    fn test_select_parses_and_rejects() {
        let session = GameSession::load(&raw(5)).unwrap();
        let menu = ActionMenu::build(&session, &PlayerAddress::new("0xa11ce"));
        assert_eq!(menu.len(), 3);

        assert_eq!(menu.select(" 1 ").unwrap().action, ActionKind::RevealFirstTranche);
        assert_eq!(menu.select("3").unwrap().action, ActionKind::Exit);

        for bad in ["0", "4", "-1", "abc", ""] {
            assert!(matches!(
                menu.select(bad),
                Err(GameError::InvalidSelection { max: 3, .. })
            ));
        }
    }
}

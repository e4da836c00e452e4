//! Whose turn it is and which actions a viewer may take.
//!
//! `legal_action_kinds` is the single table from phase and viewer context to
//! the permitted actions; menus are composed from it and nothing else.

use crate::phase::GamePhase;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Time that must pass on the ledger clock after a game ends before anyone
/// may reset it.
pub const RESET_COOLDOWN: TimeDelta = TimeDelta::seconds(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    Player0,
    Player1,
}

impl Seat {
    pub const BOTH: [Seat; 2] = [Seat::Player0, Seat::Player1];

    pub fn index(self) -> usize {
        match self {
            Seat::Player0 => 0,
            Seat::Player1 => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Seat::Player0),
            1 => Some(Seat::Player1),
            _ => None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Seat::Player0 => Seat::Player1,
            Seat::Player1 => Seat::Player0,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.index() + 1)
    }
}

/// Everything a participant can pick from a menu. The derived order is the
/// menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Join,
    Bet,
    Call,
    Fold,
    RevealFirstTranche,
    RevealLastTranche,
    Reset,
    ShowHands,
    Exit,
}

impl ActionKind {
    /// Actions that never depend on phase or identity.
    pub fn is_universal(self) -> bool {
        matches!(self, ActionKind::ShowHands | ActionKind::Exit)
    }
}

/// What the resolver needs to know about the viewer besides the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnContext {
    pub viewer_is_current_turn: bool,
    pub viewer_seated: bool,
    pub slot_open: bool,
    /// Ledger time elapsed since the game ended, if it has.
    pub since_terminal: Option<TimeDelta>,
}

pub fn whose_turn(phase: GamePhase) -> Option<Seat> {
    match phase {
        GamePhase::P1Bet1
        | GamePhase::P1RaiseOrCall1
        | GamePhase::P1RollFirst
        | GamePhase::P1Bet2
        | GamePhase::P1RaiseOrCall2
        | GamePhase::P1RollLast => Some(Seat::Player0),
        GamePhase::P2BetOrCall1
        | GamePhase::P2RaiseOrCall1
        | GamePhase::P2RollFirst
        | GamePhase::P2BetOrCall2
        | GamePhase::P2RaiseOrCall2
        | GamePhase::P2RollLast => Some(Seat::Player1),
        GamePhase::Joining
        | GamePhase::DetermineWinner
        | GamePhase::Tie
        | GamePhase::GameEnded => None,
    }
}

pub fn legal_action_kinds(phase: GamePhase, ctx: &TurnContext) -> BTreeSet<ActionKind> {
    let mut kinds = BTreeSet::new();

    if phase == GamePhase::Joining && !ctx.viewer_seated && ctx.slot_open {
        kinds.insert(ActionKind::Join);
    }

    if ctx.viewer_is_current_turn {
        if phase.is_betting() {
            kinds.extend([ActionKind::Bet, ActionKind::Call, ActionKind::Fold]);
        } else if phase.is_first_reveal() {
            kinds.insert(ActionKind::RevealFirstTranche);
        } else if phase.is_last_reveal() {
            kinds.insert(ActionKind::RevealLastTranche);
        }
    }

    if phase == GamePhase::GameEnded
        && ctx.since_terminal.is_some_and(|elapsed| elapsed >= RESET_COOLDOWN)
    {
        kinds.insert(ActionKind::Reset);
    }

    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE_PHASES: [GamePhase; 4] = [
        GamePhase::Joining,
        GamePhase::DetermineWinner,
        GamePhase::Tie,
        GamePhase::GameEnded,
    ];

    fn on_turn() -> TurnContext {
        TurnContext {
            viewer_is_current_turn: true,
            viewer_seated: true,
            ..TurnContext::default()
        }
    }

    #[test]
    fn test_betting_phases_always_have_a_turn() {
        for phase in GamePhase::ALL.into_iter().filter(|p| p.is_betting()) {
            assert!(whose_turn(phase).is_some(), "{}", phase);
        }
    }

    #[test]
    fn test_turn_mapping() {
        assert_eq!(whose_turn(GamePhase::P1Bet1), Some(Seat::Player0));
        assert_eq!(whose_turn(GamePhase::P2RaiseOrCall2), Some(Seat::Player1));
        assert_eq!(whose_turn(GamePhase::P1RollLast), Some(Seat::Player0));
        assert_eq!(whose_turn(GamePhase::P2RollFirst), Some(Seat::Player1));
    }

    #[test]
    fn test_idle_phases_have_no_turn_and_no_play() {
        let play = [
            ActionKind::Bet,
            ActionKind::Call,
            ActionKind::Fold,
            ActionKind::RevealFirstTranche,
            ActionKind::RevealLastTranche,
        ];
        for phase in IDLE_PHASES {
            assert_eq!(whose_turn(phase), None);
            // Even a context claiming the turn must not unlock play.
            let kinds = legal_action_kinds(phase, &on_turn());
            assert!(play.iter().all(|k| !kinds.contains(k)), "{}", phase);
        }
    }

    #[test]
    fn test_betting_requires_the_turn() {
        let off_turn = TurnContext {
            viewer_seated: true,
            ..TurnContext::default()
        };
        for phase in GamePhase::ALL.into_iter().filter(|p| p.is_betting()) {
            assert_eq!(
                legal_action_kinds(phase, &on_turn()),
                BTreeSet::from([ActionKind::Bet, ActionKind::Call, ActionKind::Fold])
            );
            assert!(legal_action_kinds(phase, &off_turn).is_empty());
        }
    }

    #[test]
    fn test_reveal_kinds() {
        for phase in [GamePhase::P1RollFirst, GamePhase::P2RollFirst] {
            assert_eq!(
                legal_action_kinds(phase, &on_turn()),
                BTreeSet::from([ActionKind::RevealFirstTranche])
            );
        }
        for phase in [GamePhase::P1RollLast, GamePhase::P2RollLast] {
            assert_eq!(
                legal_action_kinds(phase, &on_turn()),
                BTreeSet::from([ActionKind::RevealLastTranche])
            );
        }
        assert!(legal_action_kinds(GamePhase::P1RollFirst, &TurnContext::default()).is_empty());
    }

    #[test]
    fn test_join_needs_open_slot_and_unseated_viewer() {
        let newcomer = TurnContext {
            slot_open: true,
            ..TurnContext::default()
        };
        assert!(legal_action_kinds(GamePhase::Joining, &newcomer).contains(&ActionKind::Join));

        let seated = TurnContext {
            viewer_seated: true,
            ..newcomer
        };
        assert!(legal_action_kinds(GamePhase::Joining, &seated).is_empty());

        let full = TurnContext::default();
        assert!(legal_action_kinds(GamePhase::Joining, &full).is_empty());

        assert!(legal_action_kinds(GamePhase::P1Bet1, &newcomer).is_empty());
    }

    #[test]
    fn test_reset_cooldown_boundary_is_inclusive() {
        let at = |ms: i64| TurnContext {
            since_terminal: Some(TimeDelta::milliseconds(ms)),
            ..TurnContext::default()
        };

        assert!(!legal_action_kinds(GamePhase::GameEnded, &at(4_999)).contains(&ActionKind::Reset));
        assert!(legal_action_kinds(GamePhase::GameEnded, &at(5_000)).contains(&ActionKind::Reset));
        assert!(legal_action_kinds(GamePhase::GameEnded, &at(60_000)).contains(&ActionKind::Reset));

        // Not gated by identity, but never outside GameEnded or without a timestamp.
        assert!(!legal_action_kinds(GamePhase::Tie, &at(60_000)).contains(&ActionKind::Reset));
        assert!(!legal_action_kinds(GamePhase::GameEnded, &TurnContext::default())
            .contains(&ActionKind::Reset));
    }
}

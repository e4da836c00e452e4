use crate::error::{GameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete state of a game session as numbered by the ledger.
///
/// Phases only move forward, except for the reset that returns an ended
/// game to `Joining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GamePhase {
    Joining = 0,
    P1Bet1,
    P2BetOrCall1,
    P1RaiseOrCall1,
    P2RaiseOrCall1,
    P1RollFirst,
    P2RollFirst,
    P1Bet2,
    P2BetOrCall2,
    P1RaiseOrCall2,
    P2RaiseOrCall2,
    P1RollLast,
    P2RollLast,
    DetermineWinner,
    Tie,
    GameEnded,
}

impl GamePhase {
    pub const ALL: [GamePhase; 16] = [
        GamePhase::Joining,
        GamePhase::P1Bet1,
        GamePhase::P2BetOrCall1,
        GamePhase::P1RaiseOrCall1,
        GamePhase::P2RaiseOrCall1,
        GamePhase::P1RollFirst,
        GamePhase::P2RollFirst,
        GamePhase::P1Bet2,
        GamePhase::P2BetOrCall2,
        GamePhase::P1RaiseOrCall2,
        GamePhase::P2RaiseOrCall2,
        GamePhase::P1RollLast,
        GamePhase::P2RollLast,
        GamePhase::DetermineWinner,
        GamePhase::Tie,
        GamePhase::GameEnded,
    ];

    pub fn from_index(index: u32) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| GameError::malformed(format!("phase index {} out of range", index)))
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn is_betting(self) -> bool {
        matches!(
            self,
            GamePhase::P1Bet1
                | GamePhase::P2BetOrCall1
                | GamePhase::P1RaiseOrCall1
                | GamePhase::P2RaiseOrCall1
                | GamePhase::P1Bet2
                | GamePhase::P2BetOrCall2
                | GamePhase::P1RaiseOrCall2
                | GamePhase::P2RaiseOrCall2
        )
    }

    pub fn is_first_reveal(self) -> bool {
        matches!(self, GamePhase::P1RollFirst | GamePhase::P2RollFirst)
    }

    pub fn is_last_reveal(self) -> bool {
        matches!(self, GamePhase::P1RollLast | GamePhase::P2RollLast)
    }

    pub fn name(self) -> &'static str {
        match self {
            GamePhase::Joining => "Joining",
            GamePhase::P1Bet1 => "Player1Bet1",
            GamePhase::P2BetOrCall1 => "Player2BetOrCall1",
            GamePhase::P1RaiseOrCall1 => "Player1RaiseOrCall1",
            GamePhase::P2RaiseOrCall1 => "Player2RaiseOrCall1",
            GamePhase::P1RollFirst => "Player1RollFirst",
            GamePhase::P2RollFirst => "Player2RollFirst",
            GamePhase::P1Bet2 => "Player1Bet2",
            GamePhase::P2BetOrCall2 => "Player2BetOrCall2",
            GamePhase::P1RaiseOrCall2 => "Player1RaiseOrCall2",
            GamePhase::P2RaiseOrCall2 => "Player2RaiseOrCall2",
            GamePhase::P1RollLast => "Player1RollLast",
            GamePhase::P2RollLast => "Player2RollLast",
            GamePhase::DetermineWinner => "DetermineWinner",
            GamePhase::Tie => "Tie",
            GamePhase::GameEnded => "GameEnded",
        }
    }
}

impl TryFrom<u32> for GamePhase {
    type Error = GameError;

    fn try_from(index: u32) -> Result<Self> {
        Self::from_index(index)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

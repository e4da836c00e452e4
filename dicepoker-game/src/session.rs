//! Validated view of a ledger snapshot.

use crate::dice::{self, DiceHand, MaskedHand};
use crate::error::{GameError, Result};
use crate::phase::GamePhase;
use crate::turn::{whose_turn, Seat, TurnContext};
use chrono::{DateTime, TimeDelta, Utc};
use dicepoker_core::{Amount, PlayerAddress, RawSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSlot {
    /// `None` while the seat is unfilled.
    pub address: Option<PlayerAddress>,
    pub bet: Amount,
    pub has_rolled_first: bool,
    pub has_rolled_last: bool,
}

/// One game's observable state, rebuilt from scratch on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub phase: GamePhase,
    pub players: [PlayerSlot; 2],
    pub hands: [DiceHand; 2],
    pub current_bet_level: Amount,
    pub last_terminal_at: Option<DateTime<Utc>>,
    /// Ledger clock when the snapshot was taken.
    pub observed_at: DateTime<Utc>,
}

impl GameSession {
    /// Validate a raw ledger snapshot. Pure: no I/O, no retries.
    pub fn load(raw: &RawSnapshot) -> Result<Self> {
        let phase = GamePhase::from_index(raw.phase)?;

        let hands = [DiceHand::new(raw.dice[0])?, DiceHand::new(raw.dice[1])?];

        let players = std::array::from_fn(|i| {
            let address = PlayerAddress::new(&raw.players[i]);
            PlayerSlot {
                address: (!address.is_empty_slot()).then_some(address),
                bet: Amount::from_sat(raw.bets[i]),
                has_rolled_first: raw.has_rolled_first[i],
                has_rolled_last: raw.has_rolled_last[i],
            }
        });

        Ok(Self {
            phase,
            players,
            hands,
            current_bet_level: Amount::from_sat(raw.current_bet_level),
            last_terminal_at: raw.last_terminal_at,
            observed_at: raw.observed_at,
        })
    }

    pub fn slot(&self, seat: Seat) -> &PlayerSlot {
        &self.players[seat.index()]
    }

    pub fn seat_of(&self, viewer: &PlayerAddress) -> Option<Seat> {
        if viewer.is_empty_slot() {
            return None;
        }
        self.players
            .iter()
            .position(|slot| slot.address.as_ref() == Some(viewer))
            .and_then(Seat::from_index)
    }

    pub fn has_open_slot(&self) -> bool {
        self.players.iter().any(|slot| slot.address.is_none())
    }

    /// Ledger time elapsed since the game ended, measured on the ledger clock.
    pub fn since_terminal(&self) -> Option<TimeDelta> {
        self.last_terminal_at.map(|ended| self.observed_at - ended)
    }

    pub fn turn_context(&self, viewer: &PlayerAddress) -> TurnContext {
        let seat = self.seat_of(viewer);
        TurnContext {
            viewer_is_current_turn: seat.is_some() && seat == whose_turn(self.phase),
            viewer_seated: seat.is_some(),
            slot_open: self.has_open_slot(),
            since_terminal: self.since_terminal(),
        }
    }

    /// Amount `seat` must add to match the current level. A recorded bet
    /// above the level cannot happen under the ledger rules.
    pub fn amount_to_call(&self, seat: Seat) -> Result<Amount> {
        let bet = self.slot(seat).bet;
        self.current_bet_level.checked_sub(bet).ok_or_else(|| {
            GameError::malformed(format!(
                "{} has bet {} above the current level {}",
                seat, bet, self.current_bet_level
            ))
        })
    }

    pub fn masked_hand(&self, seat: Seat) -> MaskedHand {
        let slot = self.slot(seat);
        dice::view(
            &self.hands[seat.index()],
            slot.has_rolled_first,
            slot.has_rolled_last,
        )
    }

    pub fn fully_revealed(&self) -> bool {
        self.players
            .iter()
            .all(|slot| slot.has_rolled_first && slot.has_rolled_last)
    }

    /// Both hands, only once every tranche of both has been revealed.
    pub fn final_hands(&self) -> Result<[&DiceHand; 2]> {
        if !self.fully_revealed() {
            return Err(GameError::EvaluatorPrecondition);
        }
        Ok([&self.hands[0], &self.hands[1]])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dicepoker_core::EMPTY_ADDRESS;

    pub(crate) fn raw(phase: u32) -> RawSnapshot {
        RawSnapshot {
            phase,
            players: ["0xA11CE".to_string(), "0xB0B".to_string()],
            bets: [0, 0],
            has_rolled_first: [false, false],
            has_rolled_last: [false, false],
            dice: [[6, 6, 6, 2, 2], [5, 5, 5, 2, 2]],
            current_bet_level: 0,
            last_terminal_at: None,
            observed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_load_valid_snapshot() {
        let mut snapshot = raw(2);
        snapshot.players[1] = EMPTY_ADDRESS.to_string();
        snapshot.bets = [10, 0];
        snapshot.current_bet_level = 10;

        let session = GameSession::load(&snapshot).unwrap();
        assert_eq!(session.phase, GamePhase::P2BetOrCall1);
        assert_eq!(session.players[0].address, Some(PlayerAddress::new("0xa11ce")));
        assert_eq!(session.players[1].address, None);
        assert_eq!(session.players[0].bet, Amount::from_sat(10));
        assert!(session.has_open_slot());
        assert_eq!(session.seat_of(&PlayerAddress::new("0XA11CE")), Some(Seat::Player0));
        assert_eq!(session.seat_of(&PlayerAddress::empty_slot()), None);
    }

    #[test]
    fn test_load_rejects_bad_phase_and_faces() {
        assert!(matches!(
            GameSession::load(&raw(16)),
            Err(GameError::MalformedSnapshot(_))
        ));

        let mut snapshot = raw(0);
        snapshot.dice[1][4] = 0;
        assert!(matches!(
            GameSession::load(&snapshot),
            Err(GameError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_amount_to_call() {
        let mut snapshot = raw(2);
        snapshot.bets = [100, 40];
        snapshot.current_bet_level = 100;
        let session = GameSession::load(&snapshot).unwrap();
        assert_eq!(session.amount_to_call(Seat::Player1).unwrap(), Amount::from_sat(60));
        assert_eq!(session.amount_to_call(Seat::Player0).unwrap(), Amount::ZERO);

        snapshot.bets = [100, 140];
        let session = GameSession::load(&snapshot).unwrap();
        assert!(matches!(
            session.amount_to_call(Seat::Player1),
            Err(GameError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_final_hands_require_full_reveal() {
        let mut snapshot = raw(15);
        snapshot.has_rolled_first = [true, true];
        snapshot.has_rolled_last = [true, false];
        let session = GameSession::load(&snapshot).unwrap();
        assert!(matches!(
            session.final_hands(),
            Err(GameError::EvaluatorPrecondition)
        ));

        snapshot.has_rolled_last = [true, true];
        let session = GameSession::load(&snapshot).unwrap();
        let [a, b] = session.final_hands().unwrap();
        assert_eq!((a.sum(), b.sum()), (22, 19));
    }

    #[test]
    fn test_turn_context_uses_ledger_clock() {
        let mut snapshot = raw(15);
        snapshot.last_terminal_at = Some(snapshot.observed_at - TimeDelta::seconds(3));
        let session = GameSession::load(&snapshot).unwrap();

        let ctx = session.turn_context(&PlayerAddress::new("0xCAFE"));
        assert!(!ctx.viewer_seated);
        assert!(!ctx.viewer_is_current_turn);
        assert_eq!(ctx.since_terminal, Some(TimeDelta::seconds(3)));

        let ctx = GameSession::load(&raw(3))
            .unwrap()
            .turn_context(&PlayerAddress::new("0xa11ce"));
        assert!(ctx.viewer_is_current_turn);
    }
}

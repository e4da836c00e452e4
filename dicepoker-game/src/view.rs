use crate::dice::MaskedHand;
use crate::phase::GamePhase;
use crate::session::GameSession;
use crate::turn::{whose_turn, Seat};
use dicepoker_core::{Amount, PlayerAddress};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatView {
    pub seat: Seat,
    pub address: Option<PlayerAddress>,
    pub bet: Amount,
    pub hand: MaskedHand,
    pub is_viewer: bool,
}

/// What a viewer is shown each cycle. Hands are always masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub phase: GamePhase,
    pub seats: [SeatView; 2],
    pub current_bet_level: Amount,
    pub turn: Option<Seat>,
    pub viewer_seat: Option<Seat>,
}

impl TableView {
    pub fn build(session: &GameSession, viewer: &PlayerAddress) -> Self {
        let viewer_seat = session.seat_of(viewer);

        let seats = Seat::BOTH.map(|seat| {
            let slot = session.slot(seat);
            SeatView {
                seat,
                address: slot.address.clone(),
                bet: slot.bet,
                hand: session.masked_hand(seat),
                is_viewer: viewer_seat == Some(seat),
            }
        });

        Self {
            phase: session.phase,
            seats,
            current_bet_level: session.current_bet_level,
            turn: whose_turn(session.phase),
            viewer_seat,
        }
    }

    pub fn hands(&self) -> [MaskedHand; 2] {
        [self.seats[0].hand, self.seats[1].hand]
    }
}

//! Hands, masking, and the sum-of-faces showdown.

use crate::error::{GameError, Result};
use crate::turn::Seat;
use dicepoker_core::DICE_PER_HAND;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Faces 0..3 are revealed by the first reveal, faces 3..5 by the last.
pub const FIRST_TRANCHE: std::ops::Range<usize> = 0..3;
pub const LAST_TRANCHE: std::ops::Range<usize> = 3..DICE_PER_HAND;

/// Rendering of a face the viewer may not see yet.
pub const HIDDEN_FACE: &str = "–";

/// Five faces in [1,6].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DiceHand([u8; DICE_PER_HAND]);

impl DiceHand {
    pub fn new(faces: [i64; DICE_PER_HAND]) -> Result<Self> {
        let mut hand = [0u8; DICE_PER_HAND];
        for (i, face) in faces.into_iter().enumerate() {
            if !(1..=6).contains(&face) {
                return Err(GameError::malformed(format!(
                    "die {} has face {} outside 1..=6",
                    i, face
                )));
            }
            hand[i] = face as u8;
        }
        Ok(Self(hand))
    }

    pub fn sum(&self) -> u32 {
        self.0.iter().map(|&face| face as u32).sum()
    }

    pub(crate) fn faces(&self) -> [u8; DICE_PER_HAND] {
        self.0
    }
}

// Faces stay out of logs and panics; only the masked view exposes them.
impl fmt::Debug for DiceHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DiceHand(..)")
    }
}

/// Player-visible view of a hand: `None` for every face of an unrevealed
/// tranche.
pub type MaskedHand = [Option<u8>; DICE_PER_HAND];

pub fn view(hand: &DiceHand, revealed_first: bool, revealed_last: bool) -> MaskedHand {
    std::array::from_fn(|i| {
        let revealed = if FIRST_TRANCHE.contains(&i) {
            revealed_first
        } else {
            revealed_last
        };
        revealed.then_some(hand.0[i])
    })
}

pub fn render(masked: &MaskedHand) -> String {
    masked
        .iter()
        .map(|face| match face {
            Some(face) => face.to_string(),
            None => HIDDEN_FACE.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(Seat),
    Tie,
}

/// Highest sum of five dice wins.
pub fn evaluate(hand0: &DiceHand, hand1: &DiceHand) -> Outcome {
    match hand0.sum().cmp(&hand1.sum()) {
        std::cmp::Ordering::Greater => Outcome::Winner(Seat::Player0),
        std::cmp::Ordering::Less => Outcome::Winner(Seat::Player1),
        std::cmp::Ordering::Equal => Outcome::Tie,
    }
}

//! Two-player DicePoker client
//!
//! Turns raw ledger snapshots into a validated game view, decides which
//! actions a viewer may take, and drives one participant through a
//! session by polling the ledger and submitting their choices.
//! The ledger stays the single source of truth.

pub mod dice;
pub mod error;
pub mod menu;
pub mod orchestrator;
pub mod phase;
pub mod session;
pub mod turn;
pub mod view;

pub use dice::{evaluate, render, DiceHand, MaskedHand, Outcome};
pub use error::{GameError, Result};
pub use menu::{ActionMenu, MenuEntry};
pub use orchestrator::{
    parse_amount, GameEvent, GameOrchestrator, GameOutcome, OrchestratorConfig,
    OrchestratorState, Participant,
};
pub use phase::GamePhase;
pub use session::{GameSession, PlayerSlot};
pub use turn::{legal_action_kinds, whose_turn, ActionKind, Seat, TurnContext, RESET_COOLDOWN};
pub use view::{SeatView, TableView};

use dicepoker_core::LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Invalid selection '{input}': choose a number from 1 to {max}")]
    InvalidSelection { input: String, max: usize },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Nothing to call")]
    NothingToCall,

    #[error("Rejected by ledger: {0}")]
    Rejected(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Winner evaluated before both hands were fully revealed")]
    EvaluatorPrecondition,

    #[error("Participant input failed: {0}")]
    Participant(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSnapshot(msg.into())
    }

    pub fn participant(msg: impl Into<String>) -> Self {
        Self::Participant(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

// Ledger refusals stay distinct, everything else is the ledger being unreachable.
impl From<LedgerError> for GameError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(reason) => GameError::Rejected(reason),
            other => GameError::LedgerUnavailable(other.to_string()),
        }
    }
}

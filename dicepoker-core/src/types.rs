use bitcoin::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Slot sentinel reported by the ledger for an unfilled seat.
pub const EMPTY_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub const DICE_PER_HAND: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Opaque participant identifier. Addresses compare case-insensitively,
/// so they are normalised to lowercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PlayerAddress(String);

impl PlayerAddress {
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty-slot sentinel (or a blank address).
    pub fn is_empty_slot(&self) -> bool {
        self.0.is_empty() || self.0 == EMPTY_ADDRESS
    }

    pub fn empty_slot() -> Self {
        Self(EMPTY_ADDRESS.to_string())
    }
}

impl From<String> for PlayerAddress {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PlayerAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PlayerAddress> for String {
    fn from(value: PlayerAddress) -> Self {
        value.0
    }
}

impl fmt::Display for PlayerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Game state exactly as the ledger reports it. Amounts are in the
/// ledger's integer base unit. No invariant is checked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub phase: u32,
    pub players: [String; 2],
    pub bets: [u64; 2],
    pub has_rolled_first: [bool; 2],
    pub has_rolled_last: [bool; 2],
    pub dice: [[i64; DICE_PER_HAND]; 2],
    pub current_bet_level: u64,
    #[serde(default)]
    pub last_terminal_at: Option<DateTime<Utc>>,
    /// Ledger clock at the time of the read.
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Join,
    Bet,
    Call,
    Fold,
    RevealFirst,
    RevealLast,
    Reset,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Bet => "bet",
            Self::Call => "call",
            Self::Fold => "fold",
            Self::RevealFirst => "reveal_first",
            Self::RevealLast => "reveal_last",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an action submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor: PlayerAddress,
    pub action: LedgerAction,
    #[serde(default, with = "bitcoin::amount::serde::as_sat::opt")]
    pub amount: Option<Amount>,
}

/// Ticket for an action accepted for processing but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub ticket: Uuid,
    pub session: SessionId,
    pub request: ActionRequest,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub ticket: Uuid,
    pub session: SessionId,
    pub action: LedgerAction,
    #[serde(default, with = "bitcoin::amount::serde::as_sat::opt")]
    pub amount: Option<Amount>,
    /// Raw phase index the session moved to.
    pub phase_after: u32,
    pub confirmed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_case_insensitive() {
        let a = PlayerAddress::new("0xABCdef");
        let b = PlayerAddress::from("0xabcDEF ");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0xabcdef");
    }

    #[test]
    fn test_empty_slot_sentinel() {
        assert!(PlayerAddress::empty_slot().is_empty_slot());
        assert!(PlayerAddress::new("").is_empty_slot());
        assert!(!PlayerAddress::new("alice").is_empty_slot());
    }

    #[test]
    fn test_action_request_wire_format() {
        let request = ActionRequest {
            actor: PlayerAddress::new("Alice"),
            action: LedgerAction::RevealFirst,
            amount: Some(Amount::from_sat(1500)),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["actor"], "alice");
        assert_eq!(json["action"], "reveal_first");
        assert_eq!(json["amount"], 1500);

        let no_amount: ActionRequest =
            serde_json::from_str(r#"{"actor":"bob","action":"fold"}"#).unwrap();
        assert_eq!(no_amount.amount, None);
        assert_eq!(no_amount.action, LedgerAction::Fold);
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}

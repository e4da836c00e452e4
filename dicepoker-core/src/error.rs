use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("Rejected by ledger: {0}")]
    Rejected(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for failures of the transport or the store rather than a
    /// decision of the ledger. These are eligible for a fresh attempt.
    pub fn is_transport(&self) -> bool {
        !matches!(
            self,
            Self::Rejected(_) | Self::SessionNotFound(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(LedgerError::unavailable("connection refused").is_transport());
        assert!(LedgerError::timeout("read after 10s").is_transport());
        assert!(LedgerError::internal("poisoned").is_transport());
        assert!(!LedgerError::rejected("not your turn").is_transport());
        assert!(!LedgerError::SessionNotFound("abc".into()).is_transport());
        assert!(!LedgerError::config("empty url").is_transport());
    }
}

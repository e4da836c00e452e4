//! DicePoker core - ledger plumbing for the dice-wagering game client
//!
//! Wire types exchanged with the authoritative ledger, the `Ledger` trait
//! the game client consumes, a SQLite-backed local reference ledger, an
//! HTTP adapter and the audit log of submitted actions.

pub mod config;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod types;

pub use config::{LedgerBackend, LedgerConfig};
pub use error::{LedgerError, Result};
pub use ledger::{HttpLedger, Ledger, LocalLedger, TimedLedger};
pub use storage::{ActionRecord, AuditOutcome, AuditStore, Storage};
pub use types::{
    ActionRequest, Confirmation, LedgerAction, PlayerAddress, RawSnapshot, SessionId, Submission,
    DICE_PER_HAND, EMPTY_ADDRESS,
};

pub use ::bitcoin::{Amount, Denomination};

use std::sync::Arc;

/// Build the ledger named by `config`, bounded by its request timeout.
pub async fn connect(config: &LedgerConfig) -> Result<Arc<dyn Ledger>> {
    config.validate()?;

    let ledger: Arc<dyn Ledger> = match &config.backend {
        LedgerBackend::Local { db_path } => Arc::new(TimedLedger::new(
            LocalLedger::open(db_path).await?,
            config.request_timeout,
        )),
        LedgerBackend::Http { base_url } => Arc::new(TimedLedger::new(
            HttpLedger::new(base_url, config.request_timeout)?,
            config.request_timeout,
        )),
    };

    tracing::debug!("Connected to {:?} ledger", config.backend);
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_connect_local_ledger() {
        let temp_dir = tempdir().unwrap();
        let config = LedgerConfig::local(temp_dir.path().join("ledger.db"));

        let ledger = connect(&config).await.unwrap();
        let err = ledger.read_state(&SessionId::new()).await.unwrap_err();
        assert!(matches!(err, LedgerError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = LedgerConfig::http("");
        assert!(connect(&config).await.is_err());
    }
}

use crate::error::{LedgerError, Result};
use crate::storage::Storage;
use crate::types::{RawSnapshot, SessionId, DICE_PER_HAND, EMPTY_ADDRESS};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

/// Persisted state of one session held by the local ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub phase: u32,
    pub players: [String; 2],
    pub bets: [u64; 2],
    pub has_rolled_first: [bool; 2],
    pub has_rolled_last: [bool; 2],
    pub dice: [[i64; DICE_PER_HAND]; 2],
    pub current_bet_level: u64,
    pub last_terminal_at: Option<DateTime<Utc>>,
    /// Pots credited by settled games, oldest first.
    #[serde(default)]
    pub payouts: Vec<Payout>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(id: SessionId, dice: [[i64; DICE_PER_HAND]; 2], now: DateTime<Utc>) -> Self {
        Self {
            id,
            phase: 0,
            players: [EMPTY_ADDRESS.to_string(), EMPTY_ADDRESS.to_string()],
            bets: [0, 0],
            has_rolled_first: [false, false],
            has_rolled_last: [false, false],
            dice,
            current_bet_level: 0,
            last_terminal_at: None,
            payouts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn snapshot(&self, observed_at: DateTime<Utc>) -> RawSnapshot {
        RawSnapshot {
            phase: self.phase,
            players: self.players.clone(),
            bets: self.bets,
            has_rolled_first: self.has_rolled_first,
            has_rolled_last: self.has_rolled_last,
            dice: self.dice,
            current_bet_level: self.current_bet_level,
            last_terminal_at: self.last_terminal_at,
            observed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub address: String,
    pub amount: u64,
    pub paid_at: DateTime<Utc>,
}

pub struct SessionStore<'a> {
    storage: &'a Storage,
}

impl<'a> SessionStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn create(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT INTO sessions (id, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id.to_string(),
                serde_json::to_string(record)?,
                record.created_at.timestamp_millis(),
                record.updated_at.timestamp_millis(),
            ],
        )?;

        Ok(())
    }

    pub async fn load(&self, id: &SessionId) -> Result<SessionRecord> {
        let conn = self.storage.get_connection().await;
        load_record(&conn, id)
    }

    pub async fn list(&self) -> Result<Vec<SessionRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT state FROM sessions ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }

        Ok(records)
    }

    /// Read-modify-write of one session inside an immediate transaction.
    /// The record is only written back when `apply` succeeds.
    pub async fn update<T, F>(&self, id: &SessionId, apply: F) -> Result<T>
    where
        F: FnOnce(&mut SessionRecord) -> Result<T>,
    {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut record = load_record(&tx, id)?;
        let output = apply(&mut record)?;

        tx.execute(
            "UPDATE sessions SET state = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                serde_json::to_string(&record)?,
                record.updated_at.timestamp_millis(),
            ],
        )?;
        tx.commit()?;

        Ok(output)
    }
}

fn load_record(conn: &Connection, id: &SessionId) -> Result<SessionRecord> {
    let state: Option<String> = conn
        .query_row(
            "SELECT state FROM sessions WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    let state = state.ok_or_else(|| LedgerError::SessionNotFound(id.to_string()))?;
    Ok(serde_json::from_str(&state)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record() -> SessionRecord {
        SessionRecord::new(SessionId::new(), [[1, 2, 3, 4, 5], [6, 5, 4, 3, 2]], Utc::now())
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("ledger.db")).await.unwrap();
        let store = SessionStore::new(&storage);

        let record = record();
        store.create(&record).await.unwrap();

        let loaded = store.load(&record.id).await.unwrap();
        assert_eq!(loaded, record);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_session() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("ledger.db")).await.unwrap();
        let store = SessionStore::new(&storage);

        let err = store.load(&SessionId::new()).await.unwrap_err();
        assert!(matches!(err, LedgerError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_update_is_not_written() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("ledger.db")).await.unwrap();
        let store = SessionStore::new(&storage);

        let record = record();
        store.create(&record).await.unwrap();

        let result: Result<()> = store
            .update(&record.id, |r| {
                r.phase = 7;
                Err(LedgerError::rejected("nope"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.load(&record.id).await.unwrap().phase, 0);

        store
            .update(&record.id, |r| {
                r.phase = 1;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(store.load(&record.id).await.unwrap().phase, 1);
    }
}

use crate::error::{LedgerError, Result};
use crate::storage::Storage;
use crate::types::{LedgerAction, PlayerAddress, SessionId};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One submitted action: what was sent, what came back, how long it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: Uuid,
    pub session: SessionId,
    pub actor: PlayerAddress,
    pub action: LedgerAction,
    pub params: serde_json::Value,
    pub outcome: AuditOutcome,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Confirmed(serde_json::Value),
    Failed(String),
}

impl AuditOutcome {
    fn status(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::Failed(_) => "failed",
        }
    }
}

pub struct AuditStore {
    storage: Arc<Storage>,
}

impl AuditStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn record(&self, record: &ActionRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let payload = match &record.outcome {
            AuditOutcome::Confirmed(receipt) => serde_json::to_string(receipt)?,
            AuditOutcome::Failed(reason) => serde_json::to_string(reason)?,
        };

        conn.execute(
            "INSERT INTO action_log
             (id, session_id, actor, action, params, status, payload, duration_ms, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.to_string(),
                record.session.to_string(),
                record.actor.as_str(),
                record.action.as_str(),
                serde_json::to_string(&record.params)?,
                record.outcome.status(),
                payload,
                record.duration_ms as i64,
                record.recorded_at.timestamp_millis(),
            ],
        )?;

        tracing::debug!(
            "Recorded {} by {} on session {} ({})",
            record.action,
            record.actor,
            record.session,
            record.outcome.status()
        );
        Ok(())
    }

    /// Most recent entries first.
    pub async fn list(&self, session: Option<&SessionId>, limit: usize) -> Result<Vec<ActionRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, session_id, actor, action, params, status, payload, duration_ms, recorded_at
             FROM action_log
             WHERE ?1 IS NULL OR session_id = ?1
             ORDER BY recorded_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(
            params![session.map(|s| s.to_string()), limit as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            },
        )?;

        let mut records = Vec::new();
        for row in rows {
            let (id, session_id, actor, action, params, status, payload, duration_ms, recorded_at) =
                row?;

            let outcome = if status == "confirmed" {
                AuditOutcome::Confirmed(serde_json::from_str(&payload)?)
            } else {
                AuditOutcome::Failed(serde_json::from_str(&payload)?)
            };

            let id = Uuid::parse_str(&id)
                .map_err(|e| LedgerError::internal(format!("Corrupt audit id '{}': {}", id, e)))?;
            let recorded_at = DateTime::from_timestamp_millis(recorded_at).ok_or_else(|| {
                LedgerError::internal(format!("Corrupt audit timestamp {} for {}", recorded_at, id))
            })?;

            records.push(ActionRecord {
                id,
                session: serde_json::from_value(serde_json::Value::String(session_id))?,
                actor: PlayerAddress::new(actor),
                action: serde_json::from_value(serde_json::Value::String(action))?,
                params: serde_json::from_str(&params)?,
                outcome,
                duration_ms: duration_ms.max(0) as u64,
                recorded_at,
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(session: SessionId, action: LedgerAction, offset_ms: i64) -> ActionRecord {
        ActionRecord {
            id: Uuid::new_v4(),
            session,
            actor: PlayerAddress::new("alice"),
            action,
            params: serde_json::json!({ "amount": 1000 }),
            outcome: AuditOutcome::Confirmed(serde_json::json!({ "phase_after": 2 })),
            duration_ms: 42,
            recorded_at: DateTime::from_timestamp_millis(1_700_000_000_000 + offset_ms).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&temp_dir.path().join("audit.db")).await.unwrap());
        let audit = AuditStore::new(storage);

        let session = SessionId::new();
        let other = SessionId::new();
        audit.record(&entry(session, LedgerAction::Join, 0)).await.unwrap();
        audit.record(&entry(session, LedgerAction::Bet, 10)).await.unwrap();
        audit.record(&entry(other, LedgerAction::Join, 20)).await.unwrap();

        let mut failed = entry(session, LedgerAction::Call, 30);
        failed.outcome = AuditOutcome::Failed("not your turn".to_string());
        audit.record(&failed).await.unwrap();

        let all = audit.list(None, 10).await.unwrap();
        assert_eq!(all.len(), 4);

        let mine = audit.list(Some(&session), 10).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].action, LedgerAction::Call);
        assert_eq!(mine[0].outcome, AuditOutcome::Failed("not your turn".to_string()));
        assert_eq!(mine[2].action, LedgerAction::Join);
        assert_eq!(mine[2].duration_ms, 42);

        assert_eq!(audit.list(Some(&session), 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_fails_on_corrupt_rows() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&temp_dir.path().join("audit.db")).await.unwrap());
        let audit = AuditStore::new(storage.clone());
        let session = SessionId::new();
        audit.record(&entry(session, LedgerAction::Join, 0)).await.unwrap();

        storage
            .get_connection()
            .await
            .execute("UPDATE action_log SET id = 'not-a-uuid'", [])
            .unwrap();
        let err = audit.list(Some(&session), 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::Internal(ref msg) if msg.contains("not-a-uuid")));

        let good = entry(session, LedgerAction::Bet, 10);
        storage
            .get_connection()
            .await
            .execute("DELETE FROM action_log", [])
            .unwrap();
        audit.record(&good).await.unwrap();
        storage
            .get_connection()
            .await
            .execute("UPDATE action_log SET recorded_at = ?1", params![i64::MAX])
            .unwrap();
        let err = audit.list(None, 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::Internal(ref msg) if msg.contains("timestamp")));
    }
}

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::types::{
    ActionRequest, Confirmation, LedgerAction, PlayerAddress, RawSnapshot, SessionId, Submission,
};
use async_trait::async_trait;
use bitcoin::Amount;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Ledger reached over its JSON session API.
pub struct HttpLedger {
    client: Client,
    base_url: String,
}

impl HttpLedger {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| LedgerError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn session_url(&self, session: &SessionId) -> String {
        format!("{}/sessions/{}", self.base_url, session)
    }

    fn actions_url(&self, session: &SessionId) -> String {
        format!("{}/actions", self.session_url(session))
    }

    fn submission_url(&self, submission: &Submission) -> String {
        format!("{}/submissions/{}", self.base_url, submission.ticket)
    }
}

fn transport(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::timeout(e.to_string())
    } else {
        LedgerError::unavailable(e.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => LedgerError::SessionNotFound(what.to_string()),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
            LedgerError::rejected(body)
        }
        _ => LedgerError::unavailable(format!("{}: {}", status, body)),
    })
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn read_state(&self, session: &SessionId) -> Result<RawSnapshot> {
        let response = self
            .client
            .get(self.session_url(session))
            .send()
            .await
            .map_err(transport)?;
        decode(response, &session.to_string()).await
    }

    async fn submit_action(
        &self,
        session: &SessionId,
        actor: &PlayerAddress,
        action: LedgerAction,
        amount: Option<Amount>,
    ) -> Result<Submission> {
        let request = ActionRequest {
            actor: actor.clone(),
            action,
            amount,
        };

        let response = self
            .client
            .post(self.actions_url(session))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        decode(response, &session.to_string()).await
    }

    async fn await_confirmation(&self, submission: &Submission) -> Result<Confirmation> {
        let response = self
            .client
            .get(self.submission_url(submission))
            .send()
            .await
            .map_err(transport)?;
        decode(response, &submission.ticket.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_urls() {
        let ledger = HttpLedger::new("http://localhost:8080/", Duration::from_secs(10)).unwrap();
        let session = SessionId::new();
        assert_eq!(
            ledger.session_url(&session),
            format!("http://localhost:8080/sessions/{}", session)
        );
        assert_eq!(
            ledger.actions_url(&session),
            format!("http://localhost:8080/sessions/{}/actions", session)
        );

        let submission = Submission {
            ticket: Uuid::new_v4(),
            session,
            request: ActionRequest {
                actor: PlayerAddress::new("alice"),
                action: LedgerAction::Fold,
                amount: None,
            },
            submitted_at: Utc::now(),
        };
        assert_eq!(
            ledger.submission_url(&submission),
            format!("http://localhost:8080/submissions/{}", submission.ticket)
        );
    }

    #[tokio::test]
    async fn test_unreachable_ledger_is_transport_error() {
        // Port 9 (discard) is not expected to serve HTTP locally.
        let ledger = HttpLedger::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = ledger.read_state(&SessionId::new()).await.unwrap_err();
        assert!(err.is_transport());
    }
}

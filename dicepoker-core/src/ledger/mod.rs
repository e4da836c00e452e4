//! The narrow interface the game client consumes from the authoritative
//! ledger, plus the adapters that implement it.

pub mod http;
pub mod local;

pub use http::HttpLedger;
pub use local::{
    Clock, DiceRoller, LocalLedger, ManualClock, RandomDice, ScriptedDice, SystemClock,
};

use crate::error::{LedgerError, Result};
use crate::types::{Confirmation, LedgerAction, PlayerAddress, RawSnapshot, SessionId, Submission};
use async_trait::async_trait;
use bitcoin::Amount;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Authoritative state of one session.
    async fn read_state(&self, session: &SessionId) -> Result<RawSnapshot>;

    /// Hand an action to the ledger. Acceptance is not confirmation.
    async fn submit_action(
        &self,
        session: &SessionId,
        actor: &PlayerAddress,
        action: LedgerAction,
        amount: Option<Amount>,
    ) -> Result<Submission>;

    /// Block until the ledger has executed or refused a submission.
    async fn await_confirmation(&self, submission: &Submission) -> Result<Confirmation>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    async fn read_state(&self, session: &SessionId) -> Result<RawSnapshot> {
        (**self).read_state(session).await
    }

    async fn submit_action(
        &self,
        session: &SessionId,
        actor: &PlayerAddress,
        action: LedgerAction,
        amount: Option<Amount>,
    ) -> Result<Submission> {
        (**self).submit_action(session, actor, action, amount).await
    }

    async fn await_confirmation(&self, submission: &Submission) -> Result<Confirmation> {
        (**self).await_confirmation(submission).await
    }
}

/// Bounds every call of the wrapped ledger by a fixed timeout.
pub struct TimedLedger<L> {
    inner: L,
    timeout: Duration,
}

impl<L: Ledger> TimedLedger<L> {
    pub fn new(inner: L, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Ledger {} timed out after {:?}", what, self.timeout);
                Err(LedgerError::timeout(format!(
                    "{} did not complete within {:?}",
                    what, self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl<L: Ledger> Ledger for TimedLedger<L> {
    async fn read_state(&self, session: &SessionId) -> Result<RawSnapshot> {
        self.bounded("read", self.inner.read_state(session)).await
    }

    async fn submit_action(
        &self,
        session: &SessionId,
        actor: &PlayerAddress,
        action: LedgerAction,
        amount: Option<Amount>,
    ) -> Result<Submission> {
        self.bounded("submit", self.inner.submit_action(session, actor, action, amount))
            .await
    }

    async fn await_confirmation(&self, submission: &Submission) -> Result<Confirmation> {
        self.bounded("confirmation", self.inner.await_confirmation(submission))
            .await
    }
}

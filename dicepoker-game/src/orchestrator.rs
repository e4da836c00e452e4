//! The polling loop that drives one participant through a session.
//!
//! Every cycle re-reads authoritative state from the ledger; nothing is
//! mutated locally. At most one ledger request is outstanding at a time.

use crate::dice::{evaluate, MaskedHand, Outcome};
use crate::error::{GameError, Result};
use crate::menu::ActionMenu;
use crate::phase::GamePhase;
use crate::session::GameSession;
use crate::turn::ActionKind;
use crate::view::TableView;
use chrono::Utc;
use dicepoker_core::{
    ActionRecord, Amount, AuditOutcome, AuditStore, Confirmation, Denomination, Ledger,
    LedgerAction, LedgerConfig, LedgerError, PlayerAddress, SessionId, Submission,
    DICE_PER_HAND,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The local input/output surface the orchestrator talks to.
pub trait Participant: Send {
    /// Raw menu selection as typed.
    fn choose(&mut self, view: &TableView, menu: &ActionMenu) -> Result<String>;

    /// Raw decimal amount as typed.
    fn enter_amount(&mut self, prompt: &str) -> Result<String>;

    fn notify(&mut self, event: &GameEvent);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    LedgerUnavailable(String),
    MalformedSnapshot(String),
    InvalidSelection(String),
    InvalidAmount(String),
    NothingToCall,
    Calling(Amount),
    Submitted {
        action: LedgerAction,
        amount: Option<Amount>,
    },
    Confirmed(Confirmation),
    Rejected(String),
    Hands([MaskedHand; 2]),
    Outcome(GameOutcome),
    Exiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub hands: [[u8; DICE_PER_HAND]; 2],
    pub sums: [u32; 2],
    pub result: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    AwaitingLedgerSnapshot,
    AwaitingParticipantChoice,
    SubmittingAction,
    AwaitingConfirmation,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause before a fresh read after a failed one.
    pub poll_interval: Duration,
    pub denomination: Denomination,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for OrchestratorConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            denomination: Denomination::Bitcoin,
        }
    }
}

#[derive(Debug)]
struct PendingAction {
    kind: ActionKind,
    action: LedgerAction,
    amount: Option<Amount>,
    phase_before: GamePhase,
    submission: Option<Submission>,
    started: Instant,
}

pub struct GameOrchestrator<L> {
    ledger: L,
    session_id: SessionId,
    viewer: PlayerAddress,
    config: OrchestratorConfig,
    audit: Option<Arc<AuditStore>>,
    state: OrchestratorState,
    snapshot: Option<GameSession>,
    pending: Option<PendingAction>,
    consecutive_failures: u32,
    /// Set once our final reveal is confirmed, until the outcome is reported.
    outcome_due: bool,
}

impl<L: Ledger> GameOrchestrator<L> {
    pub fn new(ledger: L, session_id: SessionId, viewer: PlayerAddress) -> Self {
        Self {
            ledger,
            session_id,
            viewer,
            config: OrchestratorConfig::default(),
            audit: None,
            state: OrchestratorState::Idle,
            snapshot: None,
            pending: None,
            consecutive_failures: 0,
            outcome_due: false,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditStore>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Last snapshot that passed validation.
    pub fn snapshot(&self) -> Option<&GameSession> {
        self.snapshot.as_ref()
    }

    /// Drive the session until the participant exits.
    pub async fn run<P: Participant>(&mut self, participant: &mut P) -> Result<()> {
        while self.step(participant).await? != OrchestratorState::Terminated {}
        Ok(())
    }

    /// Run one full cycle: read, choose, and submit/confirm if an action
    /// was chosen. Returns the state the cycle ended in.
    pub async fn step<P: Participant>(&mut self, participant: &mut P) -> Result<OrchestratorState> {
        if self.state == OrchestratorState::Idle {
            self.advance(participant).await?;
        }

        loop {
            if self.state == OrchestratorState::Terminated {
                return Ok(self.state);
            }
            self.advance(participant).await?;
            if matches!(
                self.state,
                OrchestratorState::AwaitingLedgerSnapshot
                    | OrchestratorState::Idle
                    | OrchestratorState::Terminated
            ) {
                return Ok(self.state);
            }
        }
    }

    async fn advance<P: Participant>(&mut self, participant: &mut P) -> Result<()> {
        match self.state {
            OrchestratorState::Idle => {
                if self.consecutive_failures > 0 {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                self.transition(OrchestratorState::AwaitingLedgerSnapshot);
                Ok(())
            }
            OrchestratorState::AwaitingLedgerSnapshot => self.poll(participant).await,
            OrchestratorState::AwaitingParticipantChoice => self.choose(participant),
            OrchestratorState::SubmittingAction => {
                self.submit(participant).await;
                Ok(())
            }
            OrchestratorState::AwaitingConfirmation => self.confirm(participant).await,
            OrchestratorState::Terminated => Ok(()),
        }
    }

    fn transition(&mut self, next: OrchestratorState) {
        tracing::debug!(
            "Session {} ({}): {:?} -> {:?}",
            self.session_id,
            self.viewer,
            self.state,
            next
        );
        self.state = next;
    }

    async fn read_session(&self) -> Result<GameSession> {
        match self.ledger.read_state(&self.session_id).await {
            Ok(raw) => GameSession::load(&raw),
            Err(e) => Err(GameError::from(e)),
        }
    }

    async fn poll<P: Participant>(&mut self, participant: &mut P) -> Result<()> {
        match self.read_session().await {
            Ok(session) => {
                self.consecutive_failures = 0;
                tracing::debug!(
                    "Session {} at {} (bets {} / {})",
                    self.session_id,
                    session.phase,
                    session.players[0].bet,
                    session.players[1].bet
                );

                if self.outcome_due {
                    if session.fully_revealed() {
                        if let Err(e) = self.report_outcome(participant, &session) {
                            self.transition(OrchestratorState::Terminated);
                            return Err(e);
                        }
                    } else if session.phase == GamePhase::Joining {
                        // Reset before we saw the settled hands.
                        self.outcome_due = false;
                    }
                }

                self.snapshot = Some(session);
                self.transition(OrchestratorState::AwaitingParticipantChoice);
                Ok(())
            }
            Err(e) => {
                let event = match &e {
                    GameError::MalformedSnapshot(msg) => GameEvent::MalformedSnapshot(msg.clone()),
                    other => GameEvent::LedgerUnavailable(other.to_string()),
                };
                tracing::warn!("Session {}: read failed: {}", self.session_id, e);
                participant.notify(&event);

                self.consecutive_failures += 1;
                self.transition(OrchestratorState::Idle);
                Ok(())
            }
        }
    }

    fn choose<P: Participant>(&mut self, participant: &mut P) -> Result<()> {
        let session = self
            .snapshot
            .clone()
            .ok_or_else(|| GameError::internal("no snapshot to present"))?;
        let view = TableView::build(&session, &self.viewer);
        let menu = ActionMenu::build(&session, &self.viewer);

        // Bad input never reaches the ledger.
        let kind = loop {
            let input = participant.choose(&view, &menu)?;
            match menu.select(&input) {
                Ok(entry) => break entry.action,
                Err(e) => participant.notify(&GameEvent::InvalidSelection(e.to_string())),
            }
        };

        let (action, amount) = match kind {
            ActionKind::ShowHands => {
                participant.notify(&GameEvent::Hands(view.hands()));
                self.transition(OrchestratorState::AwaitingLedgerSnapshot);
                return Ok(());
            }
            ActionKind::Exit => {
                participant.notify(&GameEvent::Exiting);
                self.snapshot = None;
                self.transition(OrchestratorState::Terminated);
                return Ok(());
            }
            ActionKind::Join => (LedgerAction::Join, None),
            ActionKind::Fold => (LedgerAction::Fold, None),
            ActionKind::RevealFirstTranche => (LedgerAction::RevealFirst, None),
            ActionKind::RevealLastTranche => (LedgerAction::RevealLast, None),
            ActionKind::Reset => (LedgerAction::Reset, None),
            ActionKind::Bet => {
                let input = participant.enter_amount(&format!(
                    "Amount ({})",
                    self.config.denomination
                ))?;
                match parse_amount(&input, self.config.denomination) {
                    Ok(amount) => (LedgerAction::Bet, Some(amount)),
                    Err(e) => {
                        participant.notify(&GameEvent::InvalidAmount(e.to_string()));
                        self.transition(OrchestratorState::AwaitingLedgerSnapshot);
                        return Ok(());
                    }
                }
            }
            ActionKind::Call => {
                let seat = view
                    .viewer_seat
                    .ok_or_else(|| GameError::internal("call offered to an unseated viewer"))?;
                match session.amount_to_call(seat) {
                    Ok(to_call) if to_call == Amount::ZERO => {
                        participant.notify(&GameEvent::NothingToCall);
                        self.transition(OrchestratorState::AwaitingLedgerSnapshot);
                        return Ok(());
                    }
                    Ok(to_call) => {
                        participant.notify(&GameEvent::Calling(to_call));
                        (LedgerAction::Call, Some(to_call))
                    }
                    Err(e) => {
                        participant.notify(&GameEvent::MalformedSnapshot(e.to_string()));
                        self.transition(OrchestratorState::AwaitingLedgerSnapshot);
                        return Ok(());
                    }
                }
            }
        };

        self.pending = Some(PendingAction {
            kind,
            action,
            amount,
            phase_before: session.phase,
            submission: None,
            started: Instant::now(),
        });
        self.transition(OrchestratorState::SubmittingAction);
        Ok(())
    }

    async fn submit<P: Participant>(&mut self, participant: &mut P) {
        let Some(mut pending) = self.pending.take() else {
            self.transition(OrchestratorState::AwaitingLedgerSnapshot);
            return;
        };

        match self
            .ledger
            .submit_action(&self.session_id, &self.viewer, pending.action, pending.amount)
            .await
        {
            Ok(submission) => {
                participant.notify(&GameEvent::Submitted {
                    action: pending.action,
                    amount: pending.amount,
                });
                pending.submission = Some(submission);
                self.pending = Some(pending);
                self.transition(OrchestratorState::AwaitingConfirmation);
            }
            Err(e) => {
                self.report_failure(participant, &e);
                self.record(&pending, AuditOutcome::Failed(e.to_string())).await;
                self.transition(OrchestratorState::AwaitingLedgerSnapshot);
            }
        }
    }

    async fn confirm<P: Participant>(&mut self, participant: &mut P) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| GameError::internal("confirmation without a pending action"))?;
        let submission = pending
            .submission
            .as_ref()
            .ok_or_else(|| GameError::internal("confirmation without a submission"))?;

        match self.ledger.await_confirmation(submission).await {
            Ok(confirmation) => {
                tracing::info!(
                    "Session {}: {} by {} confirmed",
                    self.session_id,
                    confirmation.action,
                    self.viewer
                );
                let receipt = serde_json::to_value(&confirmation)
                    .unwrap_or_else(|e| serde_json::Value::String(e.to_string()));
                participant.notify(&GameEvent::Confirmed(confirmation));
                self.record(&pending, AuditOutcome::Confirmed(receipt)).await;

                if pending.kind == ActionKind::RevealLastTranche
                    && pending.phase_before == GamePhase::P2RollLast
                {
                    self.outcome_due = true;
                    if let Err(e) = self.settle(participant).await {
                        self.transition(OrchestratorState::Terminated);
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                // No state change is assumed; the next read tells.
                self.report_failure(participant, &e);
                self.record(&pending, AuditOutcome::Failed(e.to_string())).await;
            }
        }

        self.transition(OrchestratorState::AwaitingLedgerSnapshot);
        Ok(())
    }

    /// Read the settled game right after the final reveal. If the read
    /// fails the outcome stays due and is reported from the next good poll.
    async fn settle<P: Participant>(&mut self, participant: &mut P) -> Result<()> {
        match self.read_session().await {
            Ok(session) => {
                self.report_outcome(participant, &session)?;
                self.snapshot = Some(session);
            }
            Err(GameError::MalformedSnapshot(msg)) => {
                participant.notify(&GameEvent::MalformedSnapshot(msg));
            }
            Err(e) => participant.notify(&GameEvent::LedgerUnavailable(e.to_string())),
        }
        Ok(())
    }

    fn report_outcome<P: Participant>(
        &mut self,
        participant: &mut P,
        session: &GameSession,
    ) -> Result<()> {
        let [hand0, hand1] = session.final_hands()?;
        let outcome = GameOutcome {
            hands: [hand0.faces(), hand1.faces()],
            sums: [hand0.sum(), hand1.sum()],
            result: evaluate(hand0, hand1),
        };

        tracing::info!(
            "Session {} settled: {:?} ({} vs {})",
            self.session_id,
            outcome.result,
            outcome.sums[0],
            outcome.sums[1]
        );
        participant.notify(&GameEvent::Outcome(outcome));
        self.outcome_due = false;
        Ok(())
    }

    fn report_failure<P: Participant>(&self, participant: &mut P, err: &LedgerError) {
        tracing::warn!("Session {}: {}", self.session_id, err);
        match err {
            LedgerError::Rejected(reason) => {
                participant.notify(&GameEvent::Rejected(reason.clone()))
            }
            other => participant.notify(&GameEvent::LedgerUnavailable(other.to_string())),
        }
    }

    async fn record(&self, pending: &PendingAction, outcome: AuditOutcome) {
        let Some(audit) = &self.audit else {
            return;
        };

        let record = ActionRecord {
            id: Uuid::new_v4(),
            session: self.session_id,
            actor: self.viewer.clone(),
            action: pending.action,
            params: serde_json::json!({
                "amount": pending.amount.map(|a| a.to_sat()),
                "phase": pending.phase_before.name(),
            }),
            outcome,
            duration_ms: pending.started.elapsed().as_millis() as u64,
            recorded_at: Utc::now(),
        };

        if let Err(e) = audit.record(&record).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }
}

/// Decimal amount in `denomination`, converted to the base unit.
pub fn parse_amount(input: &str, denomination: Denomination) -> Result<Amount> {
    let amount = Amount::from_str_in(input.trim(), denomination)
        .map_err(|e| GameError::InvalidAmount(format!("'{}': {}", input.trim(), e)))?;
    if amount == Amount::ZERO {
        return Err(GameError::InvalidAmount("amount must be positive".to_string()));
    }
    if amount > Amount::MAX_MONEY {
        return Err(GameError::InvalidAmount(format!(
            "amount exceeds {}",
            Amount::MAX_MONEY.display_in(denomination)
        )));
    }
    Ok(amount)
}

//! Reference ledger backed by SQLite.
//!
//! Executes the DicePoker rules against sessions persisted in the shared
//! data directory, so several client processes can play against each other
//! without a chain. Each confirmation runs inside one immediate transaction,
//! which serializes conflicting submissions.

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::storage::{Payout, SessionRecord, SessionStore, Storage};
use crate::types::{
    ActionRequest, Confirmation, LedgerAction, PlayerAddress, RawSnapshot, SessionId, Submission,
    DICE_PER_HAND, EMPTY_ADDRESS,
};
use async_trait::async_trait;
use bitcoin::Amount;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub const RESET_COOLDOWN_SECS: i64 = 5;

// Phase numbering of the ledger contract.
const JOINING: u32 = 0;
const ROUND_ONE: u32 = 1;
const ROUND_TWO: u32 = 7;
const P1_ROLL_FIRST: u32 = 5;
const P2_ROLL_FIRST: u32 = 6;
const P1_ROLL_LAST: u32 = 11;
const P2_ROLL_LAST: u32 = 12;
const GAME_ENDED: u32 = 15;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub trait DiceRoller: Send + Sync {
    fn roll_hand(&self) -> [i64; DICE_PER_HAND];
}

#[derive(Debug, Default)]
pub struct RandomDice;

impl DiceRoller for RandomDice {
    fn roll_hand(&self) -> [i64; DICE_PER_HAND] {
        let mut rng = rand::rng();
        std::array::from_fn(|_| rng.random_range(1..=6))
    }
}

/// Hands handed out in order; the last one repeats once the queue drains.
#[derive(Debug)]
pub struct ScriptedDice {
    hands: Mutex<VecDeque<[i64; DICE_PER_HAND]>>,
    last: Mutex<[i64; DICE_PER_HAND]>,
}

impl ScriptedDice {
    pub fn new(hands: impl IntoIterator<Item = [i64; DICE_PER_HAND]>) -> Self {
        Self {
            hands: Mutex::new(hands.into_iter().collect()),
            last: Mutex::new([1; DICE_PER_HAND]),
        }
    }
}

impl DiceRoller for ScriptedDice {
    fn roll_hand(&self) -> [i64; DICE_PER_HAND] {
        let mut last = self.last.lock();
        if let Some(hand) = self.hands.lock().pop_front() {
            *last = hand;
        }
        *last
    }
}

pub struct LocalLedger {
    storage: Arc<Storage>,
    clock: Arc<dyn Clock>,
    dice: Arc<dyn DiceRoller>,
    pending: Mutex<HashMap<Uuid, Submission>>,
}

impl LocalLedger {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            dice: Arc::new(RandomDice),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub async fn open(db_path: &Path) -> Result<Self> {
        let storage = Arc::new(Storage::new(db_path).await?);
        Ok(Self::new(storage))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dice(mut self, dice: Arc<dyn DiceRoller>) -> Self {
        self.dice = dice;
        self
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub async fn create_session(&self) -> Result<SessionId> {
        let id = SessionId::new();
        let dice = [self.dice.roll_hand(), self.dice.roll_hand()];
        let record = SessionRecord::new(id, dice, self.clock.now());

        SessionStore::new(&self.storage).create(&record).await?;

        tracing::info!("Created session {}", id);
        Ok(id)
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        SessionStore::new(&self.storage).list().await
    }
}

#[async_trait]
impl Ledger for LocalLedger {
    async fn read_state(&self, session: &SessionId) -> Result<RawSnapshot> {
        let record = SessionStore::new(&self.storage).load(session).await?;
        Ok(record.snapshot(self.clock.now()))
    }

    async fn submit_action(
        &self,
        session: &SessionId,
        actor: &PlayerAddress,
        action: LedgerAction,
        amount: Option<Amount>,
    ) -> Result<Submission> {
        // Unknown sessions are refused up front.
        SessionStore::new(&self.storage).load(session).await?;

        let submission = Submission {
            ticket: Uuid::new_v4(),
            session: *session,
            request: ActionRequest {
                actor: actor.clone(),
                action,
                amount,
            },
            submitted_at: self.clock.now(),
        };

        self.pending
            .lock()
            .insert(submission.ticket, submission.clone());

        tracing::debug!(
            "Accepted {} from {} on session {} as {}",
            action,
            actor,
            session,
            submission.ticket
        );
        Ok(submission)
    }

    async fn await_confirmation(&self, submission: &Submission) -> Result<Confirmation> {
        let pending = self
            .pending
            .lock()
            .remove(&submission.ticket)
            .ok_or_else(|| {
                LedgerError::internal(format!("Unknown submission {}", submission.ticket))
            })?;

        let now = self.clock.now();
        let dice = self.dice.clone();
        let request = pending.request.clone();

        let result = SessionStore::new(&self.storage)
            .update(&pending.session, |record| {
                apply(record, &request, now, dice.as_ref())?;
                record.updated_at = now;
                Ok(record.phase)
            })
            .await;

        match result {
            Ok(phase_after) => {
                tracing::info!(
                    "Session {}: {} by {} confirmed, phase now {}",
                    pending.session,
                    request.action,
                    request.actor,
                    phase_after
                );
                Ok(Confirmation {
                    ticket: pending.ticket,
                    session: pending.session,
                    action: request.action,
                    amount: request.amount,
                    phase_after,
                    confirmed_at: now,
                })
            }
            Err(e) => {
                tracing::warn!(
                    "Session {}: {} by {} failed: {}",
                    pending.session,
                    request.action,
                    request.actor,
                    e
                );
                Err(e)
            }
        }
    }
}

fn apply(
    record: &mut SessionRecord,
    request: &ActionRequest,
    now: DateTime<Utc>,
    dice: &dyn DiceRoller,
) -> Result<()> {
    let seat = seat_of(record, &request.actor);

    match request.action {
        LedgerAction::Join => join(record, &request.actor, seat),
        LedgerAction::Bet => {
            let amount = required_amount(request)?;
            let (base, offset) = betting_turn(record, seat)?;
            bet(record, base, offset, amount)
        }
        LedgerAction::Call => {
            let amount = required_amount(request)?;
            let (base, offset) = betting_turn(record, seat)?;
            call(record, base, offset, amount)
        }
        LedgerAction::Fold => {
            let (_, offset) = betting_turn(record, seat)?;
            let folder = (offset % 2) as usize;
            credit(record, 1 - folder, pot(record), now);
            end_game(record, now);
            Ok(())
        }
        LedgerAction::RevealFirst => reveal(record, seat, now, P1_ROLL_FIRST, P2_ROLL_FIRST),
        LedgerAction::RevealLast => reveal(record, seat, now, P1_ROLL_LAST, P2_ROLL_LAST),
        LedgerAction::Reset => reset(record, now, dice),
    }
}

fn seat_of(record: &SessionRecord, actor: &PlayerAddress) -> Option<usize> {
    if actor.is_empty_slot() {
        return None;
    }
    record
        .players
        .iter()
        .position(|p| PlayerAddress::new(p) == *actor)
}

fn required_amount(request: &ActionRequest) -> Result<u64> {
    match request.amount {
        Some(amount) if amount > Amount::ZERO => Ok(amount.to_sat()),
        _ => Err(LedgerError::rejected("a positive amount is required")),
    }
}

/// Betting round base phase and offset within the round, checked against
/// the actor's seat.
fn betting_turn(record: &SessionRecord, seat: Option<usize>) -> Result<(u32, u32)> {
    let base = match record.phase {
        p if (ROUND_ONE..ROUND_ONE + 4).contains(&p) => ROUND_ONE,
        p if (ROUND_TWO..ROUND_TWO + 4).contains(&p) => ROUND_TWO,
        _ => return Err(LedgerError::rejected("not a betting phase")),
    };
    let offset = record.phase - base;
    let seat = seat.ok_or_else(|| LedgerError::rejected("not a player in this game"))?;
    if seat != (offset % 2) as usize {
        return Err(LedgerError::rejected("not your turn"));
    }
    Ok((base, offset))
}

fn join(record: &mut SessionRecord, actor: &PlayerAddress, seat: Option<usize>) -> Result<()> {
    if record.phase != JOINING {
        return Err(LedgerError::rejected("game is not accepting players"));
    }
    if actor.is_empty_slot() {
        return Err(LedgerError::rejected("invalid player address"));
    }
    if seat.is_some() {
        return Err(LedgerError::rejected("already joined"));
    }

    let slot = record
        .players
        .iter()
        .position(|p| PlayerAddress::new(p).is_empty_slot())
        .ok_or_else(|| LedgerError::rejected("game is full"))?;
    record.players[slot] = actor.as_str().to_string();

    if record
        .players
        .iter()
        .all(|p| !PlayerAddress::new(p).is_empty_slot())
    {
        record.phase = ROUND_ONE;
    }
    Ok(())
}

fn bet(record: &mut SessionRecord, base: u32, offset: u32, amount: u64) -> Result<()> {
    let seat = (offset % 2) as usize;
    let new_bet = record.bets[seat]
        .checked_add(amount)
        .filter(|total| *total <= Amount::MAX_MONEY.to_sat())
        .ok_or_else(|| LedgerError::rejected("bet exceeds the maximum stake"))?;

    if new_bet < record.current_bet_level {
        return Err(LedgerError::rejected(format!(
            "bet of {} leaves you below the current level of {}",
            amount, record.current_bet_level
        )));
    }

    if offset == 0 {
        record.current_bet_level = new_bet;
        record.bets[seat] = new_bet;
        record.phase = base + 1;
    } else if new_bet == record.current_bet_level {
        record.bets[seat] = new_bet;
        record.phase = base + 4;
    } else {
        if offset == 3 {
            return Err(LedgerError::rejected("raise limit reached: call or fold"));
        }
        record.current_bet_level = new_bet;
        record.bets[seat] = new_bet;
        record.phase = base + offset + 1;
    }
    Ok(())
}

fn call(record: &mut SessionRecord, base: u32, offset: u32, amount: u64) -> Result<()> {
    let seat = (offset % 2) as usize;
    let to_call = record.current_bet_level.saturating_sub(record.bets[seat]);

    if offset == 0 || to_call == 0 {
        return Err(LedgerError::rejected("nothing to call"));
    }
    if amount != to_call {
        return Err(LedgerError::rejected(format!(
            "call must be exactly {}",
            to_call
        )));
    }

    record.bets[seat] = record.current_bet_level;
    record.phase = base + 4;
    Ok(())
}

fn reveal(
    record: &mut SessionRecord,
    seat: Option<usize>,
    now: DateTime<Utc>,
    first: u32,
    second: u32,
) -> Result<()> {
    let turn = match record.phase {
        p if p == first => 0,
        p if p == second => 1,
        _ => return Err(LedgerError::rejected("dice cannot be revealed now")),
    };
    if seat != Some(turn) {
        return Err(LedgerError::rejected("not your turn"));
    }

    if first == P1_ROLL_FIRST {
        record.has_rolled_first[turn] = true;
    } else {
        record.has_rolled_last[turn] = true;
    }

    if record.phase == P2_ROLL_LAST {
        settle(record, now);
    } else {
        record.phase += 1;
    }
    Ok(())
}

fn settle(record: &mut SessionRecord, now: DateTime<Utc>) {
    let sums: Vec<i64> = record.dice.iter().map(|hand| hand.iter().sum()).collect();
    let pot = pot(record);

    if sums[0] == sums[1] {
        credit(record, 0, pot - pot / 2, now);
        credit(record, 1, pot / 2, now);
    } else {
        let winner = if sums[0] > sums[1] { 0 } else { 1 };
        credit(record, winner, pot, now);
    }
    end_game(record, now);
}

/// Stakes are capped at `Amount::MAX_MONEY` per seat, so the sum fits.
fn pot(record: &SessionRecord) -> u64 {
    record.bets[0].saturating_add(record.bets[1])
}

fn credit(record: &mut SessionRecord, seat: usize, amount: u64, now: DateTime<Utc>) {
    record.payouts.push(Payout {
        address: record.players[seat].clone(),
        amount,
        paid_at: now,
    });
}

fn end_game(record: &mut SessionRecord, now: DateTime<Utc>) {
    record.phase = GAME_ENDED;
    record.last_terminal_at = Some(now);
}

fn reset(record: &mut SessionRecord, now: DateTime<Utc>, dice: &dyn DiceRoller) -> Result<()> {
    if record.phase != GAME_ENDED {
        return Err(LedgerError::rejected("game has not ended"));
    }
    let ended_at = record
        .last_terminal_at
        .ok_or_else(|| LedgerError::internal("ended game without terminal timestamp"))?;
    if now - ended_at < Duration::seconds(RESET_COOLDOWN_SECS) {
        return Err(LedgerError::rejected(format!(
            "reset not available until {}s after the game ended",
            RESET_COOLDOWN_SECS
        )));
    }

    record.phase = JOINING;
    record.players = [EMPTY_ADDRESS.to_string(), EMPTY_ADDRESS.to_string()];
    record.bets = [0, 0];
    record.has_rolled_first = [false, false];
    record.has_rolled_last = [false, false];
    record.current_bet_level = 0;
    record.dice = [dice.roll_hand(), dice.roll_hand()];
    Ok(())
}

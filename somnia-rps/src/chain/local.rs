//! In-process simulation of the Somnia game hub contract.
//!
//! Drives the full session lifecycle with the same rules and the same
//! event schedule as the deployed contract, so the coordinator and the
//! example dApp can run without a network. The simulation is also the
//! test double: it counts calls per method, can add artificial latency,
//! can shift its clock past deadlines, and can be told to fail the
//! automatic payout for an address (falling back to a pull balance).

use super::events::{EventHub, EventReceiver, GameEvent};
use super::{GameChain, GameResult, GameSnapshot, SessionId};
use crate::commitment;
use crate::error::{Result, RpsError};
use crate::moves::Move;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use somnia_core::{Amount, Balance, ChainConfig, TxRecord, TxStatus};
use std::collections::{BTreeMap, HashMap, HashSet};

const DEFAULT_REVEAL_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GameRecord {
    id: SessionId,
    entry_fee: Amount,
    players: Vec<Address>,
    commitments: HashMap<Address, B256>,
    revealed: HashMap<Address, Move>,
    reveal_deadline: Option<DateTime<Utc>>,
    result: GameResult,
}

impl GameRecord {
    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id,
            entry_fee: self.entry_fee,
            players: self.players.clone(),
            committed: self
                .players
                .iter()
                .filter(|p| self.commitments.contains_key(*p))
                .copied()
                .collect(),
            revealed: self
                .players
                .iter()
                .filter(|p| self.revealed.contains_key(*p))
                .copied()
                .collect(),
            reveal_deadline: self.reveal_deadline,
        }
    }
}

/// Serializable ledger of the simulated chain; snapshot/restore lets the
/// CLI persist a world between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainState {
    config: ChainConfig,
    next_session: SessionId,
    reveal_window_secs: i64,
    games: BTreeMap<SessionId, GameRecord>,
    native: HashMap<Address, Amount>,
    withdrawable: HashMap<Address, Amount>,
    txs: Vec<TxRecord>,
}

impl ChainState {
    fn new(config: ChainConfig, reveal_window_secs: i64) -> Self {
        Self {
            config,
            next_session: 1,
            reveal_window_secs,
            games: BTreeMap::new(),
            native: HashMap::new(),
            withdrawable: HashMap::new(),
            txs: Vec::new(),
        }
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.games.keys().copied().collect()
    }
}

pub struct LocalChain {
    state: RwLock<ChainState>,
    hub: EventHub,
    clock_offset: RwLock<Duration>,
    fail_auto_withdraw: RwLock<HashSet<Address>>,
    latency: RwLock<Option<std::time::Duration>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl LocalChain {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::local())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self::restore(ChainState::new(config, DEFAULT_REVEAL_WINDOW_SECS))
    }

    pub fn with_reveal_window(window: Duration) -> Self {
        Self::restore(ChainState::new(
            ChainConfig::local(),
            window.num_seconds(),
        ))
    }

    pub fn restore(state: ChainState) -> Self {
        Self {
            state: RwLock::new(state),
            hub: EventHub::new(),
            clock_offset: RwLock::new(Duration::zero()),
            fail_auto_withdraw: RwLock::new(HashSet::new()),
            latency: RwLock::new(None),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> ChainState {
        self.state.read().clone()
    }

    pub fn config(&self) -> ChainConfig {
        self.state.read().config.clone()
    }

    /// Credit spendable native balance, the faucet of the simulated world.
    pub fn fund(&self, player: Address, amount: Amount) {
        let mut state = self.state.write();
        let balance = state.native.entry(player).or_insert(Amount::ZERO);
        *balance = balance.saturating_add(amount);
    }

    /// Shift the simulated clock forward, e.g. past a reveal deadline.
    pub fn advance_clock(&self, by: Duration) {
        let mut offset = self.clock_offset.write();
        *offset = *offset + by;
    }

    /// Add confirmation latency to every mutating call.
    pub fn set_latency(&self, latency: std::time::Duration) {
        *self.latency.write() = Some(latency);
    }

    /// Make the automatic payout to `player` fail, so the prize lands in
    /// the pull-payment balance instead.
    pub fn fail_auto_withdraw_for(&self, player: Address) {
        self.fail_auto_withdraw.write().insert(player);
    }

    /// How many times a chain method has been invoked.
    pub fn calls(&self, op: &str) -> u32 {
        self.calls.lock().get(op).copied().unwrap_or(0)
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now() + *self.clock_offset.read()
    }

    async fn confirm(&self, op: &str) {
        *self.calls.lock().entry(op.to_string()).or_insert(0) += 1;
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn count_read(&self, op: &str) {
        *self.calls.lock().entry(op.to_string()).or_insert(0) += 1;
    }

    fn record_tx(&self, op: &str, sender: Address, status: TxStatus) {
        self.state.write().txs.push(TxRecord {
            op: op.to_string(),
            sender,
            status,
            at: self.now(),
        });
    }

    /// Confirm or revert the transaction, then publish its events.
    fn settle<T>(
        &self,
        op: &str,
        sender: Address,
        outcome: Result<(T, Vec<(SessionId, GameEvent)>)>,
    ) -> Result<T> {
        match outcome {
            Ok((value, events)) => {
                self.record_tx(op, sender, TxStatus::Confirmed);
                for (sid, event) in events {
                    tracing::debug!(session = sid, ?event, "emitting event");
                    self.hub.publish(sid, event);
                }
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(op, %sender, error = %e, "transaction reverted");
                self.record_tx(op, sender, TxStatus::Reverted);
                Err(e)
            }
        }
    }

    fn debit(state: &mut ChainState, player: Address, amount: Amount) -> Result<()> {
        let balance = state.native.get(&player).copied().unwrap_or(Amount::ZERO);
        if balance < amount {
            return Err(RpsError::InsufficientFunds {
                need: amount.to_eth_string(),
                available: balance.to_eth_string(),
            });
        }
        state.native.insert(player, balance.saturating_sub(amount));
        Ok(())
    }

    fn try_create(
        &self,
        creator: Address,
        entry_fee: Amount,
    ) -> Result<(SessionId, Vec<(SessionId, GameEvent)>)> {
        if entry_fee.is_zero() {
            return Err(RpsError::invalid_state("entry fee must be positive"));
        }
        let mut state = self.state.write();
        Self::debit(&mut state, creator, entry_fee)?;

        let id = state.next_session;
        state.next_session += 1;
        state.games.insert(
            id,
            GameRecord {
                id,
                entry_fee,
                players: vec![creator],
                commitments: HashMap::new(),
                revealed: HashMap::new(),
                reveal_deadline: None,
                result: GameResult::pending(),
            },
        );

        tracing::info!(session = id, creator = %creator, fee = %entry_fee, "game created");
        Ok((id, vec![(id, GameEvent::PlayerJoined { player: creator })]))
    }

    fn try_join(
        &self,
        id: SessionId,
        joiner: Address,
        entry_fee: Amount,
    ) -> Result<((), Vec<(SessionId, GameEvent)>)> {
        let mut state = self.state.write();
        let expected = {
            let record = state.games.get(&id).ok_or(RpsError::SessionNotFound(id))?;
            if record.players.len() >= 2 {
                return Err(RpsError::GameFull);
            }
            if record.players.contains(&joiner) {
                return Err(RpsError::invalid_state("creator cannot join their own game"));
            }
            record.entry_fee
        };
        if entry_fee != expected {
            return Err(RpsError::FeeMismatch {
                expected: expected.to_eth_string(),
                got: entry_fee.to_eth_string(),
            });
        }
        Self::debit(&mut state, joiner, entry_fee)?;

        let record = state
            .games
            .get_mut(&id)
            .ok_or(RpsError::SessionNotFound(id))?;
        record.players.push(joiner);
        let players = record.players.clone();

        tracing::info!(session = id, joiner = %joiner, "second player joined");
        // The contract signals readiness twice; subscribers must tolerate
        // either arriving first, last, or not at all.
        Ok((
            (),
            vec![
                (id, GameEvent::PlayerJoined { player: joiner }),
                (id, GameEvent::ReadyToPlay { players }),
                (id, GameEvent::SessionStarted),
            ],
        ))
    }

    fn try_commit(
        &self,
        id: SessionId,
        player: Address,
        hash: B256,
    ) -> Result<((), Vec<(SessionId, GameEvent)>)> {
        let now = self.now();
        let mut state = self.state.write();
        let window = Duration::seconds(state.reveal_window_secs);
        let record = state
            .games
            .get_mut(&id)
            .ok_or(RpsError::SessionNotFound(id))?;

        if !record.players.contains(&player) {
            return Err(RpsError::NotAPlayer(id));
        }
        if record.players.len() < 2 {
            return Err(RpsError::SessionNotReady(
                "waiting for an opponent to join".to_string(),
            ));
        }
        if record.result.is_resolved() {
            return Err(RpsError::invalid_state("game already resolved"));
        }
        if record.commitments.contains_key(&player) {
            return Err(RpsError::AlreadyCommitted);
        }

        record.commitments.insert(player, hash);
        let mut events = vec![(id, GameEvent::MoveCommitted { player })];

        if record.commitments.len() == 2 {
            let deadline = now + window;
            record.reveal_deadline = Some(deadline);
            events.push((id, GameEvent::RevealPhaseStarted { deadline }));
            tracing::info!(session = id, %deadline, "reveal phase started");
        }

        Ok(((), events))
    }

    fn try_reveal(
        &self,
        id: SessionId,
        player: Address,
        mv: Move,
        nonce: U256,
    ) -> Result<((), Vec<(SessionId, GameEvent)>)> {
        let now = self.now();
        let fail_payouts = self.fail_auto_withdraw.read().clone();
        let mut state = self.state.write();
        let record = state
            .games
            .get_mut(&id)
            .ok_or(RpsError::SessionNotFound(id))?;

        if !record.players.contains(&player) {
            return Err(RpsError::NotAPlayer(id));
        }
        if record.commitments.len() < 2 {
            return Err(RpsError::SessionNotReady(
                "commit phase is not complete".to_string(),
            ));
        }
        if record.result.is_resolved() {
            return Err(RpsError::invalid_state("game already resolved"));
        }
        if record.revealed.contains_key(&player) {
            return Err(RpsError::AlreadyRevealed);
        }
        if !mv.is_playable() {
            return Err(RpsError::InvalidMove(
                "the absence sentinel cannot be revealed".to_string(),
            ));
        }
        let committed = record
            .commitments
            .get(&player)
            .copied()
            .ok_or_else(|| RpsError::internal("commitment missing for a committed player"))?;
        if !commitment::verify(player, mv, nonce, committed) {
            return Err(RpsError::CommitmentMismatch);
        }

        record.revealed.insert(player, mv);
        let mut events = vec![(id, GameEvent::MoveRevealed { player })];

        if record.revealed.len() == 2 {
            events.extend(Self::finalize(record, now, &fail_payouts));
            let payouts = Self::collect_payouts(&events);
            Self::apply_payouts(&mut state, payouts);
        }

        Ok(((), events))
    }

    fn try_force_resolve(
        &self,
        id: SessionId,
        caller: Address,
    ) -> Result<((), Vec<(SessionId, GameEvent)>)> {
        let now = self.now();
        let fail_payouts = self.fail_auto_withdraw.read().clone();
        let mut state = self.state.write();
        let record = state
            .games
            .get_mut(&id)
            .ok_or(RpsError::SessionNotFound(id))?;

        if !record.players.contains(&caller) {
            return Err(RpsError::NotAPlayer(id));
        }
        if record.result.is_resolved() {
            return Err(RpsError::invalid_state("game already resolved"));
        }
        let deadline = record.reveal_deadline.ok_or(RpsError::RevealTooEarly)?;
        if now <= deadline {
            return Err(RpsError::RevealTooEarly);
        }

        tracing::info!(session = id, caller = %caller, "forced resolution");
        let events = Self::finalize(record, now, &fail_payouts);
        let payouts = Self::collect_payouts(&events);
        Self::apply_payouts(&mut state, payouts);

        Ok(((), events))
    }

    /// Determine the outcome from whatever has been revealed; missing
    /// reveals count as `Move::None` and lose to any real move.
    fn finalize(
        record: &mut GameRecord,
        now: DateTime<Utc>,
        fail_payouts: &HashSet<Address>,
    ) -> Vec<(SessionId, GameEvent)> {
        let id = record.id;
        let moves: Vec<Move> = record
            .players
            .iter()
            .map(|p| record.revealed.get(p).copied().unwrap_or(Move::None))
            .collect();
        let prize = record.entry_fee.saturating_add(record.entry_fee);

        let winner_index = if moves[0].beats(moves[1]) {
            Some(0)
        } else if moves[1].beats(moves[0]) {
            Some(1)
        } else {
            None
        };

        record.result = GameResult {
            winner: winner_index
                .map(|i| record.players[i])
                .unwrap_or(Address::ZERO),
            moves: moves.clone(),
            prize,
            is_draw: winner_index.is_none(),
            completed_at: now.timestamp(),
        };

        let payouts: Vec<(Address, Amount)> = match winner_index {
            Some(i) => vec![(record.players[i], prize)],
            // Draw or double forfeit: each stake goes back where it came from.
            None => record
                .players
                .iter()
                .map(|p| (*p, record.entry_fee))
                .collect(),
        };

        tracing::info!(
            session = id,
            winner = %record.result.winner,
            is_draw = record.result.is_draw,
            "game resolved"
        );

        let mut events = Vec::new();
        for (recipient, amount) in payouts {
            if fail_payouts.contains(&recipient) {
                events.push((
                    id,
                    GameEvent::WithdrawalFailed {
                        player: recipient,
                        amount,
                    },
                ));
            } else {
                events.push((
                    id,
                    GameEvent::AutoWithdrawal {
                        player: recipient,
                        amount,
                    },
                ));
            }
        }
        events.push((id, GameEvent::GameResultDetermined));
        events
    }

    /// Read the payout instructions back out of the event list.
    fn collect_payouts(events: &[(SessionId, GameEvent)]) -> Vec<(Address, Amount, bool)> {
        events
            .iter()
            .filter_map(|(_, event)| match event {
                GameEvent::AutoWithdrawal { player, amount } => {
                    Some((*player, *amount, true))
                }
                GameEvent::WithdrawalFailed { player, amount } => {
                    Some((*player, *amount, false))
                }
                _ => None,
            })
            .collect()
    }

    fn apply_payouts(state: &mut ChainState, payouts: Vec<(Address, Amount, bool)>) {
        for (recipient, amount, pushed) in payouts {
            let ledger = if pushed {
                &mut state.native
            } else {
                &mut state.withdrawable
            };
            let balance = ledger.entry(recipient).or_insert(Amount::ZERO);
            *balance = balance.saturating_add(amount);
        }
    }

    fn try_withdraw(&self, player: Address) -> Result<(Amount, Vec<(SessionId, GameEvent)>)> {
        let mut state = self.state.write();
        let credit = state
            .withdrawable
            .get(&player)
            .copied()
            .unwrap_or(Amount::ZERO);
        if credit.is_zero() {
            return Err(RpsError::NoBalance);
        }
        state.withdrawable.insert(player, Amount::ZERO);
        let native = state.native.entry(player).or_insert(Amount::ZERO);
        *native = native.saturating_add(credit);

        tracing::info!(player = %player, amount = %credit, "manual withdrawal");
        Ok((credit, Vec::new()))
    }
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameChain for LocalChain {
    async fn create_game(&self, creator: Address, entry_fee: Amount) -> Result<SessionId> {
        self.confirm("create_game").await;
        self.settle("create_game", creator, self.try_create(creator, entry_fee))
    }

    async fn join_game(&self, id: SessionId, joiner: Address, entry_fee: Amount) -> Result<()> {
        self.confirm("join_game").await;
        self.settle("join_game", joiner, self.try_join(id, joiner, entry_fee))
    }

    async fn commit_move(&self, id: SessionId, player: Address, commitment: B256) -> Result<()> {
        self.confirm("commit_move").await;
        self.settle("commit_move", player, self.try_commit(id, player, commitment))
    }

    async fn reveal_move(
        &self,
        id: SessionId,
        player: Address,
        mv: Move,
        nonce: U256,
    ) -> Result<()> {
        self.confirm("reveal_move").await;
        self.settle("reveal_move", player, self.try_reveal(id, player, mv, nonce))
    }

    async fn force_resolve(&self, id: SessionId, caller: Address) -> Result<()> {
        self.confirm("force_resolve").await;
        self.settle("force_resolve", caller, self.try_force_resolve(id, caller))
    }

    async fn withdraw(&self, player: Address) -> Result<Amount> {
        self.confirm("withdraw").await;
        self.settle("withdraw", player, self.try_withdraw(player))
    }

    async fn get_game(&self, id: SessionId) -> Result<GameSnapshot> {
        self.count_read("get_game");
        let state = self.state.read();
        state
            .games
            .get(&id)
            .map(GameRecord::snapshot)
            .ok_or(RpsError::SessionNotFound(id))
    }

    async fn get_game_result(&self, id: SessionId) -> Result<GameResult> {
        self.count_read("get_game_result");
        let state = self.state.read();
        state
            .games
            .get(&id)
            .map(|record| record.result.clone())
            .ok_or(RpsError::SessionNotFound(id))
    }

    async fn get_reveal_deadline(&self, id: SessionId) -> Result<Option<DateTime<Utc>>> {
        self.count_read("get_reveal_deadline");
        let state = self.state.read();
        state
            .games
            .get(&id)
            .map(|record| record.reveal_deadline)
            .ok_or(RpsError::SessionNotFound(id))
    }

    async fn get_balance(&self, player: Address) -> Result<Balance> {
        self.count_read("get_balance");
        let state = self.state.read();
        Ok(Balance {
            available: state.native.get(&player).copied().unwrap_or(Amount::ZERO),
            withdrawable: state
                .withdrawable
                .get(&player)
                .copied()
                .unwrap_or(Amount::ZERO),
        })
    }

    fn subscribe(&self, id: SessionId) -> EventReceiver {
        self.hub.subscribe(id)
    }
}

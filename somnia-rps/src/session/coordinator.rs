//! Imperative adapter around the pure session state machine.
//!
//! The coordinator owns the chain handle, the event subscription and the
//! secret store for one client. Events are treated as hints: every
//! phase-advancing signal triggers a fresh authoritative read, and every
//! mutating call schedules one delayed reconciliation read, so a late,
//! duplicated or missed event can never wedge the session.

use crate::chain::{EventReceiver, GameChain, GameEvent, GameResult, SessionId};
use crate::classify::classify;
use crate::commitment::{commitment_hash, generate_nonce, MoveSecret};
use crate::error::{Result, RpsError};
use crate::moves::Move;
use crate::session::secrets::MoveStore;
use crate::session::state::{Phase, SessionState, Update};
use alloy_primitives::Address;
use parking_lot::{Mutex, RwLock};
use somnia_core::Amount;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Delay before the one-shot re-check after a subscription is
    /// established, covering events that fired before it existed.
    pub resync_delay: Duration,
    /// Delay before the authoritative read scheduled after each mutating
    /// call, giving the chain's indexing a chance to catch up.
    pub result_poll_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            resync_delay: Duration::from_secs(1),
            result_poll_delay: Duration::from_millis(1500),
        }
    }
}

/// Clears the pending flag on drop, whether the call succeeded or failed.
struct TxPermit<'a>(&'a AtomicBool);

impl Drop for TxPermit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one commit-reveal session for one player.
pub struct SessionCoordinator {
    chain: Arc<dyn GameChain>,
    player: Address,
    config: CoordinatorConfig,
    state: RwLock<SessionState>,
    tx_pending: AtomicBool,
    secrets: MoveStore,
    pump: Mutex<Option<JoinHandle<()>>>,
    weak: Weak<SessionCoordinator>,
}

impl SessionCoordinator {
    pub fn new(chain: Arc<dyn GameChain>, player: Address) -> Arc<Self> {
        Self::with_config(chain, player, CoordinatorConfig::default())
    }

    pub fn with_config(
        chain: Arc<dyn GameChain>,
        player: Address,
        config: CoordinatorConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            chain,
            player,
            config,
            state: RwLock::new(SessionState::default()),
            tx_pending: AtomicBool::new(false),
            secrets: MoveStore::new(),
            pump: Mutex::new(None),
            weak: weak.clone(),
        })
    }

    pub fn player(&self) -> Address {
        self.player
    }

    /// Observable state snapshot for the UI layer.
    pub fn state(&self) -> SessionState {
        let mut snapshot = self.state.read().clone();
        snapshot.is_transaction_pending = self.tx_pending.load(Ordering::Acquire);
        snapshot
    }

    pub fn is_transaction_pending(&self) -> bool {
        self.tx_pending.load(Ordering::Acquire)
    }

    /// The cached secret for a committed move, if it is still held.
    pub fn committed_secret(&self, id: SessionId) -> Option<MoveSecret> {
        self.secrets.get(id)
    }

    /// Re-install a secret saved elsewhere, e.g. after a client restart.
    pub fn restore_secret(&self, id: SessionId, secret: MoveSecret) {
        self.secrets.insert(id, secret);
    }

    fn apply(&self, update: Update) {
        let mut state = self.state.write();
        let next = state.reduce(update);
        *state = next;
    }

    fn session_id(&self) -> Option<SessionId> {
        self.state.read().session_id
    }

    fn try_begin_tx(&self) -> Option<TxPermit<'_>> {
        self.tx_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TxPermit(&self.tx_pending))
    }

    fn record_failure(&self, err: &RpsError) {
        let classified = classify(&err.to_string());
        tracing::warn!(kind = ?classified.kind, error = %err, "chain call failed");
        self.apply(Update::ActionFailed { error: classified });
    }

    /// Stake `entry_fee` and open a new session.
    ///
    /// Returns `Ok(None)` when another transaction is in flight; the call
    /// is dropped, not queued.
    pub async fn create_game(&self, entry_fee: Amount) -> Result<Option<SessionId>> {
        let Some(_permit) = self.try_begin_tx() else {
            tracing::debug!("transaction in flight, dropping create_game");
            return Ok(None);
        };
        if self.state.read().phase != Phase::Idle {
            return Err(RpsError::invalid_state("create_game requires an idle session"));
        }

        self.apply(Update::CreateStarted { entry_fee });
        match self.chain.create_game(self.player, entry_fee).await {
            Ok(id) => {
                tracing::info!(session = id, "game created");
                self.apply(Update::CreateConfirmed { session_id: id });
                self.attach(id);
                Ok(Some(id))
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Join an existing session, staking the same fee the creator staked.
    pub async fn join_game(&self, id: SessionId, entry_fee: Amount) -> Result<()> {
        let Some(_permit) = self.try_begin_tx() else {
            tracing::debug!("transaction in flight, dropping join_game");
            return Ok(());
        };
        if self.state.read().phase != Phase::Idle {
            return Err(RpsError::invalid_state("join_game requires an idle session"));
        }

        self.apply(Update::JoinStarted {
            session_id: id,
            entry_fee,
        });
        match self.chain.join_game(id, self.player, entry_fee).await {
            Ok(()) => {
                tracing::info!(session = id, "joined game");
                self.apply(Update::JoinConfirmed);
                self.attach(id);
                let _ = self.refresh_players().await;
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Publish the commitment hash for `mv`; the move and nonce stay
    /// local until reveal.
    pub async fn commit_move(&self, mv: Move) -> Result<()> {
        if !mv.is_playable() {
            return Err(RpsError::InvalidMove(
                "choose rock, paper or scissors".to_string(),
            ));
        }
        let Some(_permit) = self.try_begin_tx() else {
            tracing::debug!("transaction in flight, dropping commit_move");
            return Ok(());
        };
        let id = {
            let state = self.state.read();
            if state.phase != Phase::Committing {
                return Err(RpsError::invalid_state("not in the commit phase"));
            }
            state
                .session_id
                .ok_or_else(|| RpsError::internal("commit phase without a session id"))?
        };

        let nonce = generate_nonce();
        let hash = commitment_hash(self.player, mv, nonce)?;
        match self.chain.commit_move(id, self.player, hash).await {
            Ok(()) => {
                self.secrets.insert(id, MoveSecret { mv, nonce });
                self.apply(Update::CommitConfirmed);
                self.schedule_refresh(self.config.result_poll_delay);
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Disclose the cached `(move, nonce)` pair.
    ///
    /// Locally guarded: once revealed, or while any transaction is in
    /// flight, the call is a silent no-op and no chain call is issued.
    pub async fn reveal_move(&self) -> Result<()> {
        let id = {
            let state = self.state.read();
            if state.phase != Phase::Revealing {
                return Err(RpsError::invalid_state("not in the reveal phase"));
            }
            if state.has_revealed {
                tracing::debug!("move already revealed, dropping reveal_move");
                return Ok(());
            }
            state
                .session_id
                .ok_or_else(|| RpsError::internal("reveal phase without a session id"))?
        };
        let Some(_permit) = self.try_begin_tx() else {
            tracing::debug!("transaction in flight, dropping reveal_move");
            return Ok(());
        };

        let Some(secret) = self.secrets.get(id) else {
            let err = RpsError::SecretLost(id);
            self.record_failure(&err);
            return Err(err);
        };
        match self
            .chain
            .reveal_move(id, self.player, secret.mv, secret.nonce)
            .await
        {
            Ok(()) => {
                self.apply(Update::RevealConfirmed);
                self.schedule_result_poll(self.config.result_poll_delay);
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Ask the chain to finalize without the missing reveals. Only
    /// meaningful after the reveal deadline; the chain enforces that.
    pub async fn force_resolve_game(&self) -> Result<()> {
        let id = {
            let state = self.state.read();
            if !matches!(state.phase, Phase::Committing | Phase::Revealing) {
                return Err(RpsError::invalid_state("nothing to force-resolve"));
            }
            state
                .session_id
                .ok_or_else(|| RpsError::internal("force-resolve without a session id"))?
        };
        let Some(_permit) = self.try_begin_tx() else {
            tracing::debug!("transaction in flight, dropping force_resolve_game");
            return Ok(());
        };

        // Surface the deadline; the chain is the enforcement authority
        // and rejects early calls itself.
        if let Ok(deadline @ Some(_)) = self.chain.get_reveal_deadline(id).await {
            self.apply(Update::DeadlineObserved { deadline });
        }

        match self.chain.force_resolve(id, self.player).await {
            Ok(()) => {
                self.schedule_result_poll(self.config.result_poll_delay);
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Claim any pull-payment balance the hub holds for this player.
    pub async fn withdraw(&self) -> Result<Option<Amount>> {
        let Some(_permit) = self.try_begin_tx() else {
            tracing::debug!("transaction in flight, dropping withdraw");
            return Ok(None);
        };
        match self.chain.withdraw(self.player).await {
            Ok(amount) => {
                tracing::info!(amount = %amount, "withdrew balance");
                let _ = self.refresh_balance().await;
                Ok(Some(amount))
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Re-attach to an existing session after a restart. The phase is
    /// derived from a fresh chain read, not from remembered state.
    pub async fn resume(&self, id: SessionId) -> Result<()> {
        if self.state.read().phase != Phase::Idle {
            return Err(RpsError::invalid_state(
                "reset before resuming another session",
            ));
        }
        let snapshot = self.chain.get_game(id).await?;
        let committed = snapshot.committed.contains(&self.player);
        let has_revealed = snapshot.revealed.contains(&self.player);
        let phase = if snapshot.players.len() < 2 {
            Phase::Waiting
        } else if committed {
            Phase::Revealing
        } else {
            Phase::Committing
        };
        self.apply(Update::Attached {
            session_id: id,
            entry_fee: snapshot.entry_fee,
            players: snapshot.players,
            reveal_deadline: snapshot.reveal_deadline,
            phase,
            has_revealed,
        });
        self.attach(id);
        let _ = self.check_game_result().await;
        let _ = self.refresh_balance().await;
        Ok(())
    }

    /// Force a fresh authoritative read of players, result and balance
    /// without waiting for any scheduled poll.
    pub async fn refresh(&self) -> Result<()> {
        self.refresh_players().await?;
        self.check_game_result().await?;
        self.refresh_balance().await?;
        Ok(())
    }

    /// Read the result directly; promotes the session to `Finished` when
    /// `completed_at` is non-zero.
    pub async fn check_game_result(&self) -> Result<Option<GameResult>> {
        let Some(id) = self.session_id() else {
            return Ok(None);
        };
        let result = self.chain.get_game_result(id).await?;
        if result.is_resolved() {
            self.apply(Update::ResultAvailable {
                result: result.clone(),
            });
            let _ = self.refresh_balance().await;
            Ok(Some(result))
        } else {
            Ok(None)
        }
    }

    pub async fn refresh_balance(&self) -> Result<()> {
        let balance = self.chain.get_balance(self.player).await?;
        self.apply(Update::BalanceObserved {
            balance: balance.withdrawable,
        });
        Ok(())
    }

    /// Unsubscribe, forget all cached secrets and return to `Idle`. After
    /// this, no further events affect state; an unrevealed commitment
    /// becomes unwinnable through the normal path.
    pub fn reset_game(&self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
        self.secrets.clear();
        self.apply(Update::Reset);
        tracing::info!("session state reset");
    }

    /// Clear the recorded error and the local revealed flag so a reveal
    /// can be retried; the chain remains the double-reveal authority.
    pub fn reset_reveal_state(&self) {
        self.apply(Update::RevealStateReset);
    }

    pub fn clear_error(&self) {
        self.apply(Update::ErrorCleared);
    }

    fn attach(&self, id: SessionId) {
        self.spawn_pump(self.chain.subscribe(id));
        self.schedule_resync(self.config.resync_delay);
    }

    fn spawn_pump(&self, mut rx: EventReceiver) {
        let weak = self.weak.clone();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let Some(coordinator) = weak.upgrade() else { break };
                        coordinator.on_event(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "event stream lagged, reconciliation reads cover the gap");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        if let Some(previous) = self.pump.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Events are hints, not truth: anything that could advance the
    /// phase triggers a direct read instead of being trusted alone.
    async fn on_event(&self, event: GameEvent) {
        tracing::debug!(?event, "session event");
        match event {
            GameEvent::PlayerJoined { .. }
            | GameEvent::ReadyToPlay { .. }
            | GameEvent::SessionStarted => {
                let _ = self.refresh_players().await;
            }
            GameEvent::MoveCommitted { .. } => {
                // Opponent progress; our phase advances on our own
                // confirmation or on RevealPhaseStarted.
            }
            GameEvent::RevealPhaseStarted { deadline } => {
                self.apply(Update::RevealPhaseStarted { deadline });
            }
            GameEvent::MoveRevealed { player } => {
                if player != self.player {
                    let _ = self.check_game_result().await;
                }
            }
            GameEvent::GameResultDetermined => {
                let _ = self.check_game_result().await;
            }
            GameEvent::AutoWithdrawal { .. } | GameEvent::WithdrawalFailed { .. } => {
                let _ = self.refresh_balance().await;
            }
            GameEvent::Unknown => {}
        }
    }

    async fn refresh_players(&self) -> Result<()> {
        let Some(id) = self.session_id() else {
            return Ok(());
        };
        let snapshot = self.chain.get_game(id).await?;
        self.apply(Update::PlayersObserved {
            players: snapshot.players,
        });
        self.apply(Update::DeadlineObserved {
            deadline: snapshot.reveal_deadline,
        });
        Ok(())
    }

    /// One-shot re-check after subscribing; errors are swallowed because
    /// "not ready yet" is the expected case.
    fn schedule_resync(&self, delay: Duration) {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(coordinator) = weak.upgrade() {
                let _ = coordinator.refresh_players().await;
                let _ = coordinator.check_game_result().await;
                let _ = coordinator.refresh_balance().await;
            }
        });
    }

    fn schedule_refresh(&self, delay: Duration) {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(coordinator) = weak.upgrade() {
                let _ = coordinator.refresh_players().await;
            }
        });
    }

    fn schedule_result_poll(&self, delay: Duration) {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(coordinator) = weak.upgrade() {
                let _ = coordinator.check_game_result().await;
            }
        });
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::LocalChain;
    use crate::classify::{ErrorKind, SuggestedAction};
    use chrono::Duration as ChronoDuration;

    fn fee() -> Amount {
        Amount::from_eth_str("0.01").unwrap()
    }

    fn test_config() -> CoordinatorConfig {
        CoordinatorConfig {
            resync_delay: Duration::from_millis(50),
            result_poll_delay: Duration::from_millis(50),
        }
    }

    fn setup() -> (Arc<LocalChain>, Arc<SessionCoordinator>, Arc<SessionCoordinator>) {
        let chain = Arc::new(LocalChain::new());
        let alice_addr = Address::repeat_byte(0xa1);
        let bob_addr = Address::repeat_byte(0xb2);
        chain.fund(alice_addr, Amount::from_eth_str("1").unwrap());
        chain.fund(bob_addr, Amount::from_eth_str("1").unwrap());
        let alice = SessionCoordinator::with_config(chain.clone(), alice_addr, test_config());
        let bob = SessionCoordinator::with_config(chain.clone(), bob_addr, test_config());
        (chain, alice, bob)
    }

    async fn wait_until(what: &str, condition: impl Fn() -> bool) {
        for _ in 0..300 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    async fn play_until_committing(
        alice: &Arc<SessionCoordinator>,
        bob: &Arc<SessionCoordinator>,
    ) -> SessionId {
        let id = alice.create_game(fee()).await.unwrap().unwrap();
        assert_eq!(alice.state().phase, Phase::Waiting);
        bob.join_game(id, fee()).await.unwrap();
        let a = alice.clone();
        let b = bob.clone();
        wait_until("both players in the commit phase", move || {
            a.state().phase == Phase::Committing && b.state().phase == Phase::Committing
        })
        .await;
        id
    }

    #[tokio::test]
    async fn happy_path_creator_wins() {
        let (_chain, alice, bob) = setup();
        let _id = play_until_committing(&alice, &bob).await;

        alice.commit_move(Move::Rock).await.unwrap();
        assert_eq!(alice.state().phase, Phase::Revealing);
        bob.commit_move(Move::Scissors).await.unwrap();

        let a = alice.clone();
        wait_until("reveal deadline observed", move || {
            a.state().reveal_deadline.is_some()
        })
        .await;

        alice.reveal_move().await.unwrap();
        bob.reveal_move().await.unwrap();

        let a = alice.clone();
        let b = bob.clone();
        wait_until("both sessions finished", move || {
            a.state().phase == Phase::Finished && b.state().phase == Phase::Finished
        })
        .await;

        let result = alice.state().result.unwrap();
        assert_eq!(result.winner, alice.player());
        assert!(!result.is_draw);
        assert_eq!(result.prize, Amount::from_eth_str("0.02").unwrap());
        assert_eq!(result.moves, vec![Move::Rock, Move::Scissors]);
        assert!(result.completed_at != 0);
    }

    #[tokio::test]
    async fn draw_refunds_both_players() {
        let (chain, alice, bob) = setup();
        let _id = play_until_committing(&alice, &bob).await;

        alice.commit_move(Move::Paper).await.unwrap();
        bob.commit_move(Move::Paper).await.unwrap();
        alice.reveal_move().await.unwrap();
        bob.reveal_move().await.unwrap();

        let a = alice.clone();
        wait_until("session finished", move || {
            a.state().phase == Phase::Finished
        })
        .await;

        let result = alice.state().result.unwrap();
        assert!(result.is_draw);
        assert_eq!(result.winner, Address::ZERO);
        assert_eq!(result.prize.halved(), fee());

        // Each stake went back where it came from.
        let balance = chain.get_balance(alice.player()).await.unwrap();
        assert_eq!(balance.available, Amount::from_eth_str("1").unwrap());
        let balance = chain.get_balance(bob.player()).await.unwrap();
        assert_eq!(balance.available, Amount::from_eth_str("1").unwrap());
    }

    #[tokio::test]
    async fn forced_resolution_after_missed_reveal() {
        let (chain, alice, bob) = setup();
        let _id = play_until_committing(&alice, &bob).await;

        alice.commit_move(Move::Rock).await.unwrap();
        bob.commit_move(Move::Paper).await.unwrap();
        alice.reveal_move().await.unwrap();
        // Bob never reveals.

        chain.advance_clock(ChronoDuration::minutes(10));
        alice.force_resolve_game().await.unwrap();

        let a = alice.clone();
        wait_until("forced resolution finished", move || {
            a.state().phase == Phase::Finished
        })
        .await;

        let result = alice.state().result.unwrap();
        assert!(result.completed_at != 0);
        assert_eq!(result.winner, alice.player());
        assert_eq!(result.moves, vec![Move::Rock, Move::None]);
        assert_eq!(chain.calls("reveal_move"), 1);
    }

    #[tokio::test]
    async fn at_most_one_mutating_call_in_flight() {
        let (chain, alice, bob) = setup();
        let id = play_until_committing(&alice, &bob).await;

        chain.set_latency(Duration::from_millis(100));
        let (first, second) =
            tokio::join!(alice.commit_move(Move::Rock), alice.commit_move(Move::Paper));
        first.unwrap();
        second.unwrap();

        assert_eq!(chain.calls("commit_move"), 1);
        // The dropped call left no trace: the confirmed secret is the first one.
        assert_eq!(alice.committed_secret(id).unwrap().mv, Move::Rock);
        assert_eq!(alice.state().phase, Phase::Revealing);
    }

    #[tokio::test]
    async fn reveal_guard_is_idempotent() {
        let (chain, alice, bob) = setup();
        let _id = play_until_committing(&alice, &bob).await;

        alice.commit_move(Move::Rock).await.unwrap();
        bob.commit_move(Move::Scissors).await.unwrap();

        chain.set_latency(Duration::from_millis(100));
        let (first, second) = tokio::join!(alice.reveal_move(), alice.reveal_move());
        first.unwrap();
        second.unwrap();
        assert_eq!(chain.calls("reveal_move"), 1);

        // A third attempt after confirmation is also a local no-op.
        alice.reveal_move().await.unwrap();
        assert_eq!(chain.calls("reveal_move"), 1);
        assert!(alice.state().has_revealed);
    }

    #[tokio::test]
    async fn reset_clears_all_ephemeral_state() {
        let (_chain, alice, bob) = setup();
        let id = play_until_committing(&alice, &bob).await;
        alice.commit_move(Move::Rock).await.unwrap();
        assert!(alice.committed_secret(id).is_some());

        alice.reset_game();

        let state = alice.state();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.session_id.is_none());
        assert!(state.result.is_none());
        assert!(state.error.is_none());
        assert!(alice.committed_secret(id).is_none());

        // Subscription released: opponent activity no longer reaches us.
        bob.commit_move(Move::Scissors).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(alice.state().phase, Phase::Idle);
        assert!(alice.state().reveal_deadline.is_none());
    }

    #[tokio::test]
    async fn failed_create_rolls_back_and_classifies() {
        let chain = Arc::new(LocalChain::new());
        let broke = Address::repeat_byte(0x99);
        let coordinator = SessionCoordinator::with_config(chain, broke, test_config());

        let err = coordinator.create_game(fee()).await.unwrap_err();
        assert!(matches!(err, RpsError::InsufficientFunds { .. }));

        let state = coordinator.state();
        assert_eq!(state.phase, Phase::Idle);
        let error = state.error.unwrap();
        assert_eq!(error.kind, ErrorKind::InsufficientFunds);
        assert_eq!(error.action, SuggestedAction::FundAccount);
    }

    #[tokio::test]
    async fn resume_recovers_a_session_that_advanced_while_offline() {
        let (chain, alice, bob) = setup();

        // The whole join happened before this client ever subscribed.
        let id = chain.create_game(alice.player(), fee()).await.unwrap();
        chain.join_game(id, bob.player(), fee()).await.unwrap();

        alice.resume(id).await.unwrap();
        let state = alice.state();
        assert_eq!(state.phase, Phase::Committing);
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.entry_fee, Some(fee()));

        // The session stays live from here on.
        alice.commit_move(Move::Scissors).await.unwrap();
        assert_eq!(alice.state().phase, Phase::Revealing);
    }

    #[tokio::test]
    async fn lost_secret_is_terminal_for_the_round() {
        let (chain, alice, bob) = setup();
        let id = play_until_committing(&alice, &bob).await;

        alice.commit_move(Move::Rock).await.unwrap();
        bob.commit_move(Move::Paper).await.unwrap();
        bob.reveal_move().await.unwrap();

        // Client restart: the cached move and nonce are gone.
        alice.reset_game();
        alice.resume(id).await.unwrap();
        assert_eq!(alice.state().phase, Phase::Revealing);

        let err = alice.reveal_move().await.unwrap_err();
        assert!(matches!(err, RpsError::SecretLost(_)));
        let error = alice.state().error.unwrap();
        assert_eq!(error.action, SuggestedAction::Acknowledge);

        // The only path left: force resolution after the deadline,
        // which goes to the revealed player.
        chain.advance_clock(ChronoDuration::minutes(10));
        alice.force_resolve_game().await.unwrap();
        let a = alice.clone();
        wait_until("forced resolution finished", move || {
            a.state().phase == Phase::Finished
        })
        .await;
        assert_eq!(alice.state().result.unwrap().winner, bob.player());
    }

    #[tokio::test]
    async fn failed_auto_payout_surfaces_via_manual_withdraw() {
        let (chain, alice, bob) = setup();
        chain.fail_auto_withdraw_for(alice.player());
        let _id = play_until_committing(&alice, &bob).await;

        alice.commit_move(Move::Paper).await.unwrap();
        bob.commit_move(Move::Rock).await.unwrap();
        alice.reveal_move().await.unwrap();
        bob.reveal_move().await.unwrap();

        let prize = Amount::from_eth_str("0.02").unwrap();
        let a = alice.clone();
        wait_until("pull balance observed", move || {
            a.state().user_balance == prize
        })
        .await;

        let claimed = alice.withdraw().await.unwrap();
        assert_eq!(claimed, Some(prize));
        let a = alice.clone();
        wait_until("balance drained", move || a.state().user_balance.is_zero()).await;

        // Nothing left: a second withdrawal reverts and classifies.
        let err = alice.withdraw().await.unwrap_err();
        assert!(matches!(err, RpsError::NoBalance));
        assert_eq!(
            alice.state().error.unwrap().kind,
            ErrorKind::NoBalanceToWithdraw
        );
    }
}

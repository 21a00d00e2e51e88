//! The game hub as the client sees it.
//!
//! Everything here is a read/write surface over the deployed contract;
//! the chain, not the client, is the authority on every rule.

pub mod events;
pub mod local;

pub use events::{EventReceiver, GameEvent};
pub use local::{ChainState, LocalChain};

use crate::error::Result;
use crate::moves::Move;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use somnia_core::{Amount, Balance};

/// Chain-assigned numeric session identifier.
pub type SessionId = u64;

/// Read-model of one on-chain session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: SessionId,
    pub entry_fee: Amount,
    /// Append-only, never reordered; at most two entries.
    pub players: Vec<Address>,
    pub committed: Vec<Address>,
    pub revealed: Vec<Address>,
    pub reveal_deadline: Option<DateTime<Utc>>,
}

/// Terminal outcome of a session.
///
/// `completed_at == 0` means "not yet resolved"; once non-zero the session
/// is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Zero address when there is no winner (draw or cancelled).
    pub winner: Address,
    /// Revealed moves, ordered to match the session's player list.
    pub moves: Vec<Move>,
    pub prize: Amount,
    pub is_draw: bool,
    pub completed_at: i64,
}

impl GameResult {
    pub fn pending() -> Self {
        Self {
            winner: Address::ZERO,
            moves: Vec::new(),
            prize: Amount::ZERO,
            is_draw: false,
            completed_at: 0,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.completed_at != 0
    }
}

/// Async surface of the game hub contract.
///
/// Every mutating call resolves at transaction *confirmation*, not
/// submission; a resolved `Err` means the transaction reverted or never
/// made it on chain.
#[async_trait]
pub trait GameChain: Send + Sync {
    async fn create_game(&self, creator: Address, entry_fee: Amount) -> Result<SessionId>;

    /// The fee must exactly equal the fee recorded at creation.
    async fn join_game(&self, id: SessionId, joiner: Address, entry_fee: Amount) -> Result<()>;

    /// Publishes the commitment hash only; the move and nonce never
    /// travel in clear at commit time.
    async fn commit_move(&self, id: SessionId, player: Address, commitment: B256) -> Result<()>;

    /// The chain recomputes the commitment from `(mv, nonce)` and rejects
    /// the reveal on any mismatch.
    async fn reveal_move(&self, id: SessionId, player: Address, mv: Move, nonce: U256)
        -> Result<()>;

    /// Finalizes without the missing reveals. Rejected until the reveal
    /// deadline has passed.
    async fn force_resolve(&self, id: SessionId, caller: Address) -> Result<()>;

    /// Claims any pull-payment balance the hub holds for `player`.
    async fn withdraw(&self, player: Address) -> Result<Amount>;

    async fn get_game(&self, id: SessionId) -> Result<GameSnapshot>;
    async fn get_game_result(&self, id: SessionId) -> Result<GameResult>;
    async fn get_reveal_deadline(&self, id: SessionId) -> Result<Option<DateTime<Utc>>>;
    async fn get_balance(&self, player: Address) -> Result<Balance>;

    /// Log events for one session. Delivery is best-effort: late,
    /// duplicated and missed events are all possible.
    fn subscribe(&self, id: SessionId) -> EventReceiver;
}

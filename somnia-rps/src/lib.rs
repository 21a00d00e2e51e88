//! Commit-reveal Rock-Paper-Scissors client for the Somnia game hub
//!
//! Players first publish a hash of their move, then disclose the move and
//! nonce once both sides are locked in; the hub contract verifies the
//! reveal against the commitment and pays out the winner. This crate
//! provides the session coordinator that drives one such game end to end,
//! reconciling optimistic client state with the chain's events and reads.

pub mod chain;
pub mod classify;
pub mod commitment;
pub mod error;
pub mod moves;
pub mod session;

pub use chain::{
    ChainState, EventReceiver, GameChain, GameEvent, GameResult, GameSnapshot, LocalChain,
    SessionId,
};
pub use classify::{classify, ClassifiedError, ErrorKind, SuggestedAction};
pub use commitment::{commitment_hash, generate_nonce, verify, MoveSecret};
pub use error::{Result, RpsError};
pub use moves::Move;
pub use session::{CoordinatorConfig, Phase, SessionCoordinator, SessionState};

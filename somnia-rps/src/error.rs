use crate::chain::SessionId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RpsError>;

#[derive(Error, Debug)]
pub enum RpsError {
    #[error("Somnia core error: {0}")]
    Core(#[from] somnia_core::SomniaError),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Session {0} was not found")]
    SessionNotFound(SessionId),

    #[error("Game is full")]
    GameFull,

    #[error("Caller is not a player in session {0}")]
    NotAPlayer(SessionId),

    #[error("Entry fee mismatch: session requires {expected}, got {got}")]
    FeeMismatch { expected: String, got: String },

    #[error("Session not ready: {0}")]
    SessionNotReady(String),

    #[error("Move already committed for this session")]
    AlreadyCommitted,

    #[error("Move already revealed for this session")]
    AlreadyRevealed,

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Revealed move does not match the committed hash")]
    CommitmentMismatch,

    #[error("Reveal deadline has not passed yet")]
    RevealTooEarly,

    #[error("No balance to withdraw")]
    NoBalance,

    #[error("Insufficient funds: need {need}, have {available}")]
    InsufficientFunds { need: String, available: String },

    #[error("Commitment secret lost for session {0}; the move can no longer be revealed")]
    SecretLost(SessionId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpsError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

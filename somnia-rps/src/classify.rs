//! Best-effort classification of opaque chain and wallet errors.
//!
//! Transports surface failures as strings; this maps them onto a closed
//! taxonomy with one suggested user action per kind. Matching is
//! lower-cased substring search, first hit wins, and anything unmatched
//! lands in [`ErrorKind::Unknown`]. Total: never panics, always returns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UserRejected,
    InsufficientFunds,
    AlreadyCommitted,
    SessionNotReady,
    RevealTooEarly,
    InvalidMove,
    NoBalanceToWithdraw,
    WithdrawalFailed,
    NetworkError,
    WalletDisconnected,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedAction {
    Retry,
    FundAccount,
    Wait,
    Connect,
    Acknowledge,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::UserRejected,
        ErrorKind::InsufficientFunds,
        ErrorKind::AlreadyCommitted,
        ErrorKind::SessionNotReady,
        ErrorKind::RevealTooEarly,
        ErrorKind::InvalidMove,
        ErrorKind::NoBalanceToWithdraw,
        ErrorKind::WithdrawalFailed,
        ErrorKind::NetworkError,
        ErrorKind::WalletDisconnected,
        ErrorKind::Unknown,
    ];

    pub fn action(self) -> SuggestedAction {
        match self {
            ErrorKind::UserRejected => SuggestedAction::Retry,
            ErrorKind::InsufficientFunds => SuggestedAction::FundAccount,
            ErrorKind::AlreadyCommitted => SuggestedAction::Wait,
            ErrorKind::SessionNotReady => SuggestedAction::Wait,
            ErrorKind::RevealTooEarly => SuggestedAction::Wait,
            ErrorKind::InvalidMove => SuggestedAction::Retry,
            ErrorKind::NoBalanceToWithdraw => SuggestedAction::Acknowledge,
            ErrorKind::WithdrawalFailed => SuggestedAction::Retry,
            ErrorKind::NetworkError => SuggestedAction::Retry,
            ErrorKind::WalletDisconnected => SuggestedAction::Connect,
            ErrorKind::Unknown => SuggestedAction::Acknowledge,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::UserRejected => "Transaction was rejected in the wallet.",
            ErrorKind::InsufficientFunds => "Not enough funds to cover the stake and gas.",
            ErrorKind::AlreadyCommitted => "A move is already committed for this game.",
            ErrorKind::SessionNotReady => "The game is not ready for that action yet.",
            ErrorKind::RevealTooEarly => "The reveal deadline has not passed yet.",
            ErrorKind::InvalidMove => "That move was not accepted by the game.",
            ErrorKind::NoBalanceToWithdraw => "There is nothing to withdraw.",
            ErrorKind::WithdrawalFailed => "The withdrawal could not be completed.",
            ErrorKind::NetworkError => "Could not reach the network.",
            ErrorKind::WalletDisconnected => "The wallet is not connected.",
            ErrorKind::Unknown => "Something went wrong.",
        }
    }
}

/// A classified failure, stored as the session's observable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub action: SuggestedAction,
    /// The raw text the classification was derived from.
    pub detail: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            message: kind.user_message().to_string(),
            action: kind.action(),
            detail: detail.into(),
        }
    }
}

/// Ordered keyword table; earlier rows win.
const RULES: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::UserRejected,
        &[
            "user rejected",
            "user denied",
            "rejected the request",
            "request rejected",
            "signature denied",
        ],
    ),
    (
        ErrorKind::InsufficientFunds,
        &[
            "insufficient funds",
            "insufficient balance",
            "exceeds balance",
            "not enough funds",
        ],
    ),
    (
        ErrorKind::AlreadyCommitted,
        &["already committed", "move already"],
    ),
    (
        ErrorKind::RevealTooEarly,
        &["too early", "deadline has not", "before the deadline"],
    ),
    (
        ErrorKind::SessionNotReady,
        &[
            "not ready",
            "not started",
            "not found",
            "waiting for opponent",
            "waiting for player",
            "no opponent",
            "not active",
        ],
    ),
    (
        ErrorKind::InvalidMove,
        &[
            "invalid move",
            "invalid choice",
            "does not match the committed",
        ],
    ),
    (
        ErrorKind::NoBalanceToWithdraw,
        &["no balance", "nothing to withdraw"],
    ),
    (
        ErrorKind::WithdrawalFailed,
        &[
            "withdrawal failed",
            "withdraw failed",
            "transfer failed",
            "payout failed",
        ],
    ),
    (
        ErrorKind::WalletDisconnected,
        &[
            "wallet not connected",
            "not connected",
            "disconnected",
            "no signer",
        ],
    ),
    (
        ErrorKind::NetworkError,
        &[
            "network",
            "timeout",
            "timed out",
            "connection",
            "unreachable",
            "rpc",
            "rate limit",
        ],
    ),
];

pub fn classify(raw: &str) -> ClassifiedError {
    let lowered = raw.to_lowercase();
    for (kind, needles) in RULES {
        if needles.iter().any(|n| lowered.contains(n)) {
            return ClassifiedError::new(*kind, raw);
        }
    }
    ClassifiedError::new(ErrorKind::Unknown, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_failures() {
        assert_eq!(
            classify("MetaMask Tx Signature: User denied transaction signature.").kind,
            ErrorKind::UserRejected
        );
        assert_eq!(
            classify("insufficient funds for gas * price + value").kind,
            ErrorKind::InsufficientFunds
        );
        assert_eq!(
            classify("execution reverted: Move already committed").kind,
            ErrorKind::AlreadyCommitted
        );
        assert_eq!(
            classify("execution reverted: reveal deadline has not passed yet").kind,
            ErrorKind::RevealTooEarly
        );
        assert_eq!(
            classify("Session 7 was not found").kind,
            ErrorKind::SessionNotReady
        );
        assert_eq!(
            classify("revealed move does not match the committed hash").kind,
            ErrorKind::InvalidMove
        );
        assert_eq!(
            classify("execution reverted: no balance to withdraw").kind,
            ErrorKind::NoBalanceToWithdraw
        );
        assert_eq!(
            classify("STT transfer failed").kind,
            ErrorKind::WithdrawalFailed
        );
        assert_eq!(
            classify("wallet not connected").kind,
            ErrorKind::WalletDisconnected
        );
        assert_eq!(
            classify("fetch failed: network request timed out").kind,
            ErrorKind::NetworkError
        );
    }

    #[test]
    fn is_total_on_arbitrary_input() {
        for input in ["", " ", "💥", "ошибка сети нет", "异常", "\0\0\0", "rug pull"] {
            let classified = classify(input);
            assert!(ErrorKind::ALL.contains(&classified.kind));
            assert_eq!(classified.action, classified.kind.action());
        }
        assert_eq!(classify("").kind, ErrorKind::Unknown);
        assert_eq!(classify("").action, SuggestedAction::Acknowledge);
    }

    #[test]
    fn every_kind_maps_to_exactly_one_action() {
        for kind in ErrorKind::ALL {
            // action() is a pure total function; calling twice must agree.
            assert_eq!(kind.action(), kind.action());
            assert!(!kind.user_message().is_empty());
        }
    }
}

//! Pure session state machine.
//!
//! [`SessionState::reduce`] is a side-effect-free transition function; the
//! coordinator owns all I/O and feeds observations in as [`Update`]s.
//! Chain reads and events arrive with no ordering guarantee, so every
//! transition is guarded: an update that does not apply to the current
//! phase is a no-op, not an error.

use crate::chain::{GameResult, SessionId};
use crate::classify::ClassifiedError;
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use somnia_core::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Creating,
    Joining,
    Waiting,
    Committing,
    Revealing,
    Finished,
}

impl Phase {
    /// Position in the forward order; `Creating` and `Joining` share a
    /// rank since they are alternative entries into `Waiting`.
    pub fn rank(self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Creating | Phase::Joining => 1,
            Phase::Waiting => 2,
            Phase::Committing => 3,
            Phase::Revealing => 4,
            Phase::Finished => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Finished
    }
}

/// Observable session state handed to the UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub phase: Phase,
    pub session_id: Option<SessionId>,
    pub entry_fee: Option<Amount>,
    pub players: Vec<Address>,
    pub reveal_deadline: Option<DateTime<Utc>>,
    pub has_revealed: bool,
    pub result: Option<GameResult>,
    pub error: Option<ClassifiedError>,
    pub user_balance: Amount,
    /// Filled in by the coordinator at read time.
    pub is_transaction_pending: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            session_id: None,
            entry_fee: None,
            players: Vec::new(),
            reveal_deadline: None,
            has_revealed: false,
            result: None,
            error: None,
            user_balance: Amount::ZERO,
            is_transaction_pending: false,
        }
    }
}

/// One observation for the reducer.
#[derive(Debug, Clone)]
pub enum Update {
    CreateStarted {
        entry_fee: Amount,
    },
    CreateConfirmed {
        session_id: SessionId,
    },
    JoinStarted {
        session_id: SessionId,
        entry_fee: Amount,
    },
    JoinConfirmed,
    /// Re-attach to an existing session; the coordinator derives the
    /// phase from a fresh chain read.
    Attached {
        session_id: SessionId,
        entry_fee: Amount,
        players: Vec<Address>,
        reveal_deadline: Option<DateTime<Utc>>,
        phase: Phase,
        has_revealed: bool,
    },
    /// Fresh authoritative read of the player list.
    PlayersObserved {
        players: Vec<Address>,
    },
    RevealPhaseStarted {
        deadline: DateTime<Utc>,
    },
    DeadlineObserved {
        deadline: Option<DateTime<Utc>>,
    },
    CommitConfirmed,
    RevealConfirmed,
    ResultAvailable {
        result: GameResult,
    },
    BalanceObserved {
        balance: Amount,
    },
    /// A chain call failed: record the classified error and roll the
    /// phase back to its pre-action state.
    ActionFailed {
        error: ClassifiedError,
    },
    RevealStateReset,
    ErrorCleared,
    Reset,
}

impl SessionState {
    pub fn reduce(&self, update: Update) -> SessionState {
        let mut next = self.clone();
        match update {
            Update::CreateStarted { entry_fee } => {
                if next.phase == Phase::Idle {
                    next.phase = Phase::Creating;
                    next.entry_fee = Some(entry_fee);
                    next.error = None;
                }
            }
            Update::CreateConfirmed { session_id } => {
                if next.phase == Phase::Creating {
                    next.phase = Phase::Waiting;
                    next.session_id = Some(session_id);
                }
            }
            Update::JoinStarted {
                session_id,
                entry_fee,
            } => {
                if next.phase == Phase::Idle {
                    next.phase = Phase::Joining;
                    next.session_id = Some(session_id);
                    next.entry_fee = Some(entry_fee);
                    next.error = None;
                }
            }
            Update::JoinConfirmed => {
                if next.phase == Phase::Joining {
                    next.phase = Phase::Waiting;
                }
            }
            Update::Attached {
                session_id,
                entry_fee,
                players,
                reveal_deadline,
                phase,
                has_revealed,
            } => {
                if next.phase == Phase::Idle {
                    next.phase = phase;
                    next.session_id = Some(session_id);
                    next.entry_fee = Some(entry_fee);
                    next.players = players;
                    next.reveal_deadline = reveal_deadline;
                    next.has_revealed = has_revealed;
                    next.error = None;
                }
            }
            Update::PlayersObserved { players } => {
                if next.phase != Phase::Idle {
                    next.players = players;
                    if next.phase == Phase::Waiting && next.players.len() >= 2 {
                        next.phase = Phase::Committing;
                    }
                }
            }
            Update::RevealPhaseStarted { deadline } => {
                if next.phase != Phase::Idle {
                    next.reveal_deadline = Some(deadline);
                    if next.phase == Phase::Committing {
                        next.phase = Phase::Revealing;
                    }
                }
            }
            Update::DeadlineObserved { deadline } => {
                if next.phase != Phase::Idle && deadline.is_some() {
                    next.reveal_deadline = deadline;
                }
            }
            Update::CommitConfirmed => {
                if next.phase == Phase::Committing {
                    next.phase = Phase::Revealing;
                }
            }
            Update::RevealConfirmed => {
                if next.phase == Phase::Revealing {
                    next.has_revealed = true;
                }
            }
            Update::ResultAvailable { result } => {
                if result.is_resolved() && !matches!(next.phase, Phase::Idle | Phase::Finished) {
                    next.result = Some(result);
                    next.phase = Phase::Finished;
                }
            }
            Update::BalanceObserved { balance } => {
                next.user_balance = balance;
            }
            Update::ActionFailed { error } => {
                next.error = Some(error);
                // Optimistic create/join never landed on chain.
                if matches!(next.phase, Phase::Creating | Phase::Joining) {
                    next.phase = Phase::Idle;
                    next.session_id = None;
                    next.entry_fee = None;
                }
            }
            Update::RevealStateReset => {
                next.has_revealed = false;
                next.error = None;
            }
            Update::ErrorCleared => {
                next.error = None;
            }
            Update::Reset => {
                next = SessionState::default();
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn fee() -> Amount {
        Amount::from_eth_str("0.01").unwrap()
    }

    fn players() -> Vec<Address> {
        vec![Address::repeat_byte(0xa1), Address::repeat_byte(0xb2)]
    }

    fn resolved_result() -> GameResult {
        GameResult {
            winner: Address::repeat_byte(0xa1),
            moves: vec![crate::Move::Rock, crate::Move::Scissors],
            prize: fee().saturating_add(fee()),
            is_draw: false,
            completed_at: 1_700_000_000,
        }
    }

    #[test]
    fn happy_path_is_phase_monotonic() {
        let s0 = SessionState::default();
        let s1 = s0.reduce(Update::CreateStarted { entry_fee: fee() });
        let s2 = s1.reduce(Update::CreateConfirmed { session_id: 7 });
        let s3 = s2.reduce(Update::PlayersObserved { players: players() });
        let s4 = s3.reduce(Update::CommitConfirmed);
        let s5 = s4.reduce(Update::RevealConfirmed);
        let s6 = s5.reduce(Update::ResultAvailable {
            result: resolved_result(),
        });

        let ranks: Vec<u8> = [&s0, &s1, &s2, &s3, &s4, &s5, &s6]
            .iter()
            .map(|s| s.phase.rank())
            .collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted, "phase rank regressed: {ranks:?}");

        assert_eq!(s6.phase, Phase::Finished);
        assert!(s5.has_revealed);
        assert_eq!(s2.session_id, Some(7));
    }

    #[test]
    fn failed_create_rolls_back_to_idle() {
        let state = SessionState::default()
            .reduce(Update::CreateStarted { entry_fee: fee() })
            .reduce(Update::ActionFailed {
                error: classify("insufficient funds for gas"),
            });
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.session_id, None);
        assert!(state.error.is_some());
    }

    #[test]
    fn failed_commit_stays_in_committing() {
        let state = SessionState::default()
            .reduce(Update::JoinStarted {
                session_id: 3,
                entry_fee: fee(),
            })
            .reduce(Update::JoinConfirmed)
            .reduce(Update::PlayersObserved { players: players() });
        assert_eq!(state.phase, Phase::Committing);

        let failed = state.reduce(Update::ActionFailed {
            error: classify("user rejected the request"),
        });
        assert_eq!(failed.phase, Phase::Committing);
        assert_eq!(failed.session_id, Some(3));
    }

    #[test]
    fn duplicate_ready_signals_are_idempotent() {
        let state = SessionState::default()
            .reduce(Update::CreateStarted { entry_fee: fee() })
            .reduce(Update::CreateConfirmed { session_id: 1 })
            .reduce(Update::PlayersObserved { players: players() })
            .reduce(Update::PlayersObserved { players: players() });
        assert_eq!(state.phase, Phase::Committing);
        assert_eq!(state.players.len(), 2);
    }

    #[test]
    fn pending_result_does_not_finish_the_session() {
        let state = SessionState::default()
            .reduce(Update::CreateStarted { entry_fee: fee() })
            .reduce(Update::CreateConfirmed { session_id: 1 })
            .reduce(Update::ResultAvailable {
                result: GameResult::pending(),
            });
        assert_eq!(state.phase, Phase::Waiting);
        assert!(state.result.is_none());
    }

    #[test]
    fn updates_for_other_phases_are_noops() {
        let idle = SessionState::default();
        let after = idle
            .reduce(Update::CommitConfirmed)
            .reduce(Update::RevealConfirmed)
            .reduce(Update::PlayersObserved { players: players() })
            .reduce(Update::RevealPhaseStarted {
                deadline: Utc::now(),
            });
        assert_eq!(after.phase, Phase::Idle);
        assert!(after.players.is_empty());
        assert!(!after.has_revealed);
    }

    #[test]
    fn reset_restores_the_default_state() {
        let state = SessionState::default()
            .reduce(Update::CreateStarted { entry_fee: fee() })
            .reduce(Update::CreateConfirmed { session_id: 9 })
            .reduce(Update::BalanceObserved { balance: fee() })
            .reduce(Update::Reset);
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.session_id.is_none());
        assert!(state.result.is_none());
        assert!(state.error.is_none());
        assert!(state.user_balance.is_zero());
    }
}

//! Per-session contract event stream.

use super::SessionId;
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use somnia_core::Amount;
use std::collections::HashMap;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

pub type EventReceiver = broadcast::Receiver<GameEvent>;

/// Decoded hub contract log, one variant per known event name.
///
/// Consumers must treat unknown tags as a no-op rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    PlayerJoined { player: Address },
    ReadyToPlay { players: Vec<Address> },
    SessionStarted,
    MoveCommitted { player: Address },
    MoveRevealed { player: Address },
    RevealPhaseStarted { deadline: DateTime<Utc> },
    GameResultDetermined,
    AutoWithdrawal { player: Address, amount: Amount },
    WithdrawalFailed { player: Address, amount: Amount },
    Unknown,
}

/// Broadcast fan-out of decoded logs, keyed by session.
pub struct EventHub {
    channels: Mutex<HashMap<SessionId, broadcast::Sender<GameEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender(&self, id: SessionId) -> broadcast::Sender<GameEvent> {
        self.channels
            .lock()
            .entry(id)
            .or_insert_with(|| broadcast::channel(EVENT_CAPACITY).0)
            .clone()
    }

    pub fn subscribe(&self, id: SessionId) -> EventReceiver {
        self.sender(id).subscribe()
    }

    /// Best-effort publish; a session with no subscribers is normal.
    pub fn publish(&self, id: SessionId, event: GameEvent) {
        if self.sender(id).send(event).is_err() {
            tracing::trace!(session = id, "no subscribers for event");
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_subscribers_in_order() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe(1);

        hub.publish(1, GameEvent::SessionStarted);
        hub.publish(1, GameEvent::GameResultDetermined);
        hub.publish(2, GameEvent::SessionStarted); // different session

        assert!(matches!(rx.recv().await.unwrap(), GameEvent::SessionStarted));
        assert!(matches!(
            rx.recv().await.unwrap(),
            GameEvent::GameResultDetermined
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let hub = EventHub::new();
        hub.publish(9, GameEvent::Unknown);
    }
}

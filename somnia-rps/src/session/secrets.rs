//! Keyed store for committed-but-unrevealed move material.
//!
//! Scoped per session and owned by the coordinator; the only eviction
//! paths are an explicit per-session remove and the full clear that
//! `reset_game` performs.

use crate::chain::SessionId;
use crate::commitment::MoveSecret;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct MoveStore {
    inner: Mutex<HashMap<SessionId, MoveSecret>>,
}

impl MoveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: SessionId, secret: MoveSecret) {
        self.inner.lock().insert(id, secret);
    }

    pub fn get(&self, id: SessionId) -> Option<MoveSecret> {
        self.inner.lock().get(&id).copied()
    }

    pub fn remove(&self, id: SessionId) -> Option<MoveSecret> {
        self.inner.lock().remove(&id)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::generate_nonce;
    use crate::Move;

    #[test]
    fn secrets_are_scoped_per_session() {
        let store = MoveStore::new();
        let a = MoveSecret {
            mv: Move::Rock,
            nonce: generate_nonce(),
        };
        let b = MoveSecret {
            mv: Move::Paper,
            nonce: generate_nonce(),
        };
        store.insert(1, a);
        store.insert(2, b);

        assert_eq!(store.get(1), Some(a));
        assert_eq!(store.get(2), Some(b));

        store.clear();
        assert_eq!(store.get(1), None);
        assert_eq!(store.get(2), None);
    }
}

//! Move commitment codec.
//!
//! A commitment is `keccak256(packed(player, uint256(move), uint256(nonce)))`;
//! the packing lives in [`somnia_core::commitment_digest`] and is bit-exact
//! with the hub contract's verifier. Reveal-side there is nothing to compute:
//! the client's only job is to retain the exact `(move, nonce)` pair.

use crate::error::{Result, RpsError};
use crate::moves::Move;
use alloy_primitives::{Address, B256, U256};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use somnia_core::commitment_digest;

/// The secret material behind a published commitment.
///
/// Held only between commit and reveal; losing it before reveal makes the
/// round unwinnable through the normal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSecret {
    pub mv: Move,
    pub nonce: U256,
}

/// 128 bits of nonce material from the thread RNG.
pub fn generate_nonce() -> U256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes[16..]);
    U256::from_be_bytes(bytes)
}

pub fn commitment_hash(player: Address, mv: Move, nonce: U256) -> Result<B256> {
    if !mv.is_playable() {
        return Err(RpsError::InvalidMove(
            "cannot commit the absence sentinel".to_string(),
        ));
    }
    Ok(commitment_digest(player, U256::from(mv.ordinal()), nonce))
}

pub fn verify(player: Address, mv: Move, nonce: U256, hash: B256) -> bool {
    commitment_digest(player, U256::from(mv.ordinal()), nonce) == hash
}

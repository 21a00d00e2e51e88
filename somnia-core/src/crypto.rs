use alloy_primitives::{keccak256, Address, B256, U256};

/// Commitment digest over `(address, uint256, uint256)`.
///
/// The fields are packed, not ABI-tuple encoded: 20 address bytes followed
/// by two big-endian 32-byte words, 84 bytes total. This must stay
/// bit-exact with `keccak256(abi.encodePacked(player, value, nonce))` in
/// the hub contract or reveals will never verify.
pub fn commitment_digest(player: Address, value: U256, nonce: U256) -> B256 {
    let mut packed = [0u8; 84];
    packed[..20].copy_from_slice(player.as_slice());
    packed[20..52].copy_from_slice(&value.to_be_bytes::<32>());
    packed[52..84].copy_from_slice(&nonce.to_be_bytes::<32>());
    keccak256(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_manual_packing() {
        let player = Address::repeat_byte(0xab);
        let value = U256::from(2u8);
        let nonce = U256::from(0xdead_beefu64);

        let mut buf = Vec::with_capacity(84);
        buf.extend_from_slice(player.as_slice());
        buf.extend_from_slice(&value.to_be_bytes::<32>());
        buf.extend_from_slice(&nonce.to_be_bytes::<32>());
        assert_eq!(buf.len(), 84);

        let expected = keccak256(&buf);
        assert_eq!(commitment_digest(player, value, nonce), expected);
        assert_eq!(hex::encode(expected), hex::encode(commitment_digest(player, value, nonce)));
    }

    #[test]
    fn digest_is_sensitive_to_every_field() {
        let player = Address::repeat_byte(0x11);
        let base = commitment_digest(player, U256::from(1u8), U256::from(42u8));

        assert_ne!(base, commitment_digest(Address::repeat_byte(0x12), U256::from(1u8), U256::from(42u8)));
        assert_ne!(base, commitment_digest(player, U256::from(2u8), U256::from(42u8)));
        assert_ne!(base, commitment_digest(player, U256::from(1u8), U256::from(43u8)));
    }
}

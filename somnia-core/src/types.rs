use crate::error::{Result, SomniaError};
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 10^18 wei per native token unit.
const WEI_PER_ETH: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Wei-denominated amount of the chain's native token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256::ZERO);

    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    /// Parse a decimal token-unit string such as `"0.01"` into wei.
    pub fn from_eth_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(SomniaError::amount(format!("empty amount: {s:?}")));
        }
        if frac_part.len() > 18 {
            return Err(SomniaError::amount(format!(
                "more than 18 decimal places: {s:?}"
            )));
        }

        let int_wei = if int_part.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(int_part, 10)
                .map_err(|e| SomniaError::amount(format!("bad amount {s:?}: {e}")))?
                .checked_mul(WEI_PER_ETH)
                .ok_or_else(|| SomniaError::amount(format!("amount overflows: {s:?}")))?
        };

        let frac_wei = if frac_part.is_empty() {
            U256::ZERO
        } else {
            let scale = U256::from(10u64).pow(U256::from((18 - frac_part.len()) as u64));
            U256::from_str_radix(frac_part, 10)
                .map_err(|e| SomniaError::amount(format!("bad amount {s:?}: {e}")))?
                * scale
        };

        int_wei
            .checked_add(frac_wei)
            .map(Amount)
            .ok_or_else(|| SomniaError::amount(format!("amount overflows: {s:?}")))
    }

    pub fn wei(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    pub fn halved(self) -> Amount {
        Amount(self.0 / U256::from(2u64))
    }

    /// Render as a decimal token-unit string, trimming trailing zeros.
    pub fn to_eth_string(&self) -> String {
        let int = self.0 / WEI_PER_ETH;
        let rem = self.0 % WEI_PER_ETH;
        if rem.is_zero() {
            return format!("{int}");
        }
        let frac = format!("{rem:0>18}");
        let frac = frac.trim_end_matches('0');
        format!("{int}.{frac}")
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} STT", self.to_eth_string())
    }
}

/// A player's funds as the chain sees them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Balance {
    /// Spendable native balance.
    pub available: Amount,
    /// Pull-payment credit held by the game hub, claimable via `withdraw`.
    pub withdrawable: Amount,
}

impl Balance {
    pub fn zero() -> Self {
        Self {
            available: Amount::ZERO,
            withdrawable: Amount::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Reverted,
}

/// One submitted transaction, as recorded by the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub op: String,
    pub sender: Address,
    pub status: TxStatus,
    pub at: DateTime<Utc>,
}

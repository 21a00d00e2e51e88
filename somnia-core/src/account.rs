use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named development identity.
///
/// Stands in for a browser wallet when driving the SDK from tests or the
/// CLI; only the address matters to the game hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub label: String,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn generate(label: impl Into<String>) -> Self {
        let label = label.into();
        let account = Self {
            label,
            address: Address::random(),
            created_at: Utc::now(),
        };
        tracing::info!("Generated account '{}' at {}", account.label, account.address);
        account
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_accounts_are_distinct() {
        let a = Account::generate("alice");
        let b = Account::generate("bob");
        assert_ne!(a.address, b.address);
        assert_eq!(a.label, "alice");
    }
}

use crate::error::{Result, SomniaError};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub ws_url: String,
    /// Deployed game hub contract.
    pub hub_address: Address,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::local()
    }
}

impl ChainConfig {
    /// Somnia Shannon testnet.
    pub fn somnia_testnet() -> Self {
        Self {
            chain_id: 50312,
            rpc_url: "https://dream-rpc.somnia.network".to_string(),
            ws_url: "wss://dream-rpc.somnia.network/ws".to_string(),
            hub_address: Address::ZERO,
        }
    }

    /// Local development node.
    pub fn local() -> Self {
        Self {
            chain_id: 31337,
            rpc_url: "http://localhost:8545".to_string(),
            ws_url: "ws://localhost:8545".to_string(),
            hub_address: Address::ZERO,
        }
    }

    pub fn with_hub(mut self, hub: Address) -> Self {
        self.hub_address = hub;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(SomniaError::config("Chain id must be non-zero"));
        }
        if self.rpc_url.is_empty() {
            return Err(SomniaError::config("RPC URL cannot be empty"));
        }
        if self.ws_url.is_empty() {
            return Err(SomniaError::config("WebSocket URL cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        ChainConfig::somnia_testnet().validate().unwrap();
        ChainConfig::local().validate().unwrap();
    }

    #[test]
    fn rejects_empty_urls() {
        let mut config = ChainConfig::local();
        config.rpc_url.clear();
        assert!(config.validate().is_err());
    }
}

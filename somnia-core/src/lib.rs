//! Somnia SDK - core types for building on-chain games
//!
//! This crate provides the chain-agnostic foundation shared by Somnia game
//! clients: amounts, chain configuration, development identities and the
//! packed commitment digest used by commit-reveal games.

pub mod account;
pub mod config;
pub mod crypto;
pub mod error;
pub mod types;

pub use account::Account;
pub use config::ChainConfig;
pub use crypto::commitment_digest;
pub use error::{Result, SomniaError};
pub use types::{Amount, Balance, TxRecord, TxStatus};

pub use alloy_primitives::{Address, B256, U256};
